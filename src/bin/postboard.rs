// Native binary for Postboard - drives the posts API from the command line

use anyhow::{anyhow, Context, Result};
use postboard::{
    api::PostApi,
    config::{self, Command},
    platform,
    types::{CreatePostRequest, Pagination, Post},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();
    platform::init_logging(log::LevelFilter::Warn);

    let (cfg, command) = config::load().context("Failed to load configuration")?;
    let Some(command) = command else {
        cfg.print_summary();
        return Ok(());
    };

    let token = cfg
        .token
        .clone()
        .ok_or_else(|| anyhow!("a token is required (--token or POSTBOARD_TOKEN)"))?;
    let api = PostApi::from_config(&cfg);

    match command {
        Command::List { page, limit } => {
            let resp = api.get_posts(page, limit, &token).await?;
            for post in &resp.data {
                print_post(post);
            }
            print_pagination(&resp.pagination);
        }
        Command::Create {
            content,
            amount,
            currency,
            app_session_id,
        } => {
            let req = CreatePostRequest {
                content,
                amount,
                currency,
                app_session_id,
            };
            match api.create_post(&req, &token).await?.into_post() {
                Some(post) => print_post(&post),
                None => println!("no post created"),
            }
        }
        Command::Like { id } => {
            let resp = api.like_post(&id, &token).await?;
            println!("{:?}: {}", resp.action, resp.message);
        }
        Command::Dislike { id } => {
            let resp = api.dislike_post(&id, &token).await?;
            println!("{:?}: {}", resp.action, resp.message);
        }
        Command::MyReactions { page, limit } => {
            let resp = api.get_my_reactions(&token, page, limit).await?;
            let r = &resp.data;
            println!(
                "liked {} / disliked {} / total {}",
                r.total_liked, r.total_disliked, r.total_reactions
            );
            for post in r.liked_posts.iter().chain(r.disliked_posts.iter()) {
                print_post(post);
            }
            print_pagination(&resp.pagination);
        }
    }

    Ok(())
}

fn print_post(post: &Post) {
    let mark = match post.user_reaction {
        Some(r) => format!(" [{:?}]", r).to_lowercase(),
        None => String::new(),
    };
    println!(
        "#{} {} ({}) +{} -{}{}\n    {}",
        post.id,
        post.email,
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.likes,
        post.dislikes,
        mark,
        post.content
    );
}

fn print_pagination(p: &Pagination) {
    println!(
        "page {}/{} ({} total){}{}",
        p.page,
        p.total_pages,
        p.total,
        if p.has_prev_page { " <prev" } else { "" },
        if p.has_next_page { " next>" } else { "" }
    );
}
