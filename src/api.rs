//! Typed client for the `/posts` resource.
//!
//! Every call takes the bearer token explicitly; the client holds no session
//! state of its own. Failures come back as [`ApiError`] without retries.
//!
//! | Call | Request |
//! |---|---|
//! | [`PostApi::get_posts`] | `GET /posts?page&limit` |
//! | [`PostApi::create_post`] | `POST /posts` with JSON body |
//! | [`PostApi::like_post`] | `POST /posts/{id}/like`, empty body |
//! | [`PostApi::dislike_post`] | `POST /posts/{id}/dislike`, empty body |
//! | [`PostApi::get_my_reactions`] | `GET /posts/my-reactions?page&limit` |

use crate::config::Config;
use crate::debug::{self, cat};
use crate::error::ApiError;
use crate::types::{
    CreatePostRequest, MyReactionsResponse, PageQuery, PostResponse, PostsResponse,
    ReactionResponse,
};
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        #[cfg(not(target_arch = "wasm32"))]
        {
            reqwest::Client::builder()
                .pool_max_idle_per_host(8)
                .tcp_nodelay(true)
                .build()
                .unwrap_or_default()
        }

        #[cfg(target_arch = "wasm32")]
        {
            reqwest::Client::new()
        }
    })
}

#[derive(Clone, Debug)]
pub struct PostApi {
    base_url: String,
    client: reqwest::Client,
    // browser fetch has no per-request timeout; the field is inert on wasm32
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    timeout: Duration,
}

impl PostApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: http_client().clone(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.api_base_url.clone())
            .with_timeout(Duration::from_millis(cfg.request_timeout_ms))
    }

    /// Bound each request; an elapsed timeout surfaces as `ApiError::Transport`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List posts. Absent `page`/`limit` are omitted so the server applies its defaults.
    pub async fn get_posts(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
        token: &str,
    ) -> Result<PostsResponse, ApiError> {
        let query = PageQuery::new(page, limit);
        log::info!("[posts] GET /posts {:?}", query);
        let req = self.client.get(self.url("/posts")).query(&query);
        self.send(req, token).await
    }

    /// Create a post tied to a payment amount and an application session.
    pub async fn create_post(
        &self,
        req: &CreatePostRequest,
        token: &str,
    ) -> Result<PostResponse, ApiError> {
        log::info!(
            "[posts] POST /posts amount={} currency={}",
            req.amount,
            req.currency
        );
        let rb = self.client.post(self.url("/posts")).json(req);
        let resp: PostResponse = self.send(rb, token).await?;
        if resp.data.is_none() {
            log::warn!("[posts] create returned no post (success={})", resp.success);
        }
        Ok(resp)
    }

    /// Toggle a like. The server decides between `liked` and `removed`.
    pub async fn like_post(&self, id: &str, token: &str) -> Result<ReactionResponse, ApiError> {
        self.react(id, "like", token).await
    }

    /// Toggle a dislike. The server decides between `disliked` and `removed`.
    pub async fn dislike_post(&self, id: &str, token: &str) -> Result<ReactionResponse, ApiError> {
        self.react(id, "dislike", token).await
    }

    /// The caller's liked and disliked posts plus counters.
    pub async fn get_my_reactions(
        &self,
        token: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<MyReactionsResponse, ApiError> {
        let query = PageQuery::new(page, limit);
        log::info!("[posts] GET /posts/my-reactions {:?}", query);
        let req = self.client.get(self.url("/posts/my-reactions")).query(&query);
        self.send(req, token).await
    }

    async fn react(&self, id: &str, verb: &str, token: &str) -> Result<ReactionResponse, ApiError> {
        let path = format!("/posts/{}/{}", urlencoding::encode(id), verb);
        log::info!("[posts] POST {}", path);
        // no body: reqwest sends an empty payload
        let req = self.client.post(self.url(&path));
        let resp: ReactionResponse = self.send(req, token).await?;
        log::debug!("[posts] {} {} -> {:?}", verb, id, resp.action);
        Ok(resp)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        token: &str,
    ) -> Result<T, ApiError> {
        debug::log(
            cat::API,
            format!("attaching bearer token ({} chars)", token.len()),
        );

        #[cfg(not(target_arch = "wasm32"))]
        let req = req.timeout(self.timeout);

        let response = req.bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::warn!("[posts] HTTP {}: {}", status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| {
            log::warn!("[posts] invalid JSON response: {}", source);
            ApiError::Decode { source, body }
        })
    }
}
