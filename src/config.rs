use crate::types::Currency;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_PARENT_ORIGIN: &str = "http://localhost:5173";

/// Postboard - posts API client and parent-window credential bridge
///
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug)]
#[command(name = "postboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Posts API client", long_about = None)]
pub struct CliArgs {
    /// Base URL of the posts backend
    #[arg(long, env = "POSTBOARD_API_URL")]
    pub api_url: Option<String>,

    /// Origin of the embedding parent window (acknowledgments are posted here)
    #[arg(long, env = "POSTBOARD_PARENT_ORIGIN")]
    pub parent_origin: Option<String>,

    /// HTTP request timeout in milliseconds (1000-120000)
    #[arg(long, env = "POSTBOARD_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Upper bound on the wait for parent credentials in milliseconds (100-600000).
    /// Unset means wait indefinitely.
    #[arg(long, env = "POSTBOARD_CREDENTIAL_TIMEOUT_MS")]
    pub credential_timeout_ms: Option<u64>,

    /// Bearer token used for API calls
    #[arg(long, env = "POSTBOARD_TOKEN")]
    pub token: Option<String>,

    /// Comma-separated debug categories (api,bridge,session,config or all)
    #[arg(long, env = "POSTBOARD_DEBUG")]
    pub debug: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List posts
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Create a post tied to a payment
    Create {
        content: String,
        #[arg(long, value_parser = parse_amount)]
        amount: f64,
        #[arg(long, value_parser = clap::value_parser!(Currency))]
        currency: Currency,
        #[arg(long)]
        app_session_id: String,
    },
    /// Toggle a like on a post
    Like { id: String },
    /// Toggle a dislike on a post
    Dislike { id: String },
    /// Show posts you reacted to
    MyReactions {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub parent_origin: String,
    pub request_timeout_ms: u64,
    pub credential_timeout_ms: Option<u64>,
    pub token: Option<String>,
}

impl Config {
    /// Defaults for everything except the two endpoints. Used by the web entry
    /// point, where there is no command line.
    pub fn new(api_base_url: impl Into<String>, parent_origin: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            parent_origin: parent_origin.into().trim_end_matches('/').to_string(),
            request_timeout_ms: 10_000,
            credential_timeout_ms: None,
            token: None,
        }
    }
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Load configuration from CLI args and environment variables
pub fn load() -> Result<(Config, Option<Command>)> {
    let args = CliArgs::parse();
    let cfg = from_args(&args)?;
    Ok((cfg, args.command))
}

/// Resolve parsed args into a validated `Config`.
/// Env values are folded into `args` by clap; this layer adds defaults.
pub fn from_args(args: &CliArgs) -> Result<Config> {
    if let Some(list) = args.debug.as_deref() {
        crate::debug::set_from_list(list);
    }

    let api_base_url = args.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
    validate_url(api_base_url, "POSTBOARD_API_URL")?;

    let parent_origin = args.parent_origin.as_deref().unwrap_or(DEFAULT_PARENT_ORIGIN);
    validate_origin(parent_origin, "POSTBOARD_PARENT_ORIGIN")?;

    let request_timeout_ms = validate_in_range(
        args.request_timeout_ms.unwrap_or(10_000),
        1000,
        120_000,
        "POSTBOARD_REQUEST_TIMEOUT_MS",
    )?;

    let credential_timeout_ms = validate_credential_timeout(args.credential_timeout_ms)?;

    let token = args.token.clone().filter(|t| !t.is_empty());

    crate::debug::log(crate::debug::cat::CONFIG, "configuration resolved");

    Ok(Config {
        api_base_url: api_base_url.trim_end_matches('/').to_string(),
        parent_origin: parent_origin.trim_end_matches('/').to_string(),
        request_timeout_ms,
        credential_timeout_ms,
        token,
    })
}

/// Configuration for the embedded frame, where the host page passes the
/// parent origin and wait bound directly.
pub fn for_frame(parent_origin: &str, credential_timeout_ms: Option<u64>) -> Result<Config> {
    validate_origin(parent_origin, "parent_origin")?;
    let mut cfg = Config::new(DEFAULT_API_URL, parent_origin);
    cfg.credential_timeout_ms = validate_credential_timeout(credential_timeout_ms)?;
    Ok(cfg)
}

fn validate_credential_timeout(ms: Option<u64>) -> Result<Option<u64>> {
    ms.map(|ms| validate_in_range(ms, 100, 600_000, "POSTBOARD_CREDENTIAL_TIMEOUT_MS"))
        .transpose()
}

/// Payment amounts must be finite; JSON has no encoding for NaN or infinity.
fn parse_amount(raw: &str) -> Result<f64, String> {
    let amount: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if amount.is_finite() {
        Ok(amount)
    } else {
        Err(format!("amount must be finite, got '{raw}'"))
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

/// Target origin for `postMessage`: http(s) only, never the `*` wildcard.
pub fn validate_origin(origin: &str, name: &str) -> Result<()> {
    if origin.trim() == "*" {
        return Err(anyhow!("{name} must name a concrete origin, not '*'"));
    }
    validate_url(origin, name)
}

impl Config {
    pub fn print_summary(&self) {
        eprintln!("Postboard Configuration:");
        eprintln!("  API URL: {}", self.api_base_url);
        eprintln!("  Parent Origin: {}", self.parent_origin);
        eprintln!("  Request Timeout: {}ms", self.request_timeout_ms);
        match self.credential_timeout_ms {
            Some(ms) => eprintln!("  Credential Wait: {}ms", ms),
            None => eprintln!("  Credential Wait: unbounded"),
        }
        if self.token.is_some() {
            eprintln!("  Token: Configured");
        }
    }
}
