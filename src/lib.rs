//! Postboard - posts API client and parent-window credential bridge
//!
//! Two independent pieces for a frontend embedded in a parent page:
//!
//! - [`api::PostApi`]: typed calls against the `/posts` resource (list,
//!   create, like, dislike, my reactions), each with an explicit bearer token.
//! - [`bridge::CredentialBridge`]: waits once for the parent window to hand
//!   over `{ token, app_session_id }` and acknowledges it.
//!
//! ## Usage
//!
//! For native builds (CLI):
//! ```bash
//! cargo build --features native
//! ```
//!
//! For web builds:
//! ```bash
//! wasm-pack build --target web --no-default-features --features dom-web
//! ```

// Core modules (available on all platforms)
pub mod config;
pub mod error;
pub mod types;

// Posts REST client
pub mod api;

// Parent-window credential handoff
pub mod bridge;

// In-memory credential holder
pub mod session;

// Debug logging system (available on all platforms)
pub mod debug;

// Platform abstraction layer
pub mod platform;

// WASM-facing exports (JS -> Rust) are only built on wasm32.
#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

// Re-export commonly used types
pub use api::PostApi;
pub use bridge::{BridgeOptions, CredentialBridge, Credentials, MessagePort};
pub use config::Config;
pub use error::{ApiError, BridgeError};
pub use types::{Currency, Pagination, Post, ReactionAction, UserReaction};
