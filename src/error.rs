use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by `PostApi`. Nothing is retried; the caller decides.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl ApiError {
    /// HTTP status for `Status` errors, or the status carried by a transport error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode { .. } => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("no credentials received from parent window within {0:?}")]
    Timeout(Duration),
    #[error("credential listener closed before a matching message arrived")]
    Closed,
}
