// ================================================================
// File: gridwatch-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    /// The OAuth client-credentials exchange failed. Fatal for the current
    /// poll attempt only.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Non-quota 4xx/5xx from the metadata API.
    #[error("Upstream HTTP error: {status} => {body}")]
    UpstreamHttp { status: u16, body: String },

    /// Only leaves the rate limiter when the transparent retry is itself throttled.
    #[error("Upstream quota exceeded")]
    QuotaExceeded,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream call timed out")]
    Timeout,

    #[error("Embed adapter unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Network-level failures that are worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}
