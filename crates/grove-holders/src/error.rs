//! Error types for holder acquisition.

use std::time::Duration;

use thiserror::Error;

/// Result type for holder operations.
pub type Result<T> = std::result::Result<T, HolderError>;

/// A single upstream fetch failed.
///
/// `Clone` so every waiter on a coalesced refresh can observe the same failure.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success HTTP status
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Still rate limited after every retry
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Response body did not have the expected structure
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Fetch exceeded the refresh deadline
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None if e.is_decode() => FetchError::Malformed(e.to_string()),
            None => FetchError::Http(e.to_string()),
        }
    }
}

/// No holder data could be served at all.
///
/// Only produced when there is no prior good snapshot to fall back on.
/// Both variants mean "try again later"; the API reports them as 503.
#[derive(Debug, Clone, Error)]
pub enum HolderError {
    /// The refresh failed
    #[error("holder source unavailable: {0}")]
    Unavailable(#[source] FetchError),

    /// The refresh succeeded but returned nobody
    #[error("holder source returned no holders")]
    Empty,
}
