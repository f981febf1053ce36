//! Error types for the Grove node.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while starting or running a node.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid environment configuration
    #[error("Invalid {key}: {message}")]
    Config { key: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Round store error
    #[error("Round store error: {0}")]
    Rounds(#[from] grove_rounds::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
