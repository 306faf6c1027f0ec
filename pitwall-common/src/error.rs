//! Common error types for Pitwall

use thiserror::Error;

/// Common result type for Pitwall operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Pitwall crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error (lineup documents, envelopes)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input: a record or request failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for per-record validation failures that a batch caller skips
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}
