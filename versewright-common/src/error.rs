//! Common error types for Versewright

use thiserror::Error;

/// Common result type for Versewright operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Versewright service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input, rejected before any backend call
    #[error("{0}")]
    Validation(String),

    /// Free generation quota exhausted; caller should surface the paywall
    #[error("Free poem limit reached ({used} of {quota} used)")]
    QuotaExceeded { used: i64, quota: i64 },

    /// Text generation backend failure (transport, non-2xx, malformed response)
    #[error("Generation backend error: {0}")]
    GenerationBackend(String),

    /// Payment provider call failure
    #[error("Billing error: {0}")]
    Billing(String),

    /// Missing or rejected credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
