//! Error types for Reverie

use thiserror::Error;

/// Main error type for the companion backend
#[derive(Error, Debug)]
pub enum ReverieError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflicting state (e.g. a camera session already live)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Outbound provider returned a failure
    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ReverieError>;
