//! Common error types for spetl

use thiserror::Error;

/// Common result type for spetl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across spetl services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested object or directory not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (bad path, bad connection string, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage service answered with a non-success status
    #[error("Storage error {status} on {path}: {message}")]
    Storage {
        status: u16,
        path: String,
        message: String,
    },

    /// Transport-level failure talking to a remote service
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}
