//! Common error types for FM Player

use thiserror::Error;

/// Common result type for FM Player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the FM Player crates
#[derive(Error, Debug)]
pub enum Error {
    /// JSON encode/decode error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input on a wire message or record
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
