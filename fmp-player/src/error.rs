//! Error types for fmp-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the fmp-player crate
#[derive(Error, Debug)]
pub enum Error {
    /// Errors surfaced by fmp-common (config, wire decoding)
    #[error(transparent)]
    Common(#[from] fmp_common::Error),

    /// Shared store unreachable or rejected an operation
    #[error("Store error: {0}")]
    Store(String),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Mixer errors (device busy, endpoint gone)
    #[error("Mixer error: {0}")]
    Mixer(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration errors detected after loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON encode/decode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),
}

/// Convenience Result type using fmp-player Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Store(err.to_string())
    }
}
