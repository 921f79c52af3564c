//! Leo error types

use thiserror::Error;

/// Leo error type
#[derive(Error, Debug)]
pub enum Error {
    /// A caller supplied an empty or otherwise unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Imported knowledge data is missing its table or cannot be parsed
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Leo operations
pub type Result<T> = std::result::Result<T, Error>;
