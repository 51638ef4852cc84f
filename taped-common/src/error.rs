//! Common error types for taped

use thiserror::Error;

/// Common result type for taped operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across taped crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or value out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
