//! Common error types for playd

use thiserror::Error;

/// Common result type for playd operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the service and its clients
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be encoded or decoded as JSON
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed frame, unknown opcode or unexpected payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
