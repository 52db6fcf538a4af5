//! Error types for playd-ap

use thiserror::Error;

/// Main error type for the playback service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metadata store connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Codec library acquisition errors
    #[error("Codec error: {0}")]
    Codec(String),

    /// Queue management errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// File and socket I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol errors
    #[error(transparent)]
    Protocol(#[from] playd_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using playd-ap Error
pub type Result<T> = std::result::Result<T, Error>;
