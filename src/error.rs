//! Error types for jive-stick
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Playback errors never reach the command surface; they are
//! logged and reflected in events only.

use thiserror::Error;

/// Main error type for jive-stick
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File open or read failures
    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    /// Malformed or unsupported audio container
    #[error("Format error: {0}")]
    Format(String),

    /// Decode buffer allocation failures
    #[error("Resource error: {0}")]
    Resource(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),
}

/// Convenience Result type using jive-stick Error
pub type Result<T> = std::result::Result<T, Error>;
