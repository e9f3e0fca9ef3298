//! Error types for pagepulse-core

use thiserror::Error;

/// Main error type for the pagepulse-core library
///
/// Errors never cross the public tracking surface: `Telemetry` methods
/// swallow every failure and log it at warning level. This type exists for
/// the fallible internals (storage, transport, config loading).
#[derive(Error, Debug)]
pub enum Error {
    /// Durable storage error
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/API error
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias for pagepulse-core
pub type Result<T> = std::result::Result<T, Error>;
