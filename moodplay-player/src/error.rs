//! Error types for moodplay-player
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.
//!
//! Taxonomy: `DeviceUnavailable` and `NoTracksAvailable` are recoverable
//! and surfaced as status events; `ModelUnavailable` is fatal at startup;
//! storage errors are recovered by falling back to an empty in-memory
//! history (load) or logged (save).

use thiserror::Error;

/// Main error type for moodplay-player
#[derive(Error, Debug)]
pub enum Error {
    /// Camera device cannot be opened (recoverable, user retries)
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Classifier model resource missing or unreadable (fatal at startup)
    #[error("Classifier model unavailable: {0}")]
    ModelUnavailable(String),

    /// Resolved playlist is empty (surfaced as a status message)
    #[error("No tracks available: {0}")]
    NoTracksAvailable(String),

    /// History storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Media engine errors
    #[error("Media engine error: {0}")]
    Engine(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request parameter
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using moodplay-player Error
pub type Result<T> = std::result::Result<T, Error>;
