// error.rs — Error types for run tracking.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize run info or a report event.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// `start` was called on a tracker that is already running.
    #[error("run {0} has already been started")]
    AlreadyStarted(String),
}
