//! Error types for record file operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing a record collection.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The previous file could not be copied to its backup path
    #[error("Failed to back up {path:?}: {source}")]
    Backup {
        /// Backup destination
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Invalid file structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Whether this error happened while reading the source (as opposed to
    /// writing or backing up).
    pub fn is_import_error(&self) -> bool {
        matches!(self, Self::Json(_) | Self::InvalidFormat { .. })
    }
}
