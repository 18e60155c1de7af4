//! Archive error types.

use std::path::Path;
use thiserror::Error;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur during archive and revert operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A required input file or directory is missing.
    #[error("{0}")]
    NotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error on a specific path.
    #[error("IO error on {path}: {source}")]
    IoAt {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Zip packaging or extraction error.
    #[error("Package error: {0}")]
    Package(#[from] zip::result::ZipError),

    /// The resolved artifact does not contain the expected snapshot.
    #[error("Restore integrity failure: {0}")]
    RestoreIntegrity(String),

    /// Invalid configuration.
    #[error("Invalid config at {path}: {message}")]
    Config { path: String, message: String },

    /// Operation failed.
    #[error("Archive operation failed: {0}")]
    OperationFailed(String),
}

impl ArchiveError {
    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Attach the offending path to an IO error.
    pub fn io_at(path: &Path, source: std::io::Error) -> Self {
        Self::IoAt {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create a restore integrity error.
    pub fn restore_integrity(message: impl Into<String>) -> Self {
        Self::RestoreIntegrity(message.into())
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed(message.into())
    }

    /// Whether this error means a required input was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<walkdir::Error> for ArchiveError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.into())
    }
}

impl From<tokio::task::JoinError> for ArchiveError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::operation_failed(format!("background task failed: {err}"))
    }
}
