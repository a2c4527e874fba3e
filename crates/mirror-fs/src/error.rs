//! Error types for mirror-fs

use std::path::PathBuf;

/// Result type for mirror-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mirror-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid item key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Value cannot be fingerprinted: {message}")]
    Serialize { message: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
