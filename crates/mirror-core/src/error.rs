//! Error types for mirror-core

use std::path::PathBuf;

use mirror_fetch::{FetchError, TransportError};

use crate::domain::DomainKind;

/// Result type for mirror-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mirror-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration, detected before any network call
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The remote item list could not be obtained or decoded
    #[error("Failed to enumerate {domain} items: {source}")]
    Enumeration {
        domain: DomainKind,
        #[source]
        source: FetchError,
    },

    /// An artifact could not be committed to disk
    #[error("Failed to write artifact for '{key}' at {path}: {source}")]
    Write {
        key: String,
        path: PathBuf,
        #[source]
        source: mirror_fs::Error,
    },

    /// A manifest could not be read or persisted
    #[error("Cache state error at {path}: {message}")]
    CacheState { path: PathBuf, message: String },

    /// Local storage could not be walked or cleaned
    #[error("Reconciliation error under {root}: {message}")]
    Reconciliation { root: PathBuf, message: String },

    /// An item the domain cannot do without failed
    #[error("Critical {domain} item '{key}' failed after {attempts} attempt(s): {reason}")]
    CriticalItem {
        domain: DomainKind,
        key: String,
        attempts: u32,
        reason: String,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from mirror-fs
    #[error(transparent)]
    Fs(#[from] mirror_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        Self::configuration(format!("HTTP client could not be created: {error}"))
    }
}
