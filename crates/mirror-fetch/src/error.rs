//! Error types for mirror-fetch

use std::time::Duration;

use crate::transport::TransportError;

/// Result type for mirror-fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// Why a single attempt failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    /// The per-attempt timeout elapsed
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The origin answered with an unusable status
    #[error("origin responded with status {status}")]
    Status {
        status: u16,
        retry_after: Option<Duration>,
    },
}

impl AttemptError {
    /// Timeouts, connection failures, 408, 429 and 5xx are worth retrying.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Transport(TransportError::Connection(_) | TransportError::Timeout) => true,
            Self::Transport(TransportError::Invalid(_)) => false,
            Self::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
        }
    }

    /// HTTP status, if the origin responded at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Terminal failure of one fetch
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Every attempt failed with a transient error
    #[error("{locator}: gave up after {attempts} attempt(s): {cause}")]
    Exhausted {
        locator: String,
        attempts: u32,
        cause: AttemptError,
    },

    /// A non-retriable failure on the first occurrence
    #[error("{locator}: {cause}")]
    Rejected { locator: String, cause: AttemptError },

    /// The run was cancelled while this fetch was queued or in flight
    #[error("{locator}: cancelled")]
    Cancelled { locator: String, attempts: u32 },

    /// The payload could not be decoded
    #[error("{locator}: malformed document: {message}")]
    Decode { locator: String, message: String },
}

impl FetchError {
    pub fn locator(&self) -> &str {
        match self {
            Self::Exhausted { locator, .. }
            | Self::Rejected { locator, .. }
            | Self::Cancelled { locator, .. }
            | Self::Decode { locator, .. } => locator,
        }
    }

    /// Attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
            Self::Rejected { .. } | Self::Decode { .. } => 1,
        }
    }

    /// The origin reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { cause, .. } if cause.status() == Some(404))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn status(status: u16) -> AttemptError {
        AttemptError::Status {
            status,
            retry_after: None,
        }
    }

    #[rstest]
    #[case(408, true)]
    #[case(429, true)]
    #[case(500, true)]
    #[case(503, true)]
    #[case(599, true)]
    #[case(400, false)]
    #[case(401, false)]
    #[case(403, false)]
    #[case(404, false)]
    #[case(410, false)]
    #[case(302, false)]
    fn status_retriability(#[case] code: u16, #[case] retriable: bool) {
        assert_eq!(status(code).is_retriable(), retriable);
    }

    #[test]
    fn transport_errors_retriability() {
        assert!(AttemptError::Timeout(Duration::from_secs(1)).is_retriable());
        assert!(AttemptError::from(TransportError::Connection("reset".into())).is_retriable());
        assert!(!AttemptError::from(TransportError::Invalid("bad url".into())).is_retriable());
    }

    #[test]
    fn not_found_is_detected() {
        let err = FetchError::Rejected {
            locator: "https://cms.test/x".into(),
            cause: status(404),
        };
        assert!(err.is_not_found());
        assert_eq!(err.attempts(), 1);
        assert!(err.to_string().contains("404"));
    }
}
