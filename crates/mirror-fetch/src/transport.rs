//! Transport seam between the fetcher and an HTTP client

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Origin-supplied cache validator (`ETag` / `Last-Modified`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl Validator {
    /// Validator carrying only an entity tag
    pub fn etag(etag: impl Into<String>) -> Self {
        Self {
            etag: Some(etag.into()),
            last_modified: None,
        }
    }

    /// True when neither header is known
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// A single GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    /// Sent as `If-None-Match` / `If-Modified-Since` when present
    pub conditional: Option<Validator>,
}

/// Response as seen by the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub validator: Validator,
    /// Server-requested delay before the next attempt (`Retry-After`)
    pub retry_after: Option<Duration>,
    /// Empty unless the status is a success
    pub body: Bytes,
}

impl TransportResponse {
    /// Successful response with a body and no validator
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            validator: Validator::default(),
            retry_after: None,
            body: body.into(),
        }
    }

    /// Response with only a status code
    pub fn status(status: u16) -> Self {
        Self {
            status,
            validator: Validator::default(),
            retry_after: None,
            body: Bytes::new(),
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }
}

/// Failure below the HTTP status level
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure, truncated body
    #[error("connection failed: {0}")]
    Connection(String),

    /// The client's own timeout fired
    #[error("request timed out")]
    Timeout,

    /// The request could not be built (bad URL, bad header)
    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Issues GET requests for the fetcher.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        request: &TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}
