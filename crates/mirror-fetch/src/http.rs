//! `reqwest`-backed transport

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{
    ETAG, HeaderMap, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, RETRY_AFTER,
};
use reqwest::{Client, StatusCode};

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse, Validator};

const USER_AGENT: &str = concat!("cms-mirror/", env!("CARGO_PKG_VERSION"));

/// HTTP(S) transport.
///
/// Timeouts are enforced by the fetcher per attempt, so the client itself is
/// built without one.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Invalid(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.get(&request.url);
        if let Some(validator) = &request.conditional {
            if let Some(etag) = &validator.etag {
                builder = builder.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = &validator.last_modified {
                builder = builder.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response.headers();
        let validator = Validator {
            etag: header_string(headers, ETAG),
            last_modified: header_string(headers, LAST_MODIFIED),
        };
        let retry_after = header_string(headers, RETRY_AFTER)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = if status.is_success() {
            response.bytes().await.map_err(classify)?
        } else {
            Bytes::new()
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            validator,
            retry_after: retry_after.filter(|_| status == StatusCode::TOO_MANY_REQUESTS
                || status.is_server_error()),
            body,
        })
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_builder() {
        TransportError::Invalid(error.to_string())
    } else {
        TransportError::Connection(error.to_string())
    }
}
