//! Retrying, conditional fetcher with bounded concurrency

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use backoff::future::retry_notify;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::{AttemptError, FetchError, Result};
use crate::transport::{Transport, TransportRequest, Validator};

/// Tuning for a [`Fetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound for a single attempt, including reading the body
    pub timeout: Duration,
    /// Retries after the first attempt; `0` means a single attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further retry
    pub base_retry_delay: Duration,
    /// Cap for computed delays and for server `Retry-After` hints
    pub max_retry_delay: Duration,
    /// Fetches allowed in flight at once; further fetches queue
    pub concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 3,
            base_retry_delay: Duration::from_millis(250),
            max_retry_delay: Duration::from_secs(30),
            concurrency: 4,
        }
    }
}

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The origin sent a body
    Modified { body: Bytes, validator: Validator },
    /// The conditional request matched; nothing was transferred
    NotModified,
}

/// Fetches payloads through a [`Transport`].
///
/// Every fetch holds one concurrency permit for its whole lifetime, retries
/// included, and is abandoned as soon as the cancellation token fires.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    options: FetchOptions,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        options: FetchOptions,
        cancel: CancellationToken,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
        Self {
            transport,
            options,
            permits,
            cancel,
        }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetch `locator`, conditionally when a non-empty validator is given.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Rejected`] for non-retriable failures (one attempt)
    /// - [`FetchError::Exhausted`] once `max_retries` retries have failed
    /// - [`FetchError::Cancelled`] if the run is cancelled first
    pub async fn fetch(
        &self,
        locator: &str,
        conditional: Option<&Validator>,
    ) -> Result<FetchOutcome> {
        let attempts = AtomicU32::new(0);
        let cancelled = |attempts: &AtomicU32| FetchError::Cancelled {
            locator: locator.to_string(),
            attempts: attempts.load(Ordering::SeqCst),
        };

        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(cancelled(&attempts)),
            permit = self.permits.acquire() => permit.map_err(|_| cancelled(&attempts))?,
        };

        let request = TransportRequest {
            url: locator.to_string(),
            conditional: conditional.filter(|v| !v.is_empty()).cloned(),
        };

        let this = self;
        let request = &request;
        let counter = &attempts;
        let operation = move || async move {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            match this.attempt(request).await {
                Ok(outcome) => Ok(outcome),
                Err(cause) if cause.is_retriable() && attempt <= this.options.max_retries => {
                    match cause.retry_after() {
                        Some(hint) => {
                            let delay = hint.min(this.options.max_retry_delay);
                            Err(backoff::Error::retry_after(cause, delay))
                        }
                        None => Err(backoff::Error::transient(cause)),
                    }
                }
                Err(cause) => Err(backoff::Error::permanent(cause)),
            }
        };
        let notify = |cause: AttemptError, delay: Duration| {
            tracing::warn!(
                locator,
                attempt = counter.load(Ordering::SeqCst),
                ?delay,
                "Fetch attempt failed, retrying: {}",
                cause
            );
        };

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(cancelled(&attempts)),
            result = retry_notify(self.backoff_policy(), operation, notify) => result,
        };

        let attempts = attempts.load(Ordering::SeqCst);
        match result {
            Ok(outcome) => {
                tracing::debug!(locator, attempts, "Fetched");
                Ok(outcome)
            }
            Err(cause) if cause.is_retriable() => Err(FetchError::Exhausted {
                locator: locator.to_string(),
                attempts,
                cause,
            }),
            Err(cause) => Err(FetchError::Rejected {
                locator: locator.to_string(),
                cause,
            }),
        }
    }

    /// Fetch and decode a JSON document unconditionally.
    ///
    /// Returns the decoded value together with the raw body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, locator: &str) -> Result<(T, Bytes)> {
        let body = match self.fetch(locator, None).await? {
            FetchOutcome::Modified { body, .. } => body,
            FetchOutcome::NotModified => {
                return Err(FetchError::Decode {
                    locator: locator.to_string(),
                    message: "unexpected 304 for an unconditional request".to_string(),
                });
            }
        };
        let value = serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            locator: locator.to_string(),
            message: e.to_string(),
        })?;
        Ok((value, body))
    }

    /// One attempt under the per-attempt timeout.
    async fn attempt(
        &self,
        request: &TransportRequest,
    ) -> std::result::Result<FetchOutcome, AttemptError> {
        let response = tokio::time::timeout(self.options.timeout, self.transport.get(request))
            .await
            .map_err(|_| AttemptError::Timeout(self.options.timeout))??;

        match response.status {
            304 => Ok(FetchOutcome::NotModified),
            200..=299 => Ok(FetchOutcome::Modified {
                body: response.body,
                validator: response.validator,
            }),
            status => Err(AttemptError::Status {
                status,
                retry_after: response.retry_after,
            }),
        }
    }

    /// `base * 2^(n-1)` before retry `n`, without jitter.
    fn backoff_policy(&self) -> impl Backoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.options.base_retry_delay)
            .with_randomization_factor(0.0)
            .with_multiplier(2.0)
            .with_max_interval(self.options.max_retry_delay)
            .with_max_elapsed_time(None)
            .build()
    }
}
