//! Network retrieval for CMS Mirror
//!
//! The [`Fetcher`] wraps a [`Transport`] with:
//!
//! - a cancelable per-attempt timeout
//! - exponential backoff for transient failures (`base * 2^(n-1)` before retry `n`)
//! - immediate failure for client errors, without spending retry budget
//! - conditional requests from a cached [`Validator`], where `304` is a cache hit
//! - a concurrency bound shared by every fetch issued through the same fetcher
//!
//! [`HttpTransport`] is the `reqwest` implementation of [`Transport`].

pub mod error;
pub mod fetcher;
pub mod http;
pub mod transport;

pub use error::{AttemptError, FetchError, Result};
pub use fetcher::{FetchOptions, FetchOutcome, Fetcher};
pub use http::HttpTransport;
pub use transport::{Transport, TransportError, TransportRequest, TransportResponse, Validator};
