//! [`ScriptedTransport`]: an in-memory origin for fetcher and sync tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use mirror_fetch::{Transport, TransportError, TransportRequest, TransportResponse, Validator};
use tokio::time::Instant;

/// What the origin does for one request
#[derive(Debug, Clone)]
pub enum Scripted {
    Respond(TransportResponse),
    Fail(TransportError),
    /// Never answers; only a timeout or cancellation ends the attempt
    Hang,
}

/// A request as received by the scripted origin
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub conditional: Option<Validator>,
    pub at: Instant,
}

#[derive(Default)]
struct Route {
    queued: VecDeque<Scripted>,
    fallback: Option<Scripted>,
}

/// Transport answering from per-URL scripts.
///
/// Queued responses are consumed first, then the route's standing response
/// repeats. Unknown URLs answer `404`. A standing `200` whose `ETag` matches
/// the request's `If-None-Match` answers `304`, like a real origin.
///
/// ```rust,no_run
/// use mirror_test_utils::ScriptedTransport;
///
/// let origin = ScriptedTransport::new();
/// origin.serve("https://cms.test/a.json", r#"{"a":1}"#, Some("\"v1\""));
/// origin.fail_times("https://cms.test/a.json", 2, 503);
/// ```
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    log: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standing response for `url`.
    pub fn respond(&self, url: &str, scripted: Scripted) {
        let mut routes = self.routes.lock().unwrap();
        routes.entry(url.to_string()).or_default().fallback = Some(scripted);
    }

    /// Standing `200` with `body` and an optional `ETag`.
    pub fn serve(&self, url: &str, body: impl Into<bytes::Bytes>, etag: Option<&str>) {
        let mut response = TransportResponse::ok(body);
        if let Some(etag) = etag {
            response = response.with_validator(Validator::etag(etag));
        }
        self.respond(url, Scripted::Respond(response));
    }

    /// Standing `200` with a JSON document.
    pub fn serve_json(&self, url: &str, value: &serde_json::Value) {
        self.serve(url, value.to_string(), None);
    }

    /// One-shot behaviour consumed before the standing response.
    pub fn push(&self, url: &str, scripted: Scripted) {
        let mut routes = self.routes.lock().unwrap();
        routes
            .entry(url.to_string())
            .or_default()
            .queued
            .push_back(scripted);
    }

    /// Queue `times` responses with `status` ahead of the standing response.
    pub fn fail_times(&self, url: &str, times: usize, status: u16) {
        for _ in 0..times {
            self.push(url, Scripted::Respond(TransportResponse::status(status)));
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Requests received for `url`.
    pub fn requests_for(&self, url: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == url)
            .collect()
    }

    /// Number of requests received for `url`.
    pub fn count(&self, url: &str) -> usize {
        self.requests_for(url).len()
    }

    fn next(&self, url: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.get_mut(url)?;
        route.queued.pop_front().or_else(|| route.fallback.clone())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        self.log.lock().unwrap().push(RecordedRequest {
            url: request.url.clone(),
            conditional: request.conditional.clone(),
            at: Instant::now(),
        });

        match self.next(&request.url) {
            None => Ok(TransportResponse::status(404)),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Hang) => std::future::pending().await,
            Some(Scripted::Respond(response)) => {
                let requested = request.conditional.as_ref().and_then(|v| v.etag.as_ref());
                let matches = response.status == 200
                    && requested.is_some()
                    && requested == response.validator.etag.as_ref();
                if matches {
                    Ok(TransportResponse::status(304).with_validator(response.validator))
                } else {
                    Ok(response)
                }
            }
        }
    }
}
