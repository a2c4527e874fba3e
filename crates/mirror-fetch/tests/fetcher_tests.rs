//! Fetcher behaviour against a scripted origin.
//!
//! Timing tests run on a paused tokio clock, so backoff delays are observed
//! exactly rather than slept through.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mirror_fetch::{
    FetchError, FetchOptions, FetchOutcome, Fetcher, Transport, TransportError, TransportRequest,
    TransportResponse, Validator,
};
use mirror_test_utils::{Scripted, ScriptedTransport};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const URL: &str = "https://cms.test/content/nodes/home.json";

fn options(max_retries: u32, base_ms: u64) -> FetchOptions {
    FetchOptions {
        timeout: Duration::from_secs(1),
        max_retries,
        base_retry_delay: Duration::from_millis(base_ms),
        max_retry_delay: Duration::from_secs(30),
        concurrency: 4,
    }
}

fn fetcher(origin: &Arc<ScriptedTransport>, options: FetchOptions) -> Fetcher {
    Fetcher::new(origin.clone(), options, CancellationToken::new())
}

#[tokio::test(start_paused = true)]
async fn test_two_transient_failures_then_success_backs_off_exponentially() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.fail_times(URL, 2, 503);
    origin.serve(URL, r#"{"ok":true}"#, None);

    let outcome = fetcher(&origin, options(3, 100))
        .fetch(URL, None)
        .await
        .unwrap();

    assert!(matches!(outcome, FetchOutcome::Modified { .. }));
    let requests = origin.requests_for(URL);
    assert_eq!(requests.len(), 3);

    let first_gap = requests[1].at - requests[0].at;
    let second_gap = requests[2].at - requests[1].at;
    assert!(
        first_gap >= Duration::from_millis(100) && first_gap < Duration::from_millis(150),
        "first delay was {first_gap:?}"
    );
    assert!(
        second_gap >= Duration::from_millis(200) && second_gap < Duration::from_millis(250),
        "second delay was {second_gap:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_not_retried() {
    let origin = Arc::new(ScriptedTransport::new());

    let err = fetcher(&origin, options(3, 100))
        .fetch(URL, None)
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "unexpected error: {err}");
    assert_eq!(err.attempts(), 1);
    assert_eq!(origin.count(URL), 1);
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_other_than_rate_limit_abort_immediately() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.respond(URL, Scripted::Respond(TransportResponse::status(403)));

    let err = fetcher(&origin, options(5, 10))
        .fetch(URL, None)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Rejected { .. }));
    assert_eq!(origin.count(URL), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_carry_locator_attempts_and_cause() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.respond(URL, Scripted::Respond(TransportResponse::status(500)));

    let err = fetcher(&origin, options(2, 10))
        .fetch(URL, None)
        .await
        .unwrap_err();

    match err {
        FetchError::Exhausted {
            locator,
            attempts,
            cause,
        } => {
            assert_eq!(locator, URL);
            assert_eq!(attempts, 3);
            assert_eq!(cause.status(), Some(500));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(origin.count(URL), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiting_is_retried() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.fail_times(URL, 1, 429);
    origin.serve(URL, "{}", None);

    let outcome = fetcher(&origin, options(1, 10)).fetch(URL, None).await;

    assert!(outcome.is_ok());
    assert_eq!(origin.count(URL), 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_hint_overrides_computed_delay() {
    let origin = Arc::new(ScriptedTransport::new());
    let mut limited = TransportResponse::status(429);
    limited.retry_after = Some(Duration::from_secs(2));
    origin.push(URL, Scripted::Respond(limited));
    origin.serve(URL, "{}", None);

    fetcher(&origin, options(1, 10)).fetch(URL, None).await.unwrap();

    let requests = origin.requests_for(URL);
    assert!(requests[1].at - requests[0].at >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_attempt_timeout_is_retriable() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.push(URL, Scripted::Hang);
    origin.serve(URL, "{}", None);

    let outcome = fetcher(&origin, options(1, 10)).fetch(URL, None).await;

    assert!(outcome.is_ok());
    let requests = origin.requests_for(URL);
    assert_eq!(requests.len(), 2);
    assert!(requests[1].at - requests[0].at >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_connection_failures_are_retriable() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.push(
        URL,
        Scripted::Fail(TransportError::Connection("connection reset".into())),
    );
    origin.serve(URL, "{}", None);

    assert!(fetcher(&origin, options(1, 10)).fetch(URL, None).await.is_ok());
    assert_eq!(origin.count(URL), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_requests_are_not_retried() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.respond(URL, Scripted::Fail(TransportError::Invalid("bad url".into())));

    let err = fetcher(&origin, options(3, 10))
        .fetch(URL, None)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Rejected { .. }));
    assert_eq!(origin.count(URL), 1);
}

#[tokio::test]
async fn test_matching_validator_is_a_cache_hit() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.serve(URL, r#"{"v":1}"#, Some("\"v1\""));

    let outcome = fetcher(&origin, options(3, 10))
        .fetch(URL, Some(&Validator::etag("\"v1\"")))
        .await
        .unwrap();

    assert_eq!(outcome, FetchOutcome::NotModified);
    let request = &origin.requests_for(URL)[0];
    assert_eq!(
        request.conditional.as_ref().and_then(|v| v.etag.as_deref()),
        Some("\"v1\"")
    );
}

#[tokio::test]
async fn test_stale_validator_returns_body_and_new_validator() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.serve(URL, r#"{"v":2}"#, Some("\"v2\""));

    let outcome = fetcher(&origin, options(3, 10))
        .fetch(URL, Some(&Validator::etag("\"v1\"")))
        .await
        .unwrap();

    match outcome {
        FetchOutcome::Modified { body, validator } => {
            assert_eq!(&body[..], br#"{"v":2}"#);
            assert_eq!(validator, Validator::etag("\"v2\""));
        }
        FetchOutcome::NotModified => panic!("expected a body"),
    }
}

#[tokio::test]
async fn test_empty_validator_sends_unconditional_request() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.serve(URL, "{}", None);

    fetcher(&origin, options(0, 10))
        .fetch(URL, Some(&Validator::default()))
        .await
        .unwrap();

    assert!(origin.requests_for(URL)[0].conditional.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_a_hanging_attempt() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.respond(URL, Scripted::Hang);
    let cancel = CancellationToken::new();
    let fetcher = Fetcher::new(
        origin.clone(),
        FetchOptions {
            timeout: Duration::from_secs(60),
            ..options(3, 10)
        },
        cancel.clone(),
    );

    let trigger = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    };
    let (result, ()) = tokio::join!(fetcher.fetch(URL, None), trigger);

    match result {
        Err(FetchError::Cancelled { attempts, .. }) => assert_eq!(attempts, 1),
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_fetcher_makes_no_requests() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.serve(URL, "{}", None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = Fetcher::new(origin.clone(), options(3, 10), cancel)
        .fetch(URL, None)
        .await;

    assert!(matches!(result, Err(FetchError::Cancelled { attempts: 0, .. })));
    assert_eq!(origin.count(URL), 0);
}

#[tokio::test]
async fn test_fetch_json_reports_malformed_documents() {
    let origin = Arc::new(ScriptedTransport::new());
    origin.serve(URL, "{not json", None);

    let err = fetcher(&origin, options(0, 10))
        .fetch_json::<serde_json::Value>(URL)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Decode { .. }));
}

/// Counts how many requests are in flight at once.
#[derive(Default)]
struct GaugeTransport {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Transport for GaugeTransport {
    async fn get(&self, _request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(TransportResponse::ok("{}"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded_and_excess_requests_queue() {
    let transport = Arc::new(GaugeTransport::default());
    let fetcher = Fetcher::new(
        transport.clone(),
        FetchOptions {
            concurrency: 2,
            ..options(0, 10)
        },
        CancellationToken::new(),
    );

    let urls: Vec<String> = (0..6).map(|i| format!("https://cms.test/{i}.json")).collect();
    let results = futures::future::join_all(urls.iter().map(|u| fetcher.fetch(u, None))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.peak.load(Ordering::SeqCst), 2);
}
