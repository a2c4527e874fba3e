//! End-to-end mirror runs over real HTTP
//!
//! Exercises the whole stack: configuration -> run context -> HTTP transport
//! -> per-domain sync -> reconcile -> manifests on disk.

use std::sync::Arc;

use mirror_core::{
    CacheManifest, DomainKind, DomainStatus, ManifestStore, Mirror, MirrorConfig, RunContext,
    RunSummary,
};
use mirror_fetch::HttpTransport;
use mirror_test_utils::TestMirror;
use mockito::{Matcher, Mock, Server};
use pretty_assertions::assert_eq;

fn config(mirror: &TestMirror, origin: &str) -> MirrorConfig {
    let mut config = MirrorConfig {
        origin: Some(origin.to_string()),
        mirror_root: mirror.mirror_root(),
        state_dir: mirror.state_dir(),
        ..MirrorConfig::default()
    };
    config.fetch.max_retries = 1;
    config.fetch.base_retry_delay_ms = 1;
    config.fetch.max_retry_delay_ms = 5;
    config
}

async fn run(config: MirrorConfig) -> RunSummary {
    let transport = HttpTransport::new().unwrap();
    let ctx = RunContext::new(config, Arc::new(transport)).unwrap();
    Mirror::new(&ctx).run().await
}

fn manifest(mirror: &TestMirror, kind: DomainKind) -> CacheManifest {
    ManifestStore::new(mirror.state_dir().join(format!("{kind}.manifest.json")))
        .try_load()
        .unwrap()
        .unwrap()
}

async fn json_mock(server: &mut Server, path: &str, body: &str) -> Mock {
    server
        .mock("GET", path)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_run_transfers_nothing() {
    let mut server = Server::new_async().await;
    let mirror = TestMirror::new();

    json_mock(
        &mut server,
        "/content/index.json",
        r#"{"nodes": [{"path": "home", "rev": 1}]}"#,
    )
    .await;
    let home = json_mock(&mut server, "/content/nodes/home.json", r#"{"title": "Home"}"#).await;

    json_mock(&mut server, "/fonts/index.json", r#"{"files": ["inter.woff2"]}"#).await;
    let font_fresh = server
        .mock("GET", "/fonts/files/inter.woff2")
        .match_header("if-none-match", Matcher::Missing)
        .with_header("etag", "\"inter-1\"")
        .with_body("wOF2inter")
        .expect(1)
        .create_async()
        .await;
    let font_revalidated = server
        .mock("GET", "/fonts/files/inter.woff2")
        .match_header("if-none-match", "\"inter-1\"")
        .with_status(304)
        .expect(1)
        .create_async()
        .await;

    json_mock(
        &mut server,
        "/media/index.json",
        r#"{"assets": [{"path": "hero.jpg", "size": 4, "etag": "\"hero-1\""}]}"#,
    )
    .await;
    let hero = server
        .mock("GET", "/media/files/hero.jpg")
        .with_body("JPEG")
        .expect(1)
        .create_async()
        .await;

    let first = run(config(&mirror, &server.url())).await;
    assert_eq!(first.count(DomainStatus::Completed), 3, "{first:#?}");

    let second = run(config(&mirror, &server.url())).await;
    assert_eq!(second.count(DomainStatus::Completed), 3, "{second:#?}");

    let content = second.report(DomainKind::Content).unwrap();
    assert_eq!(content.unchanged, vec!["_index", "home"]);
    let fonts = second.report(DomainKind::Fonts).unwrap();
    assert_eq!(fonts.unchanged, vec!["inter.woff2"]);
    assert_eq!(fonts.bytes_fetched, 0);
    let media = second.report(DomainKind::Media).unwrap();
    assert_eq!(media.unchanged, vec!["hero.jpg"]);

    home.assert_async().await;
    font_fresh.assert_async().await;
    font_revalidated.assert_async().await;
    hero.assert_async().await;

    assert_eq!(mirror.read("mirror/fonts/inter.woff2"), "wOF2inter");
    let fonts_manifest = manifest(&mirror, DomainKind::Fonts);
    let entry = fonts_manifest.get("inter.woff2").unwrap();
    assert_eq!(entry.validator.etag.as_deref(), Some("\"inter-1\""));
    assert_eq!(entry.size, 9);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_removed_node_is_deleted_locally() {
    let mut server = Server::new_async().await;
    let mirror = TestMirror::new();

    let index = json_mock(
        &mut server,
        "/content/index.json",
        r#"{"nodes": [{"path": "home"}, {"path": "blog/old"}]}"#,
    )
    .await;
    json_mock(&mut server, "/content/nodes/home.json", r#"{"title": "Home"}"#).await;
    json_mock(&mut server, "/content/nodes/blog/old.json", r#"{"title": "Old"}"#).await;

    let mut content_only = config(&mirror, &server.url());
    content_only.domains = vec![DomainKind::Content];

    run(content_only.clone()).await;
    mirror.assert_file_exists("mirror/content/blog/old.json");

    index.remove_async().await;
    json_mock(
        &mut server,
        "/content/index.json",
        r#"{"nodes": [{"path": "home"}]}"#,
    )
    .await;

    let summary = run(content_only).await;
    let report = summary.report(DomainKind::Content).unwrap();
    assert_eq!(report.removed, vec!["blog/old"]);
    assert_eq!(
        mirror.files_under("mirror/content"),
        vec!["_index.json", "home.json"]
    );
    assert!(manifest(&mirror, DomainKind::Content).get("blog/old").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transient_server_error_is_retried() {
    let mut server = Server::new_async().await;
    let mirror = TestMirror::new();

    json_mock(&mut server, "/media/index.json", r#"{"assets": [{"path": "a.png"}]}"#).await;
    let asset = server
        .mock("GET", "/media/files/a.png")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let mut media_only = config(&mirror, &server.url());
    media_only.domains = vec![DomainKind::Media];

    let summary = run(media_only).await;
    let report = summary.report(DomainKind::Media).unwrap();
    assert_eq!(report.status, DomainStatus::CompletedWithSkips);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "a.png");
    assert_eq!(report.skipped[0].attempts, 2);
    asset.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_origin_fails_each_domain() {
    let mirror = TestMirror::new();
    // Nothing listens on the discard port
    let summary = run(config(&mirror, "http://127.0.0.1:9")).await;

    assert_eq!(summary.count(DomainStatus::Failed), 3);
    assert!(summary.has_failures());
    mirror.assert_file_missing("state/content.manifest.json");
}
