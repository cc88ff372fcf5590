//! Single-page analysis against mock servers

use crate::{other_host_uri, test_config};
use page_lens::storage::SqliteStorage;
use page_lens::{AnalysisService, Analyzer, AnalyzerError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_head_ok(server: &MockServer) {
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn in_memory_service(analyzer: Analyzer) -> AnalysisService {
    AnalysisService::new(analyzer, SqliteStorage::new_in_memory().unwrap())
}

#[tokio::test]
async fn test_full_single_page_analysis() {
    let server = MockServer::start().await;
    let other = other_host_uri(&server);

    mount_page(
        &server,
        "/",
        format!(
            r#"<!DOCTYPE html>
            <html><head><title>Sign in</title></head><body>
            <h1>Welcome</h1><h2>One</h2><h2>Two</h2>
            <form action="/session">
                <input type="text" name="username">
                <input type="password" name="password">
            </form>
            <a href="/a">A</a>
            <a href="/b">B</a>
            <a href="/a">A again</a>
            <a href="/c#top">C</a>
            <a href="{other}/x">X</a>
            <a href="{other}/y">Y</a>
            </body></html>"#
        ),
    )
    .await;
    mount_head_ok(&server).await;

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &format!("{}/", server.uri()))
        .await
        .expect("analysis should succeed");

    assert_eq!(result.html_version, "HTML5");
    assert_eq!(result.title, "Sign in");
    assert_eq!(result.headings.h1, 1);
    assert_eq!(result.headings.h2, 2);
    assert_eq!(result.headings.h3, 0);
    assert!(result.has_login_form);
    assert_eq!(result.internal_links.count, 3);
    assert_eq!(result.external_links.count, 2);
    assert_eq!(result.internal_links.inaccessible, 0);
    assert_eq!(result.external_links.inaccessible, 0);
    assert_eq!(result.internal_links.unchecked, 0);
}

#[tokio::test]
async fn test_html_401_doctype_detected() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">
        <html><head><title>Old</title></head><body><p>text</p></body></html>"#
            .to_string(),
    )
    .await;

    let analyzer = Analyzer::without_link_checks(test_config(":memory:")).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await
        .unwrap();

    assert_eq!(result.html_version, "HTML 4.01");
    assert!(!result.has_login_form);
}

#[tokio::test]
async fn test_missing_doctype_is_assumed_html5() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "<html><body><form id=\"search\"><input type=\"text\" name=\"q\"></form></body></html>"
            .to_string(),
    )
    .await;

    let analyzer = Analyzer::without_link_checks(test_config(":memory:")).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await
        .unwrap();

    assert_eq!(result.html_version, "HTML5 (assumed)");
    assert!(!result.has_login_form);
}

#[tokio::test]
async fn test_primary_404_is_http_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = in_memory_service(Analyzer::new(test_config(":memory:")).unwrap());
    let result = service
        .analyze_and_store(&CancellationToken::new(), &format!("{}/missing", server.uri()), None)
        .await;

    match result {
        Err(AnalyzerError::HttpStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected HttpStatus error, got {:?}", other),
    }
    assert!(service.recent(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_redirect_status_accessible_and_404_inaccessible() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/moved">moved</a><a href="/gone">gone</a></body></html>"#
            .to_string(),
    )
    .await;

    // No Location header, so the 301 itself is the probe result
    Mock::given(method("HEAD"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(301))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await
        .unwrap();

    assert_eq!(result.internal_links.count, 2);
    assert_eq!(result.internal_links.inaccessible, 1);
    assert_eq!(result.internal_links.accessible(), 1);
}

#[tokio::test]
async fn test_unreachable_link_counts_as_inaccessible() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="http://127.0.0.1:1/nowhere">dead</a></body></html>"#.to_string(),
    )
    .await;

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await
        .expect("probe failures never fail the analysis");

    // a different port is a different origin
    assert_eq!(result.internal_links.count, 0);
    assert_eq!(result.external_links.count, 1);
    assert_eq!(result.external_links.inaccessible, 1);
}

#[tokio::test]
async fn test_repeated_href_is_probed_once() {
    let server = MockServer::start().await;
    let links: String = (0..30).map(|_| r#"<a href="/same">same</a>"#).collect();
    mount_page(&server, "/", format!("<html><body>{}</body></html>", links)).await;

    Mock::given(method("HEAD"))
        .and(path("/same"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await
        .unwrap();

    assert_eq!(result.internal_links.count, 1);
    server.verify().await;
}

#[tokio::test]
async fn test_many_links_drain_through_small_queue() {
    let server = MockServer::start().await;
    let links: String = (0..60)
        .map(|i| format!(r#"<a href="/link/{}">{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", format!("<html><body>{}</body></html>", links)).await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(60)
        .mount(&server)
        .await;

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await
        .unwrap();

    assert_eq!(result.internal_links.count, 60);
    assert_eq!(result.internal_links.inaccessible, 0);
    assert_eq!(result.internal_links.unchecked, 0);
    server.verify().await;
}

#[tokio::test]
async fn test_inaccessible_tally_is_exact_with_full_queue() {
    let server = MockServer::start().await;
    let links: String = (0..60)
        .map(|i| format!(r#"<a href="/missing/{}">{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", format!("<html><body>{}</body></html>", links)).await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .expect(60)
        .mount(&server)
        .await;

    let mut config = test_config(":memory:");
    config.single.probe_workers = 4;
    config.single.probe_queue_capacity = 2;

    let analyzer = Analyzer::new(config).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await
        .unwrap();

    assert_eq!(result.internal_links.count, 60);
    assert_eq!(result.internal_links.inaccessible, 60);
    assert_eq!(result.internal_links.unchecked, 0);
    assert_eq!(result.internal_links.accessible(), 0);
    server.verify().await;
}

#[tokio::test]
async fn test_page_over_memory_budget_is_refused_before_body_is_read() {
    let server = MockServer::start().await;
    // 300 KiB at a 5x multiplier is past a 1 MiB budget
    let body = format!("<html><body><p>{}</p></body></html>", "x".repeat(300 * 1024));
    mount_page(&server, "/", body).await;

    let mut config = test_config(":memory:");
    config.limits.max_memory_mb = 1;
    config.limits.overhead_multiplier = 5;

    let analyzer = Analyzer::new(config).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await;

    assert!(matches!(result, Err(AnalyzerError::ResourceExhausted(_))));
    assert_eq!(analyzer.admission().available_kib(), 1024);
}

#[tokio::test]
async fn test_page_admission_is_released_after_analysis() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<html><body><h1>Small</h1></body></html>".to_string()).await;

    let mut config = test_config(":memory:");
    config.limits.max_memory_mb = 1;

    let analyzer = Analyzer::without_link_checks(config).unwrap();
    analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await
        .unwrap();

    assert_eq!(analyzer.admission().available_kib(), 1024);
}

#[tokio::test]
async fn test_no_probe_marks_links_unchecked() {
    let server = MockServer::start().await;
    let other = other_host_uri(&server);
    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="/a">a</a><a href="{other}/b">b</a></body></html>"#),
    )
    .await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let analyzer = Analyzer::without_link_checks(test_config(":memory:")).unwrap();
    let result = analyzer
        .analyze_url(&CancellationToken::new(), &server.uri())
        .await
        .unwrap();

    assert_eq!(result.internal_links.count, 1);
    assert_eq!(result.internal_links.unchecked, 1);
    assert_eq!(result.external_links.unchecked, 1);
    assert_eq!(result.internal_links.inaccessible, 0);
    server.verify().await;
}

#[tokio::test]
async fn test_cancel_before_network_persists_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let service = in_memory_service(Analyzer::new(test_config(":memory:")).unwrap());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = service
        .analyze_and_store(&cancel, &server.uri(), Some("alice"))
        .await;

    assert!(matches!(result, Err(AnalyzerError::Cancelled)));
    assert!(service.recent(None).unwrap().is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_cancel_during_slow_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let service = in_memory_service(Analyzer::new(test_config(":memory:")).unwrap());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = service
        .analyze_and_store(&cancel, &server.uri(), None)
        .await;

    assert!(matches!(result, Err(AnalyzerError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(service.recent(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_stored_analysis_keeps_owner() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<html><head><title>Mine</title></head></html>".to_string()).await;

    let service = in_memory_service(Analyzer::without_link_checks(test_config(":memory:")).unwrap());
    let stored = service
        .analyze_and_store(&CancellationToken::new(), &server.uri(), Some("alice"))
        .await
        .unwrap();

    let id = stored.id.expect("stored analyses have an id");
    let loaded = service.get_analysis(id).unwrap().unwrap();
    assert_eq!(loaded.title, "Mine");
    assert_eq!(loaded.owner_id.as_deref(), Some("alice"));

    assert_eq!(service.owner_analyses("alice", None).unwrap().len(), 1);
    assert!(service.owner_analyses("bob", None).unwrap().is_empty());
}
