//! Batch orchestration against mock servers

use crate::test_config;
use page_lens::storage::SqliteStorage;
use page_lens::{AnalysisService, Analyzer, AnalyzerError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_any_page(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>Page</title></head><body><a href="/home">home</a></body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn page_urls(server: &MockServer, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{}/page/{}", server.uri(), i))
        .collect()
}

#[tokio::test]
async fn test_batch_with_unreachable_hosts() {
    let server = MockServer::start().await;
    mount_any_page(&server).await;

    let mut urls = page_urls(&server, 8);
    urls.insert(3, "http://127.0.0.1:1/down".to_string());
    urls.push("http://127.0.0.1:1/also-down".to_string());

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let report = analyzer
        .analyze_urls(&CancellationToken::new(), urls)
        .await
        .expect("a batch with successes is not an error");

    assert_eq!(report.succeeded(), 8);
    assert_eq!(report.failed(), 2);
    assert!(report.failures.iter().all(|f| f.url.starts_with("http://127.0.0.1:1/")));
    assert!(report.failures.iter().all(|f| f.error.is_fetch_failure()));
    assert!(report.results.iter().all(|r| r.title == "Page"));

    let mut urls: Vec<_> = report.results.iter().map(|r| r.url.clone()).collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 8, "every success is attributable to its own URL");
}

#[tokio::test]
async fn test_batch_error_summary_is_capped() {
    let server = MockServer::start().await;
    mount_any_page(&server).await;

    let mut urls = page_urls(&server, 1);
    urls.extend((0..7).map(|i| format!("ftp://invalid-{}.example/", i)));

    let analyzer = Analyzer::without_link_checks(test_config(":memory:")).unwrap();
    let report = analyzer
        .analyze_urls(&CancellationToken::new(), urls)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 7);

    let summary = report.summary();
    assert!(summary.starts_with("7 errors occurred during analysis:"));
    assert_eq!(summary.matches("\n- ").count(), 5);
    assert!(summary.ends_with("... and 2 more errors"));
}

#[tokio::test]
async fn test_batch_where_every_url_fails() {
    let urls = vec![
        "http://127.0.0.1:1/a".to_string(),
        "ftp://example.com/".to_string(),
        String::new(),
    ];

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let result = analyzer.analyze_urls(&CancellationToken::new(), urls).await;

    match result {
        Err(AnalyzerError::PartialBatchFailure {
            succeeded,
            failed,
            summary,
        }) => {
            assert_eq!(succeeded, 0);
            assert_eq!(failed, 3);
            assert!(summary.contains("3 errors occurred"));
        }
        other => panic!("expected PartialBatchFailure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_batch_is_empty_report() {
    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let report = analyzer
        .analyze_urls(&CancellationToken::new(), Vec::new())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 0);
    assert_eq!(report.failed(), 0);
}

#[tokio::test]
async fn test_batch_cancelled_before_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let result = analyzer.analyze_urls(&cancel, page_urls(&server, 5)).await;

    assert!(matches!(result, Err(AnalyzerError::Cancelled)));
    server.verify().await;
}

#[tokio::test]
async fn test_batch_cancelled_mid_flight_returns_promptly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let started = std::time::Instant::now();
    let result = analyzer.analyze_urls(&cancel, page_urls(&server, 10)).await;

    assert!(matches!(result, Err(AnalyzerError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_batch_cancelled_while_dispatching_keeps_every_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    // One worker and a one-slot queue leave the dispatcher waiting on a slot
    let mut config = test_config(":memory:");
    config.batch.max_concurrent_analyses = 1;
    config.batch.url_queue_capacity = 1;

    let mut urls = vec![format!("{}/fast", server.uri())];
    urls.extend(page_urls(&server, 4));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let analyzer = Analyzer::without_link_checks(config).unwrap();
    let report = analyzer.analyze_urls(&cancel, urls.clone()).await.unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 4);
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f.error, AnalyzerError::Cancelled)));

    let mut seen: Vec<String> = report
        .results
        .iter()
        .map(|r| r.url.clone())
        .chain(report.failures.iter().map(|f| f.url.clone()))
        .collect();
    seen.sort();
    urls.sort();
    assert_eq!(seen, urls);
}

#[tokio::test]
async fn test_service_stores_batch_successes() {
    let server = MockServer::start().await;
    mount_any_page(&server).await;

    let mut urls = page_urls(&server, 4);
    urls.push("http://127.0.0.1:1/down".to_string());

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let service = AnalysisService::new(analyzer, SqliteStorage::new_in_memory().unwrap());
    let report = service
        .analyze_batch_and_store(&CancellationToken::new(), urls, Some("batcher"))
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 4);
    assert!(report.results.iter().all(|r| r.id.is_some()));

    let stored = service.owner_analyses("batcher", None).unwrap();
    assert_eq!(stored.len(), 4);
    assert_eq!(service.stats().unwrap().total_analyses, 4);
}
