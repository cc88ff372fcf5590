//! Deep analysis and its freshness cache

use crate::test_config;
use chrono::{Duration as ChronoDuration, Utc};
use page_lens::models::SchemaFormat;
use page_lens::storage::{SqliteStorage, Storage};
use page_lens::{AnalysisService, Analyzer, DeepAnalysisResult};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RICH_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
  <title>Rich page</title>
  <meta name="description" content="Everything at once">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta property="og:title" content="Rich">
  <link rel="canonical" href="https://example.com/rich">
  <script src="/static/jquery.min.js"></script>
  <script type="application/ld+json">{"@context": "https://schema.org", "@type": "Organization"}</script>
</head><body>
  <h1>Rich</h1><h2>Part</h2>
  <img src="/a.png" alt="A"><img src="/b.png">
  <a href="/ok">fine link</a>
  <a href="/broken" rel="nofollow">broken link</a>
  <p>Rust analyzers analyze pages. Pages contain words.</p>
</body></html>"#;

async fn mount_rich_page(server: &MockServer, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(RICH_PAGE)
                .insert_header("content-type", "text/html")
                .insert_header("server", "mock-server")
                .insert_header("content-security-policy", "default-src 'self'")
                .insert_header("set-cookie", "session=abc; Max-Age=172800"),
        )
        .expect(expected_fetches)
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_deep_analysis_signals() {
    let server = MockServer::start().await;
    mount_rich_page(&server, 2).await;

    let analyzer = Analyzer::new(test_config(":memory:")).unwrap();
    let service = AnalysisService::new(analyzer, SqliteStorage::new_in_memory().unwrap());
    let cancel = CancellationToken::new();

    let stored = service
        .analyze_and_store(&cancel, &format!("{}/", server.uri()), None)
        .await
        .unwrap();
    let id = stored.id.unwrap();

    let deep = service
        .deep_analysis(&cancel, id)
        .await
        .unwrap()
        .expect("analysis exists");

    assert_eq!(deep.analysis_id, Some(id));
    assert_eq!(deep.seo.meta_tags.description, "Everything at once");
    assert_eq!(deep.seo.canonical_url, "https://example.com/rich");
    assert_eq!(deep.seo.images.total, 2);
    assert_eq!(deep.seo.images.missing_alt, 1);
    assert!(deep.seo.header_structure.proper);

    assert!(!deep.security.https);
    assert!(deep.security.csp_headers);
    assert!(!deep.security.xss_protection);
    assert_eq!(deep.technology.server, "mock-server");
    assert_eq!(deep.technology.frameworks, vec!["jquery".to_string()]);
    assert_eq!(deep.technology.cms, "Unknown");

    assert!(deep.mobile.viewport);
    assert!(deep.social.open_graph);
    assert!(!deep.social.twitter_cards);

    assert!(deep.schema.has_schema);
    assert_eq!(deep.schema.format, Some(SchemaFormat::JsonLd));
    assert_eq!(deep.schema.schema_types, vec!["Organization".to_string()]);

    assert_eq!(deep.cookies.total_count, 1);
    assert_eq!(deep.cookies.first_party, 1);
    assert_eq!(deep.cookies.max_age_days, 2);

    assert_eq!(deep.links.no_follow, 1);
    assert_eq!(deep.links.broken_links, 1);
    assert!(deep.content.word_count > 0);
    assert!(deep.performance.resource_size > 0);

    server.verify().await;
}

#[tokio::test]
async fn test_fresh_deep_analysis_is_served_from_cache() {
    let server = MockServer::start().await;
    // One fetch for the analysis and one for the first deep analysis
    mount_rich_page(&server, 2).await;

    let analyzer = Analyzer::without_link_checks(test_config(":memory:")).unwrap();
    let service = AnalysisService::new(analyzer, SqliteStorage::new_in_memory().unwrap());
    let cancel = CancellationToken::new();

    let id = service
        .analyze_and_store(&cancel, &server.uri(), None)
        .await
        .unwrap()
        .id
        .unwrap();

    let first = service.deep_analysis(&cancel, id).await.unwrap().unwrap();
    let second = service.deep_analysis(&cancel, id).await.unwrap().unwrap();

    assert_eq!(
        first.created_at.timestamp_micros(),
        second.created_at.timestamp_micros()
    );
    assert_eq!(second.analysis_id, Some(id));
    server.verify().await;
}

#[tokio::test]
async fn test_stale_deep_analysis_is_recomputed_and_replaced() {
    let server = MockServer::start().await;
    // One fetch for the seeding analysis and one for the recomputation
    mount_rich_page(&server, 2).await;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("deep.db");

    let id = {
        let analyzer = Analyzer::without_link_checks(test_config(":memory:")).unwrap();
        let seed = AnalysisService::new(analyzer, SqliteStorage::new(&db_path).unwrap());
        seed.analyze_and_store(&CancellationToken::new(), &server.uri(), None)
            .await
            .unwrap()
            .id
            .unwrap()
    };

    // A two-hour-old deep analysis is past the one-hour window
    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        let mut old = DeepAnalysisResult {
            analysis_id: Some(id),
            url: format!("{}/", server.uri()),
            created_at: Utc::now() - ChronoDuration::hours(2),
            performance: Default::default(),
            seo: Default::default(),
            accessibility: Default::default(),
            content: Default::default(),
            security: Default::default(),
            mobile: Default::default(),
            social: Default::default(),
            technology: Default::default(),
            media: Default::default(),
            schema: Default::default(),
            cookies: Default::default(),
            links: Default::default(),
        };
        old.seo.meta_tags.description = "stale".to_string();
        storage.save_deep(&old).unwrap();
    }

    let analyzer = Analyzer::without_link_checks(test_config(":memory:")).unwrap();
    let service = AnalysisService::new(analyzer, SqliteStorage::new(&db_path).unwrap());
    let deep = service
        .deep_analysis(&CancellationToken::new(), id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(deep.seo.meta_tags.description, "Everything at once");
    assert!(Utc::now() - deep.created_at < ChronoDuration::minutes(1));

    let storage = SqliteStorage::new(&db_path).unwrap();
    let reloaded = storage.get_deep(id).unwrap().unwrap();
    assert_eq!(reloaded.seo.meta_tags.description, "Everything at once");
    server.verify().await;
}

#[tokio::test]
async fn test_deep_analysis_of_unknown_id_is_none() {
    let analyzer = Analyzer::without_link_checks(test_config(":memory:")).unwrap();
    let service = AnalysisService::new(analyzer, SqliteStorage::new_in_memory().unwrap());

    let result = service
        .deep_analysis(&CancellationToken::new(), 12345)
        .await
        .unwrap();
    assert!(result.is_none());
}
