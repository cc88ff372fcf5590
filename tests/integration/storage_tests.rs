//! File-backed storage round trips

use chrono::{Duration, Utc};
use page_lens::models::{HeadingCounts, LinkStatus};
use page_lens::storage::{clamp_limit, open_storage, SqliteStorage, Storage};
use page_lens::AnalysisResult;
use tempfile::tempdir;

fn analysis(url: &str, owner: Option<&str>, age: Duration) -> AnalysisResult {
    AnalysisResult {
        id: None,
        url: url.to_string(),
        html_version: "HTML5".to_string(),
        title: format!("Title of {}", url),
        headings: HeadingCounts::default(),
        internal_links: LinkStatus {
            count: 1,
            inaccessible: 0,
            unchecked: 0,
        },
        external_links: LinkStatus::default(),
        has_login_form: false,
        owner_id: owner.map(str::to_string),
        created_at: Utc::now() - age,
    }
}

#[test]
fn test_analyses_survive_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("analyses.db");

    let id = {
        let mut storage = open_storage(&db_path).unwrap();
        storage
            .save_analysis(&analysis("https://example.com/", Some("alice"), Duration::zero()))
            .unwrap()
    };

    let storage = SqliteStorage::new(&db_path).unwrap();
    let loaded = storage.get_analysis(id).unwrap().expect("row persisted");
    assert_eq!(loaded.url, "https://example.com/");
    assert_eq!(loaded.owner_id.as_deref(), Some("alice"));
}

#[test]
fn test_listing_limits_are_clamped() {
    let dir = tempdir().unwrap();
    let mut storage = open_storage(&dir.path().join("list.db")).unwrap();

    for i in 0..120 {
        let age = Duration::seconds(120 - i);
        storage
            .save_analysis(&analysis(&format!("https://example.com/{}", i), None, age))
            .unwrap();
    }

    let default = storage.recent_analyses(clamp_limit(None)).unwrap();
    assert_eq!(default.len(), 10);
    assert_eq!(default[0].url, "https://example.com/119");

    let capped = storage.recent_analyses(clamp_limit(Some(1000))).unwrap();
    assert_eq!(capped.len(), 100);

    let minimum = storage.recent_analyses(clamp_limit(Some(0))).unwrap();
    assert_eq!(minimum.len(), 1);
}

#[test]
fn test_stats_over_file_database() {
    let dir = tempdir().unwrap();
    let mut storage = open_storage(&dir.path().join("stats.db")).unwrap();

    let rows = [
        ("https://a.example/", Some("alice"), Duration::minutes(5)),
        ("https://a.example/", Some("alice"), Duration::hours(30)),
        ("https://b.example/", Some("bob"), Duration::days(3)),
        ("https://b.example/x", None, Duration::days(60)),
        ("https://b.example/y", None, Duration::days(61)),
    ];
    for (url, owner, age) in rows {
        storage.save_analysis(&analysis(url, owner, age)).unwrap();
    }

    let stats = storage.stats().unwrap();
    assert_eq!(stats.total_analyses, 5);
    assert_eq!(stats.unique_urls, 4);
    assert_eq!(stats.distinct_owners, 2);
    assert_eq!(stats.analyses_last_24h, 1);
    assert_eq!(stats.analyses_last_7d, 3);
    assert_eq!(stats.analyses_last_30d, 3);
    assert_eq!(stats.most_analyzed_host.as_deref(), Some("b.example"));
}
