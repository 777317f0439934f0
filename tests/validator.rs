//! Identifier Validation Integration Tests
//!
//! Validation against a scripted site, memoized in the SQLite cache, and
//! applied inside the pagination loop.

mod common;

use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{Reply, TestServer};
use mediarr::cache::Database;
use mediarr::domain::{MediaItem, MediaType};
use mediarr::media::IdValidator;
use mediarr::provider::fetch::collect_pages;
use mediarr::provider::{ItemFilter, Page};
use mediarr::web::{HttpClient, RateLimiterRegistry};
use tokio_util::sync::CancellationToken;

fn show(tvdb_id: &str) -> MediaItem {
    let date = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
    let mut item = MediaItem::new("tvmaze", MediaType::Show, format!("Show {tvdb_id}"), date);
    item.tvdb_id = tvdb_id.to_string();
    item
}

async fn site() -> TestServer {
    TestServer::start(|request, _| match request.path.as_str() {
        "/dereferrer/series/100" | "/movie/200" => Reply::status(200).body("<html></html>"),
        _ => Reply::status(404),
    })
    .await
}

#[tokio::test]
async fn test_valid_ids_are_cached() {
    let server = site().await;
    let db = Database::open_in_memory().unwrap();
    let registry = RateLimiterRegistry::new();
    let validator = IdValidator::new(HttpClient::new().unwrap(), &registry)
        .with_cache(db.validation_cache(), Duration::from_secs(3600))
        .with_base_urls(server.url(), server.url());
    let cancel = CancellationToken::new();

    assert!(validator.validate(&show("100"), &cancel).await.unwrap());
    assert!(validator.validate(&show("100"), &cancel).await.unwrap());
    assert_eq!(server.hits(), 1);
    assert!(db.validation_cache().exists("tvdb", "100").unwrap());
}

#[tokio::test]
async fn test_invalid_ids_are_not_cached() {
    let server = site().await;
    let db = Database::open_in_memory().unwrap();
    let registry = RateLimiterRegistry::new();
    let validator = IdValidator::new(HttpClient::new().unwrap(), &registry)
        .with_cache(db.validation_cache(), Duration::from_secs(3600))
        .with_base_urls(server.url(), server.url());
    let cancel = CancellationToken::new();

    assert!(!validator.validate(&show("999"), &cancel).await.unwrap());
    assert!(!validator.validate(&show("999"), &cancel).await.unwrap());
    assert_eq!(server.hits(), 2);
    assert!(db.validation_cache().is_empty().unwrap());
}

#[tokio::test]
async fn test_tmdb_ids_use_movie_section() {
    let server = site().await;
    let registry = RateLimiterRegistry::new();
    let validator = IdValidator::new(HttpClient::new().unwrap(), &registry)
        .with_base_urls(server.url(), server.url());
    let cancel = CancellationToken::new();

    assert!(validator
        .validate_tmdb(MediaType::Movie, "200", &cancel)
        .await
        .unwrap());
    assert!(!validator
        .validate_tmdb(MediaType::Show, "200", &cancel)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_unreachable_site_means_invalid() {
    let registry = RateLimiterRegistry::new();
    let validator = IdValidator::new(HttpClient::new().unwrap(), &registry)
        .with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9");
    let cancel = CancellationToken::new();

    assert!(!validator.validate(&show("100"), &cancel).await.unwrap());
}

#[tokio::test]
async fn test_failed_validation_counts_as_ignored() {
    let server = site().await;
    let registry = RateLimiterRegistry::new();
    let validator = IdValidator::new(HttpClient::new().unwrap(), &registry)
        .with_base_urls(server.url(), server.url());
    let filter = ItemFilter::new().validator(&validator);
    let cancel = CancellationToken::new();

    let results = collect_pages("tvmaze", None, &filter, &cancel, |_| async {
        Ok(Page::last(vec![show("100"), show("101")]))
    })
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results.items.contains_key("100"));
    assert_eq!(results.stats.ignored, 1);
}
