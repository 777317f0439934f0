//! Validation Cache Integration Tests
//!
//! On-disk SQLite behaviour: persistence across handles and lazy expiry.

use std::time::Duration;

use chrono::Utc;
use mediarr::cache::Database;
use tempfile::TempDir;

#[test]
fn test_entries_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("vault.db");

    {
        let db = Database::open(&path).unwrap();
        db.validation_cache()
            .add("tvdb", "334824", Duration::from_secs(3600))
            .unwrap();
    }

    let db = Database::open(&path).unwrap();
    let cache = db.validation_cache();
    assert!(cache.exists("tvdb", "334824").unwrap());
    assert!(!cache.exists("tmdb", "334824").unwrap());
}

#[test]
fn test_expired_entry_is_absent_and_removed() {
    let temp = TempDir::new().unwrap();
    let db = Database::open(temp.path().join("vault.db")).unwrap();
    let cache = db.validation_cache();

    let added = Utc::now();
    cache
        .add_at("tmdb", "475557", Duration::from_secs(60), added)
        .unwrap();

    assert!(cache
        .exists_at("tmdb", "475557", added + chrono::Duration::seconds(59))
        .unwrap());
    assert!(!cache
        .exists_at("tmdb", "475557", added + chrono::Duration::seconds(61))
        .unwrap());

    // The stale row is gone, so even the original clock no longer sees it
    assert!(!cache.exists_at("tmdb", "475557", added).unwrap());
    assert_eq!(cache.len().unwrap(), 0);
}

#[test]
fn test_views_share_one_database() {
    let temp = TempDir::new().unwrap();
    let db = Database::open(temp.path().join("vault.db")).unwrap();

    let writer = db.validation_cache();
    let reader = db.validation_cache();
    writer.add("tvdb", "1", Duration::from_secs(60)).unwrap();

    assert!(reader.exists("tvdb", "1").unwrap());
}
