//! Filter Rule Integration Tests
//!
//! Ignore rules as written in a config file, evaluated against records.

use chrono::{TimeZone, Utc};
use mediarr::domain::{MediaItem, MediaType};
use mediarr::filter::{ExpressionError, FilterRules};
use mediarr::library::LibraryFilters;

fn show(title: &str, year: i32) -> MediaItem {
    let date = Utc.with_ymd_and_hms(year, 3, 1, 0, 0, 0).unwrap();
    let mut item = MediaItem::new("trakt", MediaType::Show, title, date);
    item.tvdb_id = "1".to_string();
    item.runtime = 45;
    item.genres = vec!["drama".to_string()];
    item.languages = vec!["en".to_string()];
    item.network = "HBO".to_string();
    item
}

#[test]
fn test_year_rule() {
    let rules = FilterRules::compile(&["Year < 2000"]).unwrap();

    assert!(rules.matches(&show("Old", 1999)).unwrap());
    assert!(!rules.matches(&show("New", 2000)).unwrap());
}

#[test]
fn test_first_matching_rule_wins() {
    let rules = FilterRules::compile(&[
        "Runtime < 30",
        "\"reality\" in Genres",
        "Network == \"HBO\" && Year < 2010",
    ])
    .unwrap();

    assert!(rules.matches(&show("The Wire", 2002)).unwrap());
    assert!(!rules.matches(&show("Succession", 2018)).unwrap());
}

#[test]
fn test_string_operators() {
    let rules = FilterRules::compile(&[
        "Title startsWith \"The \" and not (\"en\" in Languages)",
        "Title matches \"(?i)^untitled\"",
    ])
    .unwrap();

    assert!(rules.matches(&show("Untitled Project", 2024)).unwrap());
    assert!(!rules.matches(&show("The Bear", 2022)).unwrap());
}

#[test]
fn test_invalid_rule_fails_at_compile_time() {
    assert!(matches!(
        FilterRules::compile(&["Rating > 5"]),
        Err(ExpressionError::UnknownAttribute { .. })
    ));
    assert!(matches!(
        FilterRules::compile(&["Runtime + 1"]),
        Err(ExpressionError::NotBoolean { .. })
    ));
    assert!(matches!(
        FilterRules::compile(&["Year <"]),
        Err(ExpressionError::Syntax { .. })
    ));
}

#[test]
fn test_library_filters_split_ignores_and_accepts() {
    let filters = LibraryFilters::new(&["Runtime < 30"], &["Year >= 2020"]).unwrap();

    let item = show("Recent", 2023);
    assert!(!filters.should_ignore(&item).unwrap());
    assert!(filters.should_accept(&item).unwrap());
}
