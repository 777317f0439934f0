//! Contract with the media library manager (the system that owns the
//! collection and performs the actual add).
//!
//! The search pipeline only needs three things from it: the set of items it
//! already holds, an optional veto on candidates, and a way to add what
//! survives. `MemoryLibrary` is the only implementation: it holds the owned
//! items listed under `library.owned` in the config file, and searches use
//! it as the source of existing media and of the ignore veto.

pub mod existing;
pub mod filters;

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::MediaItem;
use crate::filter::ExpressionError;

pub use existing::ExistingMedia;
pub use filters::LibraryFilters;

/// Errors raised by a library manager
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Failed evaluating library filters: {0}")]
    Filter(#[from] ExpressionError),

    #[error("Library request failed: {0}")]
    Request(String),

    #[error("Media item has no usable identifier: {0}")]
    MissingId(String),
}

/// What the search pipeline expects of a library manager
#[async_trait]
pub trait LibraryManager: std::fmt::Debug + Send + Sync {
    /// Human-readable manager name
    fn name(&self) -> &str;

    /// Everything already in the library, indexed by external id
    async fn existing_media(&self) -> Result<ExistingMedia, LibraryError>;

    /// Whether `item` should be vetoed.
    ///
    /// An `Err` is a veto too; callers log it and skip the item.
    async fn should_ignore(&self, item: &MediaItem) -> Result<bool, LibraryError>;

    /// Add an accepted item to the library
    async fn add_media(&self, item: &MediaItem) -> Result<(), LibraryError>;
}

/// In-process library holding items in memory
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    filters: LibraryFilters,
    items: Mutex<ExistingMedia>,
}

impl MemoryLibrary {
    pub fn new(filters: LibraryFilters) -> Self {
        Self {
            filters,
            items: Mutex::new(ExistingMedia::default()),
        }
    }

    /// Start from an already populated collection
    pub fn with_items(mut self, items: impl IntoIterator<Item = MediaItem>) -> Self {
        let existing = self
            .items
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for item in items {
            existing.insert(item);
        }
        self
    }

    fn snapshot(&self) -> ExistingMedia {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LibraryManager for MemoryLibrary {
    fn name(&self) -> &str {
        "memory"
    }

    async fn existing_media(&self) -> Result<ExistingMedia, LibraryError> {
        let existing = self.snapshot();
        info!(count = existing.len(), "Retrieved existing media");
        Ok(existing)
    }

    async fn should_ignore(&self, item: &MediaItem) -> Result<bool, LibraryError> {
        Ok(self.filters.should_ignore(item)?)
    }

    async fn add_media(&self, item: &MediaItem) -> Result<(), LibraryError> {
        if !item.has_external_id() {
            return Err(LibraryError::MissingId(item.title.clone()));
        }

        debug!(item = %item, "Adding media item");
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaType;
    use chrono::{TimeZone, Utc};

    fn movie(tmdb_id: &str, year: i32) -> MediaItem {
        let date = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let mut item = MediaItem::new("tmdb", MediaType::Movie, "Movie", date);
        item.tmdb_id = tmdb_id.to_string();
        item
    }

    #[tokio::test]
    async fn test_add_then_existing() {
        let library = MemoryLibrary::default();
        library.add_media(&movie("603", 1999)).await.unwrap();

        let existing = library.existing_media().await.unwrap();
        assert!(existing.contains(&movie("603", 1999)));
        assert_eq!(existing.len(), 1);
    }

    #[tokio::test]
    async fn test_add_requires_an_id() {
        let library = MemoryLibrary::default();
        let result = library.add_media(&movie("", 1999)).await;
        assert!(matches!(result, Err(LibraryError::MissingId(_))));
    }

    #[tokio::test]
    async fn test_should_ignore_uses_filters() {
        let filters = LibraryFilters::new(&["Year < 2000"], &[] as &[&str]).unwrap();
        let library = MemoryLibrary::new(filters);

        assert!(library.should_ignore(&movie("1", 1999)).await.unwrap());
        assert!(!library.should_ignore(&movie("2", 2005)).await.unwrap());
    }
}
