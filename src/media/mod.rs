//! Helpers applied to search results: identifier validation, pruning of
//! owned items and ordering.

pub mod trakt;
pub mod validate;

use std::collections::HashMap;

use crate::domain::MediaItem;
use crate::library::ExistingMedia;

pub use trakt::{LookupError, LookupId, TraktLookup};
pub use validate::IdValidator;

/// Drop every found item whose canonical id the library already owns
pub fn prune_existing(
    existing: &ExistingMedia,
    found: HashMap<String, MediaItem>,
) -> HashMap<String, MediaItem> {
    found
        .into_iter()
        .filter(|(_, item)| {
            !existing.contains_id(item.media_type, item.canonical_kind(), item.canonical_id())
        })
        .collect()
}

/// Items ordered newest release first
pub fn sorted_by_release(items: impl IntoIterator<Item = MediaItem>) -> Vec<MediaItem> {
    let mut sorted: Vec<MediaItem> = items.into_iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}
