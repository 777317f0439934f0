//! Items already held by the library.

use std::collections::HashSet;

use crate::domain::{IdKind, MediaItem, MediaType};

/// Owned items, reachable through any of their external ids.
///
/// Ids are namespaced by media type and catalog, so a TMDB id never
/// matches a TVDB id that happens to share its digits.
#[derive(Debug, Clone, Default)]
pub struct ExistingMedia {
    items: Vec<MediaItem>,
    keys: HashSet<(MediaType, IdKind, String)>,
}

impl ExistingMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `item` under every external id it carries
    pub fn insert(&mut self, item: MediaItem) {
        for (kind, id) in item.external_ids() {
            self.keys.insert((item.media_type, kind, id.to_string()));
        }
        self.items.push(item);
    }

    /// Whether any of `item`'s ids is owned under the same type and catalog
    pub fn contains(&self, item: &MediaItem) -> bool {
        item.external_ids()
            .any(|(kind, id)| self.contains_id(item.media_type, kind, id))
    }

    pub fn contains_id(&self, media_type: MediaType, kind: IdKind, id: &str) -> bool {
        !id.is_empty() && self.keys.contains(&(media_type, kind, id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<MediaItem> for ExistingMedia {
    fn from_iter<I: IntoIterator<Item = MediaItem>>(iter: I) -> Self {
        let mut existing = Self::new();
        for item in iter {
            existing.insert(item);
        }
        existing
    }
}
