//! The canonical media record.
//!
//! Every provider translates its raw catalog entries into a `MediaItem`
//! before anything else in the pipeline looks at them.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media a provider is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Feature films (keyed by TMDB id)
    Movie,

    /// Television series (keyed by TVDB id)
    Show,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Show => write!(f, "show"),
        }
    }
}

/// Catalog an external identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Tvdb,
    Tmdb,
    Imdb,
}

/// One discovered title, normalized across providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Provider that produced this record (e.g. "trakt")
    pub provider: String,

    /// Movie or show
    pub media_type: MediaType,

    /// TheTVDB id (empty if unknown)
    #[serde(default)]
    pub tvdb_id: String,

    /// TheMovieDB id (empty if unknown)
    #[serde(default)]
    pub tmdb_id: String,

    /// IMDb id (empty if unknown)
    #[serde(default)]
    pub imdb_id: String,

    /// Provider slug
    #[serde(default)]
    pub slug: String,

    pub title: String,

    /// Release date (first air date for shows)
    pub date: DateTime<Utc>,

    /// Running time in minutes
    #[serde(default)]
    pub runtime: u32,

    #[serde(default)]
    pub countries: Vec<String>,

    /// Distribution network (shows only)
    #[serde(default)]
    pub network: String,

    /// Lifecycle status as reported by the provider (e.g. "released")
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub genres: Vec<String>,

    #[serde(default)]
    pub languages: Vec<String>,

    #[serde(default)]
    pub summary: String,

    /// Character played, for person search results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
}

impl MediaItem {
    /// Create a record with the required attributes; everything else is empty
    pub fn new(
        provider: impl Into<String>,
        media_type: MediaType,
        title: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            provider: provider.into(),
            media_type,
            tvdb_id: String::new(),
            tmdb_id: String::new(),
            imdb_id: String::new(),
            slug: String::new(),
            title: title.into(),
            date,
            runtime: 0,
            countries: Vec::new(),
            network: String::new(),
            status: String::new(),
            genres: Vec::new(),
            languages: Vec::new(),
            summary: String::new(),
            character: None,
        }
    }

    /// Release year, derived from the release date
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// The identifier results are keyed by: TMDB for movies, TVDB for shows
    pub fn canonical_id(&self) -> &str {
        match self.canonical_kind() {
            IdKind::Tmdb => &self.tmdb_id,
            _ => &self.tvdb_id,
        }
    }

    pub fn canonical_kind(&self) -> IdKind {
        match self.media_type {
            MediaType::Movie => IdKind::Tmdb,
            MediaType::Show => IdKind::Tvdb,
        }
    }

    /// All non-empty external identifiers carried by this record, with their catalog
    pub fn external_ids(&self) -> impl Iterator<Item = (IdKind, &str)> {
        [
            (IdKind::Tvdb, self.tvdb_id.as_str()),
            (IdKind::Tmdb, self.tmdb_id.as_str()),
            (IdKind::Imdb, self.imdb_id.as_str()),
        ]
        .into_iter()
        .filter(|(_, id)| !id.is_empty())
    }

    /// Whether the record is eligible for acceptance at all
    pub fn has_external_id(&self) -> bool {
        self.external_ids().next().is_some()
    }
}

impl std::fmt::Display for MediaItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.title, self.year())?;
        if !self.canonical_id().is_empty() {
            write!(f, " [{}]", self.canonical_id())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn movie() -> MediaItem {
        let date = Utc.with_ymd_and_hms(2019, 10, 4, 0, 0, 0).unwrap();
        let mut item = MediaItem::new("trakt", MediaType::Movie, "Joker", date);
        item.tmdb_id = "475557".to_string();
        item.imdb_id = "tt7286456".to_string();
        item
    }

    #[test]
    fn test_year_is_derived_from_date() {
        assert_eq!(movie().year(), 2019);
    }

    #[test]
    fn test_canonical_id_by_media_type() {
        let item = movie();
        assert_eq!(item.canonical_id(), "475557");

        let mut show = item.clone();
        show.media_type = MediaType::Show;
        show.tvdb_id = "81189".to_string();
        assert_eq!(show.canonical_id(), "81189");
        assert_eq!(show.canonical_kind(), IdKind::Tvdb);
    }

    #[test]
    fn test_external_ids_skip_empty() {
        let item = movie();
        let ids: Vec<(IdKind, &str)> = item.external_ids().collect();
        assert_eq!(ids, vec![(IdKind::Tmdb, "475557"), (IdKind::Imdb, "tt7286456")]);
        assert!(item.has_external_id());

        let bare = MediaItem::new("tmdb", MediaType::Movie, "Untitled", item.date);
        assert!(!bare.has_external_id());
    }

    #[test]
    fn test_display() {
        assert_eq!(movie().to_string(), "Joker (2019) [475557]");
    }
}
