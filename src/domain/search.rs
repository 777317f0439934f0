//! Search modes and the free-form query passed to providers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named catalog query mode.
///
/// Providers map these onto their own endpoints; not every provider
/// supports every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Popular,
    Trending,
    /// Most anticipated / upcoming releases
    Upcoming,
    /// Most watched
    Watched,
    /// Currently in cinemas (box office / now playing)
    Now,
    /// Full airing schedule
    Schedule,
    /// Titles a person appeared in (needs a `person` param)
    Person,
    /// Items of a user list (needs `user` and `list` params)
    List,
}

impl SearchType {
    pub const ALL: [SearchType; 8] = [
        SearchType::Popular,
        SearchType::Trending,
        SearchType::Upcoming,
        SearchType::Watched,
        SearchType::Now,
        SearchType::Schedule,
        SearchType::Person,
        SearchType::List,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Popular => "popular",
            SearchType::Trending => "trending",
            SearchType::Upcoming => "upcoming",
            SearchType::Watched => "watched",
            SearchType::Now => "now",
            SearchType::Schedule => "schedule",
            SearchType::Person => "person",
            SearchType::List => "list",
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown search type: {0}")]
pub struct ParseSearchTypeError(String);

impl std::str::FromStr for SearchType {
    type Err = ParseSearchTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "popular" => Ok(SearchType::Popular),
            "trending" => Ok(SearchType::Trending),
            "upcoming" | "anticipated" => Ok(SearchType::Upcoming),
            "watched" => Ok(SearchType::Watched),
            "now" | "now_playing" | "boxoffice" => Ok(SearchType::Now),
            "schedule" => Ok(SearchType::Schedule),
            "person" => Ok(SearchType::Person),
            "list" => Ok(SearchType::List),
            _ => Err(ParseSearchTypeError(s.to_string())),
        }
    }
}

/// Input to a provider search
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Which catalog query to run
    pub search_type: SearchType,

    /// Stop after this many accepted items
    pub limit: Option<usize>,

    /// Free-form parameters using generic logic keys (country, language, ...)
    pub params: HashMap<String, String>,
}

impl SearchQuery {
    /// Create a query with no limit and no params
    pub fn new(search_type: SearchType) -> Self {
        Self {
            search_type,
            limit: None,
            params: HashMap::new(),
        }
    }

    /// Set the accepted item cap
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter, treating empty values as absent
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}
