//! Catalog providers: where candidate titles come from.
//!
//! Each provider maps generic search types and parameters onto its own API,
//! translates raw entries into `MediaItem`s and hands pages to the shared
//! pagination loop in `fetch`.

pub mod client;
pub mod fetch;
pub mod tmdb;
pub mod trakt;
pub mod tvmaze;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::{MediaType, SearchQuery, SearchType};
use crate::web::{HttpClient, RateLimiterRegistry, RetryPolicy, WebError};

pub use fetch::{FetchStats, ItemFilter, Page, SearchResults};
pub use tmdb::Tmdb;
pub use trakt::Trakt;
pub use tvmaze::TvMaze;

/// Per-attempt timeout for provider API calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors raised by providers
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider {provider} is misconfigured: {message}")]
    Configuration {
        provider: &'static str,
        message: String,
    },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error(transparent)]
    Transport(WebError),

    #[error("Request to {url} returned {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Provider {provider} does not support {media_type}s")]
    UnsupportedMediaType {
        provider: &'static str,
        media_type: MediaType,
    },

    #[error("Provider {provider} does not support {search_type} searches for {media_type}s")]
    UnsupportedSearchType {
        provider: &'static str,
        media_type: MediaType,
        search_type: SearchType,
    },

    #[error("{search_type} search requires the '{param}' parameter")]
    MissingParam {
        search_type: SearchType,
        param: &'static str,
    },

    #[error("Search cancelled")]
    Cancelled,
}

impl From<WebError> for ProviderError {
    fn from(err: WebError) -> Self {
        match err {
            WebError::Cancelled => ProviderError::Cancelled,
            other => ProviderError::Transport(other),
        }
    }
}

/// Known providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Trakt,
    Tmdb,
    TvMaze,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Trakt, ProviderKind::Tmdb, ProviderKind::TvMaze];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Trakt => "trakt",
            ProviderKind::Tmdb => "tmdb",
            ProviderKind::TvMaze => "tvmaze",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trakt" => Ok(ProviderKind::Trakt),
            "tmdb" => Ok(ProviderKind::Tmdb),
            "tvmaze" => Ok(ProviderKind::TvMaze),
            _ => Err(ProviderError::UnknownProvider(s.to_string())),
        }
    }
}

/// Settings for one provider, as read from the config file
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Trakt application client id
    #[serde(default)]
    pub client_id: Option<String>,

    /// TMDB API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override the API base URL
    #[serde(default)]
    pub url: Option<String>,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            api_key: None,
            url: None,
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// A non-empty value or a configuration error naming `key`
    pub(crate) fn require(
        provider: &'static str,
        value: &Option<String>,
        key: &str,
    ) -> Result<String, ProviderError> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Configuration {
                provider,
                message: format!("{key} is required"),
            })
    }
}

/// Shared collaborators handed to every provider
#[derive(Debug, Clone)]
pub struct Services {
    pub http: HttpClient,
    pub limiters: Arc<RateLimiterRegistry>,
}

impl Services {
    pub fn new(http: HttpClient, limiters: Arc<RateLimiterRegistry>) -> Self {
        Self { http, limiters }
    }
}

/// A catalog of titles
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Search types available for `media_type`; empty if unsupported
    fn search_types(&self, media_type: MediaType) -> &'static [SearchType];

    /// Whether results should be checked with an `IdValidator`
    fn validates_ids(&self) -> bool {
        false
    }

    /// One-time setup before the first search
    async fn init(&mut self, _cancel: &CancellationToken) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Run one search through the pagination loop
    async fn search(
        &self,
        media_type: MediaType,
        query: &SearchQuery,
        filter: &ItemFilter<'_>,
        cancel: &CancellationToken,
    ) -> Result<SearchResults, ProviderError>;

    /// Fail unless `search_type` is available for `media_type`
    fn ensure_supported(
        &self,
        media_type: MediaType,
        search_type: SearchType,
    ) -> Result<(), ProviderError> {
        let supported = self.search_types(media_type);
        if supported.is_empty() {
            return Err(ProviderError::UnsupportedMediaType {
                provider: self.name(),
                media_type,
            });
        }
        if !supported.contains(&search_type) {
            return Err(ProviderError::UnsupportedSearchType {
                provider: self.name(),
                media_type,
                search_type,
            });
        }
        Ok(())
    }
}

/// Build the provider named by `kind`
pub fn build(
    kind: ProviderKind,
    settings: &ProviderSettings,
    services: &Services,
) -> Result<Box<dyn Provider>, ProviderError> {
    let provider: Box<dyn Provider> = match kind {
        ProviderKind::Trakt => Box::new(Trakt::new(settings, services)?),
        ProviderKind::Tmdb => Box::new(Tmdb::new(settings, services)?),
        ProviderKind::TvMaze => Box::new(TvMaze::new(settings, services)),
    };
    Ok(provider)
}

/// Parse a `YYYY-MM-DD` date as midnight UTC
pub(crate) fn parse_day(value: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}
