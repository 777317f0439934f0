//! Resolve a Trakt id from a TMDB or TVDB id.

use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::MediaType;
use crate::provider::trakt::{TRAKT_API_URL, TRAKT_RATE};
use crate::web::{join_url, HttpClient, RateLimiterRegistry, RequestOptions, RetryPolicy, WebError};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Which external id to search Trakt by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupId {
    Tmdb,
    Tvdb,
}

impl LookupId {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupId::Tmdb => "tmdb",
            LookupId::Tvdb => "tvdb",
        }
    }
}

impl std::str::FromStr for LookupId {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tmdb" => Ok(LookupId::Tmdb),
            "tvdb" => Ok(LookupId::Tvdb),
            _ => Err(LookupError::UnknownIdType(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Unknown id type: {0}")]
    UnknownIdType(String),

    #[error(transparent)]
    Web(#[from] WebError),

    #[error("Trakt search returned {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed decoding trakt search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No trakt {media_type} found with {id_type} id {id}")]
    NotFound {
        media_type: MediaType,
        id_type: &'static str,
        id: String,
    },
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    movie: Option<SearchEntry>,
    show: Option<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    ids: SearchIds,
}

#[derive(Debug, Deserialize)]
struct SearchIds {
    trakt: u64,
}

/// Trakt id lookups
#[derive(Debug, Clone)]
pub struct TraktLookup {
    http: HttpClient,
    client_id: String,
    api_url: String,
    retry: RetryPolicy,
}

impl TraktLookup {
    pub fn new(http: HttpClient, client_id: impl Into<String>) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            api_url: TRAKT_API_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Find the Trakt id of the first search hit for `id`
    pub async fn trakt_id(
        &self,
        registry: &RateLimiterRegistry,
        media_type: MediaType,
        id_type: LookupId,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, LookupError> {
        let limiter = registry.acquire("trakt", TRAKT_RATE);
        let url = join_url(&self.api_url, &format!("search/{}/{id}", id_type.as_str()));
        let options = RequestOptions::new()
            .timeout(LOOKUP_TIMEOUT)
            .query("type", media_type.to_string())
            .header("trakt-api-key", self.client_id.as_str())
            .header("trakt-api-version", "2")
            .retry(&self.retry)
            .limiter(&limiter)
            .cancel(cancel);

        let (head, body) = self.http.send_bytes(Method::GET, &url, &options).await?;
        if head.status != reqwest::StatusCode::OK {
            return Err(LookupError::Status(head.status));
        }

        let results: Vec<SearchResult> = serde_json::from_slice(&body)?;
        let entry = results.into_iter().next().and_then(|result| match media_type {
            MediaType::Movie => result.movie,
            MediaType::Show => result.show,
        });

        entry.map(|e| e.ids.trakt).ok_or_else(|| LookupError::NotFound {
            media_type,
            id_type: id_type.as_str(),
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_id_parse() {
        assert_eq!("TMDB".parse::<LookupId>().unwrap(), LookupId::Tmdb);
        assert_eq!("tvdb".parse::<LookupId>().unwrap(), LookupId::Tvdb);
        assert!("imdb".parse::<LookupId>().is_err());
    }

    #[test]
    fn test_decode_search_response() {
        let body = r#"[{"type":"show","score":1000,"show":{"title":"Dark","year":2017,"ids":{"trakt":118683,"slug":"dark","tvdb":334824}}}]"#;
        let results: Vec<SearchResult> = serde_json::from_str(body).unwrap();
        assert_eq!(results[0].show.as_ref().map(|s| s.ids.trakt), Some(118683));
        assert!(results[0].movie.is_none());
    }
}
