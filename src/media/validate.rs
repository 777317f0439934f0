//! Check that external identifiers point at real catalog entries.
//!
//! A positive answer is memoized in the validation cache; negative answers
//! are never cached, so a transient failure only costs a repeat request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::cache::{validated::DEFAULT_TTL, ValidationCache};
use crate::domain::{MediaItem, MediaType};
use crate::web::{join_url, HttpClient, RateLimiter, RateLimiterRegistry, RequestOptions, WebError};

pub const TVDB_SITE_URL: &str = "https://www.thetvdb.com";
pub const TMDB_SITE_URL: &str = "https://www.themoviedb.org";

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(30);
const VALIDATE_RATE: u32 = 3;

/// Validates TVDB and TMDB ids against their public sites
#[derive(Debug, Clone)]
pub struct IdValidator {
    http: HttpClient,
    cache: Option<ValidationCache>,
    ttl: Duration,
    tvdb_limiter: Arc<RateLimiter>,
    tmdb_limiter: Arc<RateLimiter>,
    tvdb_url: String,
    tmdb_url: String,
}

impl IdValidator {
    pub fn new(http: HttpClient, registry: &RateLimiterRegistry) -> Self {
        Self {
            http,
            cache: None,
            ttl: DEFAULT_TTL,
            tvdb_limiter: registry.acquire("tvdb", VALIDATE_RATE),
            tmdb_limiter: registry.acquire("tmdb", VALIDATE_RATE),
            tvdb_url: TVDB_SITE_URL.to_string(),
            tmdb_url: TMDB_SITE_URL.to_string(),
        }
    }

    /// Memoize successful validations in `cache` for `ttl`
    pub fn with_cache(mut self, cache: ValidationCache, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.ttl = ttl;
        self
    }

    /// Point at different sites (used by tests)
    pub fn with_base_urls(mut self, tvdb: impl Into<String>, tmdb: impl Into<String>) -> Self {
        self.tvdb_url = tvdb.into();
        self.tmdb_url = tmdb.into();
        self
    }

    /// Validate the canonical id of `item`.
    ///
    /// Only cancellation is reported as an error; every other failure means
    /// the id is not valid.
    pub async fn validate(
        &self,
        item: &MediaItem,
        cancel: &CancellationToken,
    ) -> Result<bool, WebError> {
        match item.media_type {
            MediaType::Show => self.validate_tvdb(&item.tvdb_id, cancel).await,
            MediaType::Movie => self.validate_tmdb(MediaType::Movie, &item.tmdb_id, cancel).await,
        }
    }

    pub async fn validate_tvdb(&self, id: &str, cancel: &CancellationToken) -> Result<bool, WebError> {
        let url = join_url(&self.tvdb_url, &format!("dereferrer/series/{id}"));
        self.check("tvdb", id, &url, &self.tvdb_limiter, cancel).await
    }

    /// `kind` selects the site section: movies or tv
    pub async fn validate_tmdb(
        &self,
        kind: MediaType,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, WebError> {
        let section = match kind {
            MediaType::Movie => "movie",
            MediaType::Show => "tv",
        };
        let url = join_url(&self.tmdb_url, &format!("{section}/{id}"));
        self.check("tmdb", id, &url, &self.tmdb_limiter, cancel).await
    }

    async fn check(
        &self,
        provider: &str,
        id: &str,
        url: &str,
        limiter: &RateLimiter,
        cancel: &CancellationToken,
    ) -> Result<bool, WebError> {
        if id.is_empty() {
            return Ok(false);
        }

        if let Some(cache) = &self.cache {
            match cache.exists(provider, id) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) => error!(provider, id, error = %err, "Failed checking validated item cache"),
            }
        }

        let options = RequestOptions::new()
            .timeout(VALIDATE_TIMEOUT)
            .limiter(limiter)
            .cancel(cancel);

        let response = match self.http.send(Method::GET, url, &options).await {
            Ok(response) => response,
            Err(WebError::Cancelled) => return Err(WebError::Cancelled),
            Err(err) => {
                trace!(provider, id, error = %err, "Failed retrieving details");
                return Ok(false);
            }
        };

        let status = response.status();
        drop(response);
        if status != reqwest::StatusCode::OK {
            trace!(provider, id, %status, "Failed retrieving valid details");
            return Ok(false);
        }

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.add(provider, id, self.ttl) {
                error!(provider, id, error = %err, "Failed storing validated item");
            }
        }

        Ok(true)
    }
}
