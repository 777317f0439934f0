//! TMDB: movies only, paged from the response body.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::client::{translate_params, ApiClient};
use super::fetch::{collect_pages, ItemFilter, Page, SearchResults};
use super::{parse_day, Provider, ProviderError, ProviderKind, ProviderSettings, Services};
use crate::domain::{MediaItem, MediaType, SearchQuery, SearchType};

pub const TMDB_API_URL: &str = "https://api.themoviedb.org/3";
pub const TMDB_RATE: u32 = 3;

const MOVIE_SEARCH_TYPES: &[SearchType] = &[SearchType::Now, SearchType::Upcoming, SearchType::Popular];

const PARAM_TRANSLATION: &[(&str, &str)] = &[("country", "region"), ("language", "language")];

#[derive(Debug, Deserialize)]
struct GenreList {
    #[serde(default)]
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MoviePage {
    #[serde(default)]
    results: Vec<TmdbMovie>,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    adult: bool,
    #[serde(default)]
    video: bool,
    original_language: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
    overview: Option<String>,
    release_date: Option<String>,
}

impl TmdbMovie {
    fn into_item(self, genres: &HashMap<u32, String>) -> Option<MediaItem> {
        if self.adult || self.video || self.id == 0 {
            return None;
        }
        let date = parse_day(self.release_date.as_deref()?)?;

        let mut item = MediaItem::new("tmdb", MediaType::Movie, self.title, date);
        item.tmdb_id = self.id.to_string();
        item.genres = self
            .genre_ids
            .iter()
            .filter_map(|id| genres.get(id).cloned())
            .collect();
        item.languages = self
            .original_language
            .filter(|l| !l.is_empty())
            .into_iter()
            .collect();
        item.summary = self.overview.unwrap_or_default();
        Some(item)
    }
}

/// TMDB catalog client
#[derive(Debug, Clone)]
pub struct Tmdb {
    api: ApiClient,
    api_key: String,
    genres: HashMap<u32, String>,
}

impl Tmdb {
    pub fn new(settings: &ProviderSettings, services: &Services) -> Result<Self, ProviderError> {
        let api_key = ProviderSettings::require("tmdb", &settings.api_key, "api_key")?;
        let api = ApiClient::new("tmdb", TMDB_RATE, TMDB_API_URL, settings, services);

        Ok(Self {
            api,
            api_key,
            genres: HashMap::new(),
        })
    }

    fn endpoint(search_type: SearchType) -> Option<&'static str> {
        match search_type {
            SearchType::Now => Some("/movie/now_playing"),
            SearchType::Upcoming => Some("/movie/upcoming"),
            SearchType::Popular => Some("/movie/popular"),
            _ => None,
        }
    }

    async fn fetch_page(
        &self,
        endpoint: &str,
        base_query: &[(String, String)],
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<Page, ProviderError> {
        let mut query = base_query.to_vec();
        query.push(("page".to_string(), page.to_string()));

        let (_, body): (_, MoviePage) = self.api.get_json(endpoint, query, cancel).await?;
        let items = body
            .results
            .into_iter()
            .filter_map(|movie| movie.into_item(&self.genres))
            .collect();

        Ok(Page::new(items, Some(body.total_pages)))
    }
}

#[async_trait]
impl Provider for Tmdb {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tmdb
    }

    fn search_types(&self, media_type: MediaType) -> &'static [SearchType] {
        match media_type {
            MediaType::Movie => MOVIE_SEARCH_TYPES,
            MediaType::Show => &[],
        }
    }

    /// Load the genre id to name table
    async fn init(&mut self, cancel: &CancellationToken) -> Result<(), ProviderError> {
        let query = vec![("api_key".to_string(), self.api_key.clone())];
        let (_, list): (_, GenreList) = self.api.get_json("/genre/movie/list", query, cancel).await?;

        self.genres = list.genres.into_iter().map(|g| (g.id, g.name)).collect();
        info!(genres = self.genres.len(), "Retrieved genres");
        Ok(())
    }

    async fn search(
        &self,
        media_type: MediaType,
        query: &SearchQuery,
        filter: &ItemFilter<'_>,
        cancel: &CancellationToken,
    ) -> Result<SearchResults, ProviderError> {
        self.ensure_supported(media_type, query.search_type)?;
        let endpoint = Self::endpoint(query.search_type).ok_or(ProviderError::UnsupportedSearchType {
            provider: "tmdb",
            media_type,
            search_type: query.search_type,
        })?;

        let mut base_query = vec![("api_key".to_string(), self.api_key.clone())];
        base_query.extend(translate_params(&query.params, PARAM_TRANSLATION));
        let base_query = base_query.as_slice();

        collect_pages("tmdb", query.limit, filter, cancel, move |page| {
            self.fetch_page(endpoint, base_query, page, cancel)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_page() {
        let body = r#"{"page":1,"total_pages":7,"results":[
            {"id":475557,"title":"Joker","adult":false,"video":false,"original_language":"en",
             "genre_ids":[80,18,99999],"overview":"...","release_date":"2019-10-02"},
            {"id":2,"title":"Adult","adult":true,"release_date":"2019-01-01"},
            {"id":3,"title":"Clip","video":true,"release_date":"2019-01-01"},
            {"id":4,"title":"Undated","release_date":""}
        ]}"#;
        let genres: HashMap<u32, String> = [(80, "Crime"), (18, "Drama")]
            .into_iter()
            .map(|(id, name)| (id, name.to_string()))
            .collect();

        let page: MoviePage = serde_json::from_str(body).unwrap();
        assert_eq!(page.total_pages, 7);

        let items: Vec<MediaItem> = page
            .results
            .into_iter()
            .filter_map(|m| m.into_item(&genres))
            .collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].tmdb_id, "475557");
        assert_eq!(items[0].genres, vec!["Crime", "Drama"]);
        assert_eq!(items[0].languages, vec!["en"]);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(Tmdb::endpoint(SearchType::Now), Some("/movie/now_playing"));
        assert_eq!(Tmdb::endpoint(SearchType::Trending), None);
    }
}
