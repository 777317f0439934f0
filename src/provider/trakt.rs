//! Trakt: movies and shows, paged with `X-Pagination-Page-Count`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::client::{translate_params, ApiClient};
use super::fetch::{collect_pages, ItemFilter, Page, SearchResults};
use super::{parse_day, Provider, ProviderError, ProviderKind, ProviderSettings, Services};
use crate::domain::{MediaItem, MediaType, SearchQuery, SearchType};

pub const TRAKT_API_URL: &str = "https://api.trakt.tv";
pub const TRAKT_RATE: u32 = 3;

const PAGE_COUNT_HEADER: &str = "x-pagination-page-count";

const SHOW_SEARCH_TYPES: &[SearchType] = &[
    SearchType::Popular,
    SearchType::Trending,
    SearchType::Upcoming,
    SearchType::Watched,
    SearchType::Person,
    SearchType::List,
];

const MOVIE_SEARCH_TYPES: &[SearchType] = &[
    SearchType::Popular,
    SearchType::Trending,
    SearchType::Upcoming,
    SearchType::Now,
    SearchType::Watched,
    SearchType::Person,
    SearchType::List,
];

const PARAM_TRANSLATION: &[(&str, &str)] = &[
    ("country", "countries"),
    ("language", "languages"),
    ("genre", "genres"),
    ("year", "years"),
    ("rating", "ratings"),
    ("network", "networks"),
    ("status", "status"),
];

const MOVIE_EXCLUDED_STATUSES: &[&str] = &["canceled", "rumored", "planned", "in production"];
const SHOW_EXCLUDED_STATUSES: &[&str] = &["canceled", "planned", "in production"];

#[derive(Debug, Default, Deserialize)]
struct Ids {
    slug: Option<String>,
    imdb: Option<String>,
    tmdb: Option<u64>,
    tvdb: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TraktMovie {
    title: Option<String>,
    #[serde(default)]
    ids: Ids,
    overview: Option<String>,
    released: Option<String>,
    runtime: Option<u32>,
    country: Option<String>,
    status: Option<String>,
    language: Option<String>,
    genres: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct TraktShow {
    title: Option<String>,
    #[serde(default)]
    ids: Ids,
    overview: Option<String>,
    first_aired: Option<String>,
    runtime: Option<u32>,
    network: Option<String>,
    country: Option<String>,
    status: Option<String>,
    language: Option<String>,
    genres: Option<Vec<String>>,
}

/// List endpoints return bare objects; trending, watched, lists and credits
/// wrap them under `movie`/`show` with extra fields alongside.
#[derive(Debug, Deserialize)]
struct MovieEntry {
    movie: Option<TraktMovie>,
    character: Option<String>,
    #[serde(flatten)]
    flat: TraktMovie,
}

#[derive(Debug, Deserialize)]
struct ShowEntry {
    show: Option<TraktShow>,
    character: Option<String>,
    #[serde(flatten)]
    flat: TraktShow,
}

#[derive(Debug, Deserialize)]
struct Credits<T> {
    #[serde(default = "Vec::new")]
    cast: Vec<T>,
}

fn non_empty(value: Option<String>) -> String {
    value.unwrap_or_default().trim().to_string()
}

fn as_list(value: Option<String>) -> Vec<String> {
    let value = non_empty(value);
    if value.is_empty() {
        Vec::new()
    } else {
        vec![value]
    }
}

fn excluded(status: &str, excluded: &[&str]) -> bool {
    excluded.iter().any(|s| s.eq_ignore_ascii_case(status))
}

impl MovieEntry {
    /// Translate into a record, or `None` if the entry is not usable
    fn into_item(self) -> Option<MediaItem> {
        let character = self.character;
        let movie = self.movie.unwrap_or(self.flat);

        let slug = non_empty(movie.ids.slug);
        let tmdb_id = movie.ids.tmdb.filter(|&id| id > 0)?;
        let runtime = movie.runtime.filter(|&r| r > 0)?;
        let status = non_empty(movie.status);
        if slug.is_empty() || excluded(&status, MOVIE_EXCLUDED_STATUSES) {
            return None;
        }
        let date = parse_day(movie.released.as_deref()?)?;

        let mut item = MediaItem::new("trakt", MediaType::Movie, non_empty(movie.title), date);
        item.tmdb_id = tmdb_id.to_string();
        item.imdb_id = non_empty(movie.ids.imdb);
        item.slug = slug;
        item.runtime = runtime;
        item.status = status;
        item.countries = as_list(movie.country);
        item.languages = as_list(movie.language);
        item.genres = movie.genres.unwrap_or_default();
        item.summary = non_empty(movie.overview);
        item.character = character.filter(|c| !c.is_empty());
        Some(item)
    }
}

impl ShowEntry {
    fn into_item(self) -> Option<MediaItem> {
        let character = self.character;
        let show = self.show.unwrap_or(self.flat);

        let slug = non_empty(show.ids.slug);
        let tvdb_id = show.ids.tvdb.filter(|&id| id > 0)?;
        let runtime = show.runtime.filter(|&r| r > 0)?;
        let status = non_empty(show.status);
        if slug.is_empty() || excluded(&status, SHOW_EXCLUDED_STATUSES) {
            return None;
        }
        let date = DateTime::parse_from_rfc3339(show.first_aired.as_deref()?.trim())
            .ok()?
            .with_timezone(&Utc);

        let mut item = MediaItem::new("trakt", MediaType::Show, non_empty(show.title), date);
        item.tvdb_id = tvdb_id.to_string();
        item.tmdb_id = show.ids.tmdb.filter(|&id| id > 0).map(|id| id.to_string()).unwrap_or_default();
        item.imdb_id = non_empty(show.ids.imdb);
        item.slug = slug;
        item.runtime = runtime;
        item.status = status;
        item.network = non_empty(show.network);
        item.countries = as_list(show.country);
        item.languages = as_list(show.language);
        item.genres = show.genres.unwrap_or_default();
        item.summary = non_empty(show.overview);
        item.character = character.filter(|c| !c.is_empty());
        Some(item)
    }
}

/// Trakt catalog client
#[derive(Debug, Clone)]
pub struct Trakt {
    api: ApiClient,
}

impl Trakt {
    pub fn new(settings: &ProviderSettings, services: &Services) -> Result<Self, ProviderError> {
        let client_id = ProviderSettings::require("trakt", &settings.client_id, "client_id")?;
        let api = ApiClient::new("trakt", TRAKT_RATE, TRAKT_API_URL, settings, services)
            .with_header("trakt-api-key", client_id)
            .with_header("trakt-api-version", "2");

        Ok(Self { api })
    }

    /// API path for a search
    fn endpoint(media_type: MediaType, query: &SearchQuery) -> Result<String, ProviderError> {
        let section = match media_type {
            MediaType::Movie => "movies",
            MediaType::Show => "shows",
        };
        let required = |param: &'static str| {
            query.param(param).ok_or(ProviderError::MissingParam {
                search_type: query.search_type,
                param,
            })
        };

        Ok(match query.search_type {
            SearchType::Popular => format!("/{section}/popular"),
            SearchType::Trending => format!("/{section}/trending"),
            SearchType::Upcoming => format!("/{section}/anticipated"),
            SearchType::Watched => format!("/{section}/watched"),
            SearchType::Now => format!("/{section}/boxoffice"),
            SearchType::Person => format!("/people/{}/{section}", required("person")?),
            SearchType::List => format!(
                "/users/{}/lists/{}/items/{section}",
                required("user")?,
                required("list")?
            ),
            SearchType::Schedule => {
                return Err(ProviderError::UnsupportedSearchType {
                    provider: "trakt",
                    media_type,
                    search_type: query.search_type,
                })
            }
        })
    }

    async fn fetch_page(
        &self,
        media_type: MediaType,
        endpoint: &str,
        search_type: SearchType,
        base_query: &[(String, String)],
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<Page, ProviderError> {
        let mut query = base_query.to_vec();
        query.push(("page".to_string(), page.to_string()));

        let (head, body) = self.api.get(endpoint, query, cancel).await?;
        let total_pages = head
            .header(PAGE_COUNT_HEADER)
            .and_then(|v| v.trim().parse::<u32>().ok());

        let items = decode_items(media_type, search_type, &body).map_err(|source| {
            ProviderError::Decode {
                url: crate::web::join_url(self.api.base_url(), endpoint),
                source,
            }
        })?;

        Ok(Page::new(items, total_pages))
    }
}

/// Decode a page body into usable records
fn decode_items(
    media_type: MediaType,
    search_type: SearchType,
    body: &[u8],
) -> Result<Vec<MediaItem>, serde_json::Error> {
    let items = match (media_type, search_type) {
        (MediaType::Movie, SearchType::Person) => serde_json::from_slice::<Credits<MovieEntry>>(body)?
            .cast
            .into_iter()
            .filter_map(MovieEntry::into_item)
            .collect(),
        (MediaType::Movie, _) => serde_json::from_slice::<Vec<MovieEntry>>(body)?
            .into_iter()
            .filter_map(MovieEntry::into_item)
            .collect(),
        (MediaType::Show, SearchType::Person) => serde_json::from_slice::<Credits<ShowEntry>>(body)?
            .cast
            .into_iter()
            .filter_map(ShowEntry::into_item)
            .collect(),
        (MediaType::Show, _) => serde_json::from_slice::<Vec<ShowEntry>>(body)?
            .into_iter()
            .filter_map(ShowEntry::into_item)
            .collect(),
    };
    Ok(items)
}

#[async_trait]
impl Provider for Trakt {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Trakt
    }

    fn search_types(&self, media_type: MediaType) -> &'static [SearchType] {
        match media_type {
            MediaType::Movie => MOVIE_SEARCH_TYPES,
            MediaType::Show => SHOW_SEARCH_TYPES,
        }
    }

    async fn search(
        &self,
        media_type: MediaType,
        query: &SearchQuery,
        filter: &ItemFilter<'_>,
        cancel: &CancellationToken,
    ) -> Result<SearchResults, ProviderError> {
        self.ensure_supported(media_type, query.search_type)?;
        let endpoint = Self::endpoint(media_type, query)?;

        let mut base_query = vec![
            ("extended".to_string(), "full".to_string()),
            ("limit".to_string(), "100".to_string()),
        ];
        base_query.extend(translate_params(&query.params, PARAM_TRANSLATION));

        let endpoint = endpoint.as_str();
        let base_query = base_query.as_slice();
        collect_pages("trakt", query.limit, filter, cancel, move |page| {
            self.fetch_page(media_type, endpoint, query.search_type, base_query, page, cancel)
        })
        .await
    }
}
