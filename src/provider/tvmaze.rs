//! TVMaze: the full airing schedule, as a single page of shows.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::client::ApiClient;
use super::fetch::{collect_pages, ItemFilter, Page, SearchResults};
use super::{parse_day, Provider, ProviderError, ProviderKind, ProviderSettings, Services};
use crate::domain::{MediaItem, MediaType, SearchQuery, SearchType};

pub const TVMAZE_API_URL: &str = "https://api.tvmaze.com";
pub const TVMAZE_RATE: u32 = 2;

const SHOW_SEARCH_TYPES: &[SearchType] = &[SearchType::Schedule];

#[derive(Debug, Deserialize)]
struct ScheduleEntry {
    runtime: Option<u32>,
    #[serde(rename = "_embedded")]
    embedded: Embedded,
}

#[derive(Debug, Deserialize)]
struct Embedded {
    show: Show,
}

#[derive(Debug, Deserialize)]
struct Show {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    language: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    status: Option<String>,
    premiered: Option<String>,
    network: Option<Channel>,
    #[serde(rename = "webChannel")]
    web_channel: Option<Channel>,
    #[serde(default)]
    externals: Externals,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    name: String,
    country: Option<Country>,
}

#[derive(Debug, Deserialize)]
struct Country {
    code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Externals {
    thetvdb: Option<u64>,
    imdb: Option<String>,
}

impl ScheduleEntry {
    fn into_item(self) -> Option<MediaItem> {
        let show = self.embedded.show;

        let tvdb_id = show.externals.thetvdb.filter(|&id| id > 0)?;
        let language = show.language.unwrap_or_default();
        if language != "English" {
            return None;
        }
        let date = parse_day(show.premiered.as_deref()?)?;

        let channel = show.network.or(show.web_channel);
        let country = channel
            .as_ref()
            .and_then(|c| c.country.as_ref())
            .and_then(|c| c.code.clone())
            .filter(|c| !c.is_empty());

        let mut item = MediaItem::new("tvmaze", MediaType::Show, show.name, date);
        item.tvdb_id = tvdb_id.to_string();
        item.imdb_id = show.externals.imdb.unwrap_or_default();
        item.network = channel.map(|c| c.name).unwrap_or_default();
        item.countries = country.into_iter().collect();
        item.runtime = self.runtime.unwrap_or_default();
        item.status = show.status.unwrap_or_default();
        item.languages = vec![language];
        // Show type (Scripted, Reality, ...) first, then the listed genres
        item.genres = show
            .kind
            .filter(|k| !k.is_empty())
            .into_iter()
            .chain(show.genres)
            .collect();
        item.summary = show.summary.unwrap_or_default();
        Some(item)
    }
}

/// TVMaze schedule client
#[derive(Debug, Clone)]
pub struct TvMaze {
    api: ApiClient,
}

impl TvMaze {
    pub fn new(settings: &ProviderSettings, services: &Services) -> Self {
        Self {
            api: ApiClient::new("tvmaze", TVMAZE_RATE, TVMAZE_API_URL, settings, services),
        }
    }

    async fn fetch_schedule(&self, cancel: &CancellationToken) -> Result<Page, ProviderError> {
        let (_, entries): (_, Vec<ScheduleEntry>) =
            self.api.get_json("/schedule/full", Vec::new(), cancel).await?;

        Ok(Page::last(
            entries.into_iter().filter_map(ScheduleEntry::into_item).collect(),
        ))
    }
}

#[async_trait]
impl Provider for TvMaze {
    fn kind(&self) -> ProviderKind {
        ProviderKind::TvMaze
    }

    fn search_types(&self, media_type: MediaType) -> &'static [SearchType] {
        match media_type {
            MediaType::Movie => &[],
            MediaType::Show => SHOW_SEARCH_TYPES,
        }
    }

    fn validates_ids(&self) -> bool {
        true
    }

    async fn search(
        &self,
        media_type: MediaType,
        query: &SearchQuery,
        filter: &ItemFilter<'_>,
        cancel: &CancellationToken,
    ) -> Result<SearchResults, ProviderError> {
        self.ensure_supported(media_type, query.search_type)?;

        collect_pages("tvmaze", query.limit, filter, cancel, move |_page| {
            self.fetch_schedule(cancel)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULE: &str = r#"[
        {"id":1,"runtime":60,"_embedded":{"show":{"name":"Dark","type":"Scripted","language":"English",
            "genres":["Drama"],"status":"Running","premiered":"2017-12-01",
            "network":null,"webChannel":{"name":"Netflix","country":null},
            "externals":{"thetvdb":334824,"imdb":"tt5753856"}}}},
        {"id":2,"runtime":30,"_embedded":{"show":{"name":"Foreign","language":"German","premiered":"2020-01-01",
            "externals":{"thetvdb":5}}}},
        {"id":3,"runtime":30,"_embedded":{"show":{"name":"No Tvdb","language":"English","premiered":"2020-01-01",
            "externals":{"thetvdb":null}}}},
        {"id":4,"runtime":30,"_embedded":{"show":{"name":"Unpremiered","language":"English","premiered":null,
            "externals":{"thetvdb":7}}}}
    ]"#;

    #[test]
    fn test_decode_schedule() {
        let entries: Vec<ScheduleEntry> = serde_json::from_str(SCHEDULE).unwrap();
        let items: Vec<MediaItem> = entries.into_iter().filter_map(ScheduleEntry::into_item).collect();

        assert_eq!(items.len(), 1);
        let dark = &items[0];
        assert_eq!(dark.tvdb_id, "334824");
        assert_eq!(dark.network, "Netflix");
        assert_eq!(dark.genres, vec!["Scripted", "Drama"]);
        assert_eq!(dark.runtime, 60);
        assert!(dark.countries.is_empty());
    }
}
