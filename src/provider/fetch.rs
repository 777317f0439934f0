//! The pagination loop shared by every provider.
//!
//! Pages are fetched and processed strictly one at a time. Each translated
//! item goes through, in order: same-run de-duplication on its canonical id,
//! the "already owned" check, the library manager's veto (its ignore rules),
//! and finally id validation.
//! Reaching the limit stops paging immediately. Any page error aborts the
//! whole search and discards what was collected so far.

use std::collections::HashMap;
use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::ProviderError;
use crate::domain::MediaItem;
use crate::library::{ExistingMedia, LibraryManager};
use crate::media::IdValidator;
use crate::web::WebError;

/// One decoded page of results
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Structurally valid items, in provider order
    pub items: Vec<MediaItem>,

    /// Total number of pages, if the provider reports it; none means this is the last
    pub total_pages: Option<u32>,
}

impl Page {
    pub fn new(items: Vec<MediaItem>, total_pages: Option<u32>) -> Self {
        Self { items, total_pages }
    }

    /// A page with nothing after it
    pub fn last(items: Vec<MediaItem>) -> Self {
        Self::new(items, None)
    }
}

/// Optional checks applied to every candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemFilter<'a> {
    pub existing: Option<&'a ExistingMedia>,
    pub library: Option<&'a dyn LibraryManager>,
    pub validator: Option<&'a IdValidator>,
}

impl<'a> ItemFilter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn existing(mut self, existing: &'a ExistingMedia) -> Self {
        self.existing = Some(existing);
        self
    }

    /// Ask `library` to veto each candidate it does not already own
    pub fn library(mut self, library: &'a dyn LibraryManager) -> Self {
        self.library = Some(library);
        self
    }

    pub fn validator(mut self, validator: &'a IdValidator) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// Counters for one search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Pages requested
    pub pages: u32,
    pub accepted: usize,
    /// Skipped because the library already owns them
    pub existing: usize,
    /// Rejected by ignore rules or id validation
    pub ignored: usize,
    /// Skipped because an earlier page already produced the same id
    pub duplicates: usize,
}

/// Accepted items keyed by canonical id, plus counters
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub items: HashMap<String, MediaItem>,
    pub stats: FetchStats,
}

impl SearchResults {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> HashMap<String, MediaItem> {
        self.items
    }
}

/// Drive `fetch_page` from page 1 until pages run out or `limit` items are accepted.
///
/// A limit of zero means no limit.
pub async fn collect_pages<F, Fut>(
    provider: &str,
    limit: Option<usize>,
    filter: &ItemFilter<'_>,
    cancel: &CancellationToken,
    mut fetch_page: F,
) -> Result<SearchResults, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page, ProviderError>>,
{
    let limit = limit.filter(|&limit| limit > 0);
    let mut results = SearchResults::default();
    let mut page: u32 = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let Page { items, total_pages } = fetch_page(page).await?;
        results.stats.pages += 1;

        let mut limit_reached = false;
        for item in items {
            match check(provider, &item, &results, filter, cancel).await? {
                Verdict::Accept => {}
                Verdict::Invalid => continue,
                Verdict::Duplicate => {
                    results.stats.duplicates += 1;
                    continue;
                }
                Verdict::Existing => {
                    results.stats.existing += 1;
                    continue;
                }
                Verdict::Ignored => {
                    results.stats.ignored += 1;
                    continue;
                }
            }

            debug!(provider, item = %item, "Accepted");
            results.items.insert(item.canonical_id().to_string(), item);
            results.stats.accepted += 1;

            if limit.is_some_and(|limit| results.stats.accepted >= limit) {
                limit_reached = true;
                break;
            }
        }

        info!(
            provider,
            page,
            pages = total_pages.unwrap_or(page),
            accepted = results.stats.accepted,
            ignored = results.stats.ignored,
            existing = results.stats.existing,
            "Retrieved"
        );

        if limit_reached {
            break;
        }

        match total_pages {
            Some(total) if page < total => page += 1,
            _ => break,
        }
    }

    info!(provider, accepted_items = results.stats.accepted, "Retrieved media items");
    Ok(results)
}

enum Verdict {
    Accept,
    /// No canonical id
    Invalid,
    Duplicate,
    Existing,
    Ignored,
}

async fn check(
    provider: &str,
    item: &MediaItem,
    results: &SearchResults,
    filter: &ItemFilter<'_>,
    cancel: &CancellationToken,
) -> Result<Verdict, ProviderError> {
    let id = item.canonical_id();
    if id.is_empty() {
        return Ok(Verdict::Invalid);
    }
    if results.items.contains_key(id) {
        return Ok(Verdict::Duplicate);
    }

    if filter.existing.is_some_and(|existing| existing.contains(item)) {
        trace!(provider, item = %item, "Ignoring existing");
        return Ok(Verdict::Existing);
    }

    if let Some(library) = filter.library {
        match library.should_ignore(item).await {
            Ok(false) => {}
            Ok(true) => {
                debug!(provider, library = library.name(), item = %item, "Ignoring");
                return Ok(Verdict::Ignored);
            }
            Err(err) => {
                warn!(provider, library = library.name(), item = %item, error = %err, "Failed checking ignore rules, ignoring");
                return Ok(Verdict::Ignored);
            }
        }
    }

    if let Some(validator) = filter.validator {
        match validator.validate(item, cancel).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(provider, item = %item, "Ignoring, failed id validation");
                return Ok(Verdict::Ignored);
            }
            Err(WebError::Cancelled) => return Err(ProviderError::Cancelled),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(Verdict::Accept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaType;
    use crate::library::{LibraryFilters, MemoryLibrary};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ignoring(rules: &[&str]) -> MemoryLibrary {
        MemoryLibrary::new(LibraryFilters::new(rules, &[] as &[&str]).unwrap())
    }

    fn movie(id: u32) -> MediaItem {
        let date = Utc.with_ymd_and_hms(2000 + (id % 20) as i32, 1, 1, 0, 0, 0).unwrap();
        let mut item = MediaItem::new("test", MediaType::Movie, format!("Movie {id}"), date);
        item.tmdb_id = id.to_string();
        item
    }

    fn pages(count: u32, per_page: u32) -> impl FnMut(u32) -> std::future::Ready<Result<Page, ProviderError>> {
        move |page| {
            let start = (page - 1) * per_page;
            let items = (start..start + per_page).map(movie).collect();
            std::future::ready(Ok(Page::new(items, Some(count))))
        }
    }

    #[tokio::test]
    async fn test_limit_stops_paging() {
        let fetched = AtomicU32::new(0);
        let mut source = pages(5, 20);
        let results = collect_pages(
            "test",
            Some(25),
            &ItemFilter::new(),
            &CancellationToken::new(),
            |page| {
                fetched.fetch_add(1, Ordering::SeqCst);
                source(page)
            },
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 25);
        assert_eq!(fetched.load(Ordering::SeqCst), 2);
        assert_eq!(results.stats.pages, 2);
    }

    #[tokio::test]
    async fn test_all_pages_without_limit() {
        let results = collect_pages("test", None, &ItemFilter::new(), &CancellationToken::new(), pages(3, 10))
            .await
            .unwrap();

        assert_eq!(results.len(), 30);
        assert_eq!(results.stats.pages, 3);

        // Zero is no limit
        let results = collect_pages("test", Some(0), &ItemFilter::new(), &CancellationToken::new(), pages(2, 10))
            .await
            .unwrap();
        assert_eq!(results.len(), 20);
    }

    #[tokio::test]
    async fn test_duplicates_across_pages() {
        let results = collect_pages(
            "test",
            None,
            &ItemFilter::new(),
            &CancellationToken::new(),
            |_page| std::future::ready(Ok(Page::new(vec![movie(1), movie(2)], Some(2)))),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results.stats.duplicates, 2);
    }

    #[tokio::test]
    async fn test_existing_and_ignored_are_counted_separately() {
        let existing: ExistingMedia = [movie(1)].into_iter().collect();
        let library = ignoring(&["TmdbId == \"2\""]);
        let filter = ItemFilter::new().existing(&existing).library(&library);

        let results = collect_pages("test", None, &filter, &CancellationToken::new(), |_page| {
            std::future::ready(Ok(Page::last(vec![movie(1), movie(2), movie(3)])))
        })
        .await
        .unwrap();

        assert_eq!(results.items.keys().collect::<Vec<_>>(), vec!["3"]);
        assert_eq!(results.stats.existing, 1);
        assert_eq!(results.stats.ignored, 1);
    }

    #[tokio::test]
    async fn test_rule_evaluation_failure_excludes() {
        let library = ignoring(&["Runtime / Runtime == 1"]);
        let filter = ItemFilter::new().library(&library);

        // Runtime is zero, so the rule fails to evaluate
        let results = collect_pages("test", None, &filter, &CancellationToken::new(), |_page| {
            std::future::ready(Ok(Page::last(vec![movie(1)])))
        })
        .await
        .unwrap();

        assert!(results.is_empty());
        assert_eq!(results.stats.ignored, 1);
    }

    #[tokio::test]
    async fn test_page_error_discards_everything() {
        let result = collect_pages("test", None, &ItemFilter::new(), &CancellationToken::new(), |page| {
            std::future::ready(if page == 1 {
                Ok(Page::new(vec![movie(1)], Some(3)))
            } else {
                Err(ProviderError::HttpStatus {
                    url: "http://test/page/2".to_string(),
                    status: 500,
                })
            })
        })
        .await;

        assert!(matches!(result, Err(ProviderError::HttpStatus { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_page() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = collect_pages("test", None, &ItemFilter::new(), &cancel, pages(2, 10)).await;
        assert!(matches!(result, Err(ProviderError::Cancelled)));
    }

    #[tokio::test]
    async fn test_items_without_canonical_id_are_skipped() {
        let mut bare = movie(1);
        bare.tmdb_id.clear();

        let results = collect_pages("test", None, &ItemFilter::new(), &CancellationToken::new(), |_page| {
            std::future::ready(Ok(Page::last(vec![bare.clone(), movie(2)])))
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 1);
    }
}
