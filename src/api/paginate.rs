//! Pagination driver.

use tracing::{debug, info};

use super::PageFetcher;
use crate::error::GrantsError;
use crate::models::{ResultSet, SearchParams};

/// The API numbers pages from 1
pub const FIRST_PAGE: u32 = 1;

/// Why the pagination loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back with no records
    EmptyPage,
    /// The accumulated count reached the API-reported total
    TotalReached,
    /// The API reported no further pages
    LastPage,
    /// The configured page ceiling was reached
    MaxPages,
}

/// Snapshot handed to the progress callback after each page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page: u32,
    pub pages_fetched: u32,
    pub records: usize,
    pub total_size: Option<u64>,
    pub total_pages: Option<u64>,
}

type ProgressFn<'a> = Box<dyn FnMut(&PageProgress) + Send + 'a>;

/// Drives a [`PageFetcher`] one page at a time and accumulates the results.
///
/// The result set stays with the paginator until [`Paginator::into_result_set`],
/// so records fetched before a failure are still reachable.
pub struct Paginator<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    params: &'a SearchParams,
    max_pages: Option<u32>,
    on_page: Option<ProgressFn<'a>>,
    results: ResultSet,
    pages_fetched: u32,
    total_size: Option<u64>,
}

impl<'a, F: PageFetcher + ?Sized> Paginator<'a, F> {
    pub fn new(fetcher: &'a F, params: &'a SearchParams) -> Self {
        Self {
            fetcher,
            params,
            max_pages: None,
            on_page: None,
            results: ResultSet::new(),
            pages_fetched: 0,
            total_size: None,
        }
    }

    /// Stop after this many pages; `None` fetches until exhaustion
    pub fn max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Called after every successfully fetched page
    pub fn on_page(mut self, callback: impl FnMut(&PageProgress) + Send + 'a) -> Self {
        self.on_page = Some(Box::new(callback));
        self
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Total reported by the first page that carried one
    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn into_result_set(self) -> ResultSet {
        self.results
    }

    /// Fetch pages until a stop condition holds.
    ///
    /// The first error aborts the loop and is returned as is.
    pub async fn run(&mut self) -> Result<StopReason, GrantsError> {
        let mut page = FIRST_PAGE + self.pages_fetched;

        loop {
            if self.ceiling_reached() {
                info!(max_pages = ?self.max_pages, "Reached maximum requested pages");
                return Ok(StopReason::MaxPages);
            }

            let fetched = self.fetcher.fetch_page(self.params, page).await?;
            self.pages_fetched += 1;

            if self.total_size.is_none() {
                if let Some(total) = fetched.total_size {
                    info!(
                        total,
                        total_pages = ?fetched.total_pages,
                        "Found matching grants"
                    );
                    self.total_size = Some(total);
                }
            }

            let count = fetched.records.len();
            self.results.extend(fetched.records);
            debug!(page, count, accumulated = self.results.len(), "Fetched page");

            if let Some(callback) = self.on_page.as_mut() {
                callback(&PageProgress {
                    page,
                    pages_fetched: self.pages_fetched,
                    records: self.results.len(),
                    total_size: self.total_size,
                    total_pages: fetched.total_pages,
                });
            }

            if count == 0 {
                info!(page, "Reached end of results (empty page)");
                return Ok(StopReason::EmptyPage);
            }

            if let Some(total) = self.total_size {
                if self.results.len() as u64 >= total {
                    info!(page, "Reached end of results");
                    return Ok(StopReason::TotalReached);
                }
            }

            let past_last_page = fetched
                .total_pages
                .is_some_and(|pages| u64::from(page) >= pages);
            if !fetched.has_next || past_last_page {
                info!(page, "Reached end of results (last page)");
                return Ok(StopReason::LastPage);
            }

            page += 1;
        }
    }

    fn ceiling_reached(&self) -> bool {
        self.max_pages
            .is_some_and(|max| self.pages_fetched >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GrantsPage, MockFetcher};
    use crate::models::GrantRecord;

    fn page(ids: &[&str], total: u64, has_next: bool) -> GrantsPage {
        GrantsPage {
            records: ids.iter().map(|id| GrantRecord::new(*id)).collect(),
            total_size: Some(total),
            total_pages: None,
            has_next,
        }
    }

    #[tokio::test]
    async fn test_fetches_until_exhaustion() {
        let fetcher = MockFetcher::synthetic(250);
        let params = SearchParams::new(None, 100);

        let mut paginator = Paginator::new(&fetcher, &params);
        let reason = paginator.run().await.unwrap();

        assert_eq!(reason, StopReason::TotalReached);
        assert_eq!(paginator.pages_fetched(), 3);
        assert_eq!(paginator.total_size(), Some(250));
        assert_eq!(paginator.results().len(), 250);
        assert_eq!(fetcher.requested_pages(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_respects_max_pages() {
        let fetcher = MockFetcher::synthetic(5000);
        let params = SearchParams::new(None, 100);

        let mut paginator = Paginator::new(&fetcher, &params).max_pages(Some(10));
        let reason = paginator.run().await.unwrap();

        assert_eq!(reason, StopReason::MaxPages);
        assert_eq!(fetcher.call_count(), 10);
        assert_eq!(paginator.results().len(), 1000);
    }

    #[tokio::test]
    async fn test_zero_max_pages_fetches_nothing() {
        let fetcher = MockFetcher::synthetic(10);
        let params = SearchParams::default();

        let mut paginator = Paginator::new(&fetcher, &params).max_pages(Some(0));
        assert_eq!(paginator.run().await.unwrap(), StopReason::MaxPages);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stops_on_empty_page() {
        let fetcher = MockFetcher::scripted(vec![
            Ok(page(&["a", "b"], 10, true)),
            Ok(page(&[], 10, true)),
            Ok(page(&["never"], 10, true)),
        ]);
        let params = SearchParams::new(None, 2);

        let mut paginator = Paginator::new(&fetcher, &params);
        assert_eq!(paginator.run().await.unwrap(), StopReason::EmptyPage);
        assert_eq!(fetcher.call_count(), 2);
        assert_eq!(paginator.results().len(), 2);
    }

    #[tokio::test]
    async fn test_stops_without_next_link() {
        let fetcher = MockFetcher::scripted(vec![
            Ok(page(&["a"], 100, true)),
            Ok(page(&["b"], 100, false)),
        ]);
        let params = SearchParams::new(None, 1);

        let mut paginator = Paginator::new(&fetcher, &params);
        assert_eq!(paginator.run().await.unwrap(), StopReason::LastPage);

        let ids: Vec<_> = paginator
            .into_result_set()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_error_keeps_partial_results() {
        let fetcher = MockFetcher::scripted(vec![
            Ok(page(&["a", "b"], 6, true)),
            Err(GrantsError::Network("connection reset".to_string())),
        ]);
        let params = SearchParams::new(None, 2);

        let mut paginator = Paginator::new(&fetcher, &params);
        let err = paginator.run().await.unwrap_err();

        assert!(matches!(err, GrantsError::Network(_)));
        assert_eq!(paginator.pages_fetched(), 1);
        assert_eq!(paginator.results().len(), 2);
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_page() {
        let fetcher = MockFetcher::synthetic(5);
        let params = SearchParams::new(None, 2);
        let mut seen = Vec::new();

        let mut paginator =
            Paginator::new(&fetcher, &params).on_page(|p: &PageProgress| seen.push(p.records));
        paginator.run().await.unwrap();
        drop(paginator);

        assert_eq!(seen, vec![2, 4, 5]);
    }
}
