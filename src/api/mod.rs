//! Access to the ARC grants search API.
//!
//! [`PageFetcher`] is the seam between the pagination loop and the network:
//! [`ArcGrantsClient`] implements it over HTTP, [`MockFetcher`] serves
//! scripted or synthetic pages for tests. [`Paginator`] drives any fetcher
//! until the results are exhausted or a page ceiling is hit.
//!
//! ```rust,no_run
//! use arc_grants::api::{ArcGrantsClient, Paginator};
//! use arc_grants::models::SearchFilters;
//!
//! # async fn example() -> Result<(), arc_grants::GrantsError> {
//! let client = ArcGrantsClient::new()?;
//! let params = SearchFilters::new("climate change").build(100)?;
//!
//! let mut paginator = Paginator::new(&client, &params).max_pages(Some(10));
//! paginator.run().await?;
//! let results = paginator.into_result_set();
//! # let _ = results;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod mock;
mod paginate;

pub use client::{ArcGrantsClient, ARC_GRANTS_API_URL};
pub use mock::MockFetcher;
pub use paginate::{PageProgress, Paginator, StopReason, FIRST_PAGE};

use async_trait::async_trait;

use crate::error::GrantsError;
use crate::models::{GrantRecord, SearchParams};

/// One decoded page of search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrantsPage {
    /// Records on this page, in API order
    pub records: Vec<GrantRecord>,

    /// Total matching records reported by the API
    pub total_size: Option<u64>,

    /// Total pages reported by the API for the requested page size
    pub total_pages: Option<u64>,

    /// Whether the API advertised a next page
    pub has_next: bool,
}

/// Fetches a single page of grants.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait PageFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch page `page` (1-based) using the shared search parameters
    async fn fetch_page(&self, params: &SearchParams, page: u32)
        -> Result<GrantsPage, GrantsError>;
}
