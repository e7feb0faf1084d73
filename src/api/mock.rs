//! Mock page fetcher for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{GrantsPage, PageFetcher};
use crate::error::GrantsError;
use crate::models::{GrantRecord, SearchParams};

#[derive(Debug)]
enum Script {
    /// Pages returned in order regardless of the requested page number
    Pages(VecDeque<Result<GrantsPage, GrantsError>>),
    /// An API holding `total` records, paged by the requested size
    Synthetic { total: u64 },
}

/// A fetcher that serves predefined pages and records every request.
#[derive(Debug)]
pub struct MockFetcher {
    script: Mutex<Script>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl MockFetcher {
    /// Serve these responses one per call; an exhausted script yields empty pages
    pub fn scripted(pages: Vec<Result<GrantsPage, GrantsError>>) -> Self {
        Self::with_script(Script::Pages(pages.into()))
    }

    /// Simulate an API holding `total` grants with ids `G1..=Gtotal`
    pub fn synthetic(total: u64) -> Self {
        Self::with_script(Script::Synthetic { total })
    }

    fn with_script(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of fetches made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Page numbers requested, in order
    pub fn requested_pages(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }

    /// Page sizes requested, in order
    pub fn requested_sizes(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_page(
        &self,
        params: &SearchParams,
        page: u32,
    ) -> Result<GrantsPage, GrantsError> {
        self.calls.lock().unwrap().push((page, params.page_size()));

        let mut script = self.script.lock().unwrap();
        match &mut *script {
            Script::Pages(pages) => pages.pop_front().unwrap_or_else(|| Ok(GrantsPage::default())),
            Script::Synthetic { total } => Ok(synthetic_page(*total, params.page_size(), page)),
        }
    }
}

fn synthetic_page(total: u64, page_size: u32, page: u32) -> GrantsPage {
    let size = u64::from(page_size);
    let start = u64::from(page.saturating_sub(1)) * size;
    let end = (start + size).min(total);
    let total_pages = total.div_ceil(size);

    GrantsPage {
        records: (start..end)
            .map(|i| {
                GrantRecord::new(format!("G{}", i + 1))
                    .field("scheme-name", "Discovery Projects")
                    .field("funding-commencement-year", 2020 + (i % 5) as i64)
            })
            .collect(),
        total_size: Some(total),
        total_pages: Some(total_pages),
        has_next: u64::from(page) < total_pages,
    }
}
