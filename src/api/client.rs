//! HTTP page fetcher for the ARC grants endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use super::{GrantsPage, PageFetcher};
use crate::config::ApiConfig;
use crate::error::GrantsError;
use crate::models::{GrantRecord, SearchParams};
use crate::utils::HttpClient;

/// Public NCGP grants search endpoint
pub const ARC_GRANTS_API_URL: &str = "https://dataportal.arc.gov.au/NCGP/API/grants";

/// ARC grants search client
///
/// Uses the NCGP JSON:API style endpoint: `data`, `meta` and `links` at the top level.
#[derive(Debug, Clone)]
pub struct ArcGrantsClient {
    http: HttpClient,
    base_url: Url,
}

impl ArcGrantsClient {
    /// Create a client for the public endpoint with default HTTP settings
    pub fn new() -> Result<Self, GrantsError> {
        Self::with_base_url(ARC_GRANTS_API_URL, HttpClient::new()?)
    }

    /// Create a client for another endpoint (mirrors, test servers)
    pub fn with_base_url(base_url: &str, http: HttpClient) -> Result<Self, GrantsError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            GrantsError::InvalidArgument(format!("Invalid API URL '{}': {}", base_url, e))
        })?;

        Ok(Self { http, base_url })
    }

    /// Create a client from the `[api]` configuration section
    pub fn from_config(config: &ApiConfig) -> Result<Self, GrantsError> {
        let http = HttpClient::with_settings(&config.user_agent, config.timeout())?;
        Self::with_base_url(&config.base_url, http)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl PageFetcher for ArcGrantsClient {
    async fn fetch_page(
        &self,
        params: &SearchParams,
        page: u32,
    ) -> Result<GrantsPage, GrantsError> {
        let query = params.query_pairs(page);
        debug!(page, page_size = params.page_size(), "Requesting grants page");

        let response = self
            .http
            .client()
            .get(self.base_url.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| GrantsError::Network(format!("Failed to fetch page {}: {}", page, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GrantsError::Response(status_message(status, page)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GrantsError::Network(format!("Failed to read page {}: {}", page, e)))?;
        trace!(page, bytes = body.len(), "Received grants page");

        let envelope: GrantsEnvelope = serde_json::from_str(&body).map_err(|e| {
            GrantsError::Response(format!("Failed to parse page {}: {}", page, e))
        })?;

        Ok(envelope.into())
    }
}

fn status_message(status: StatusCode, page: u32) -> String {
    let hint = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            " (authentication error or API access denied)"
        }
        StatusCode::INTERNAL_SERVER_ERROR => " (server error, check the query parameters)",
        _ => "",
    };
    format!("ARC API returned status {} for page {}{}", status, page, hint)
}

// ===== ARC API Types =====

#[derive(Debug, Deserialize)]
struct GrantsEnvelope {
    data: Vec<GrantRecord>,
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(rename = "total-size")]
    total_size: Option<u64>,
    #[serde(rename = "total-pages")]
    total_pages: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Links {
    next: Option<String>,
}

impl From<GrantsEnvelope> for GrantsPage {
    fn from(envelope: GrantsEnvelope) -> Self {
        let (total_size, total_pages) = envelope
            .meta
            .map(|m| (m.total_size, m.total_pages))
            .unwrap_or((None, None));

        let has_next = envelope
            .links
            .and_then(|l| l.next)
            .is_some_and(|next| !next.is_empty());

        GrantsPage {
            records: envelope.data,
            total_size,
            total_pages,
            has_next,
        }
    }
}
