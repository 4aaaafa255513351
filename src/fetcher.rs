//! HTTP page fetching for extractors

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{Result, ScrapeError};

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "GarageHouseScraper/0.1 (+listing aggregation)";

/// Retrieves raw markup for a URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` with a plain GET, failing on any non-2xx status
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given user agent and per-request timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching page");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
