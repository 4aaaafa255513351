//! Site extractors
//!
//! Each supported site is a data-only [`SourceProfile`] executed by the
//! shared [`SiteExtractor`]. Fetch failures are contained per target URL and
//! reported through [`Extraction`], so the session runner can tell a partial
//! result from a source that could not be reached at all.

pub mod profile;
pub mod site;
pub mod text;

use std::sync::Arc;

use async_trait::async_trait;

pub use profile::{Source, SourceProfile};
pub use site::SiteExtractor;

use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::models::ScrapedProperty;

/// A target URL that could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub url: String,
    pub reason: String,
}

impl TargetFailure {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Output of one extractor invocation
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Source key
    pub source: &'static str,
    /// Records, unique by `source_id`
    pub records: Vec<ScrapedProperty>,
    /// Number of target URLs tried
    pub targets_attempted: usize,
    /// Targets that failed to fetch
    pub failed_targets: Vec<TargetFailure>,
}

impl Extraction {
    #[must_use]
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            records: Vec::new(),
            targets_attempted: 0,
            failed_targets: Vec::new(),
        }
    }

    /// True when targets were tried and none of them could be fetched
    #[must_use]
    pub fn all_targets_failed(&self) -> bool {
        self.targets_attempted > 0 && self.failed_targets.len() >= self.targets_attempted
    }
}

/// One source's fetch-and-parse capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Stable source key
    fn source(&self) -> &'static str;

    /// Fetch and parse every target of this source
    async fn scrape(&self) -> Result<Extraction>;
}

/// Build extractors for `sources`, in the given order, sharing one fetcher
pub fn build_extractors(sources: &[Source], fetcher: Arc<dyn PageFetcher>) -> Result<Vec<Box<dyn Extractor>>> {
    sources
        .iter()
        .map(|source| {
            SiteExtractor::new(source.profile(), Arc::clone(&fetcher))
                .map(|extractor| Box::new(extractor) as Box<dyn Extractor>)
        })
        .collect()
}
