use anyhow::{anyhow, Result};

use crate::extract::Source;
use crate::models::{KANTO_PREFECTURES, OTHER_PREFECTURE};

/// Upper bound accepted for rent filters, in yen
pub const MAX_RENT_FILTER: i64 = 10_000_000;

/// Validation for configuration values and listing filters
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a source key against the supported sites
    pub fn validate_source_key(key: &str) -> Result<Source> {
        if key.trim().is_empty() {
            return Err(anyhow!("Source key cannot be empty"));
        }

        key.parse::<Source>().map_err(|_| {
            let known: Vec<_> = Source::ALL.iter().map(|s| s.key()).collect();
            anyhow!("Unknown source: {key}. Must be one of: {known:?}")
        })
    }

    /// Validate the enabled source list: non-empty, known keys, no repeats
    pub fn validate_enabled_sources(keys: &[String]) -> Result<Vec<Source>> {
        if keys.is_empty() {
            return Err(anyhow!("At least one source must be enabled"));
        }

        let mut sources = Vec::with_capacity(keys.len());
        for key in keys {
            let source = Self::validate_source_key(key)?;
            if sources.contains(&source) {
                return Err(anyhow!("Source listed twice: {key}"));
            }
            sources.push(source);
        }
        Ok(sources)
    }

    /// Validate an inclusive rent range
    pub fn validate_rent_range(min: Option<i64>, max: Option<i64>) -> Result<()> {
        for bound in [min, max].into_iter().flatten() {
            if bound < 0 {
                return Err(anyhow!("Rent bound cannot be negative: {bound}"));
            }
            if bound > MAX_RENT_FILTER {
                return Err(anyhow!("Rent bound too large (max {MAX_RENT_FILTER}): {bound}"));
            }
        }

        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(anyhow!("Minimum rent {min} exceeds maximum rent {max}"));
            }
        }

        Ok(())
    }

    /// Validate a prefecture filter
    pub fn validate_prefecture(prefecture: &str) -> Result<()> {
        if prefecture == OTHER_PREFECTURE || KANTO_PREFECTURES.contains(&prefecture) {
            Ok(())
        } else {
            Err(anyhow!(
                "Unknown prefecture: {prefecture}. Must be one of: {KANTO_PREFECTURES:?} or {OTHER_PREFECTURE}"
            ))
        }
    }

    /// Validate a 1-based page number
    pub fn validate_page(page: usize) -> Result<()> {
        if page == 0 {
            return Err(anyhow!("Page numbers start at 1"));
        }
        Ok(())
    }

    /// Validate listing page size
    pub fn validate_page_size(page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(anyhow!("Page size must be greater than 0"));
        }

        if page_size > 1000 {
            return Err(anyhow!("Page size too large (max 1000)"));
        }

        Ok(())
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(anyhow!("Database URL cannot be empty"));
        }

        if !url.starts_with("sqlite:") {
            return Err(anyhow!("Only SQLite databases are supported"));
        }

        if url.len() > 1000 {
            return Err(anyhow!("Database URL too long"));
        }

        Ok(())
    }

    /// Validate an HTTP user agent
    pub fn validate_user_agent(user_agent: &str) -> Result<()> {
        if user_agent.trim().is_empty() {
            return Err(anyhow!("User agent cannot be empty"));
        }

        if user_agent.chars().any(char::is_control) {
            return Err(anyhow!("User agent contains invalid characters"));
        }

        Ok(())
    }
}
