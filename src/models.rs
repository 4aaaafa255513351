//! Data models for scraped and persisted properties
//!
//! This module contains the common record every extractor produces, the
//! persisted row shapes, and the listing query types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catch-all prefecture label for addresses outside the known set
pub const OTHER_PREFECTURE: &str = "その他";

/// Kanto prefectures recognised when classifying an address, in match priority order
pub const KANTO_PREFECTURES: [&str; 7] = [
    "東京都",
    "神奈川県",
    "千葉県",
    "埼玉県",
    "茨城県",
    "栃木県",
    "群馬県",
];

/// How long a property counts as newly listed after it was first seen
pub const NEW_LISTING_WINDOW_DAYS: i64 = 3;

/// Error returned when a stored enumeration value is not recognised
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Availability of a listing as inferred from its text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    /// Accepting tenants
    Available,
    /// Full, under offer, or closed
    Occupied,
    /// Neither signal was present
    Unknown,
}

impl PropertyStatus {
    /// Stored representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PropertyStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "occupied" => Ok(Self::Occupied),
            "unknown" => Ok(Self::Unknown),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Property type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// Residence with an attached vehicle garage
    #[default]
    GarageHouse,
}

impl PropertyType {
    /// Stored representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GarageHouse => "garage_house",
        }
    }
}

impl FromStr for PropertyType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "garage_house" => Ok(Self::GarageHouse),
            other => Err(ParseEnumError {
                kind: "property type",
                value: other.to_string(),
            }),
        }
    }
}

/// A listing as produced by one extractor invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedProperty {
    /// Site-local identifier, unique within `source`
    pub source_id: String,
    /// Key of the originating site
    pub source: String,
    /// Listing title, never empty
    pub name: String,
    /// Free-text address, possibly empty
    pub address: String,
    /// One of [`KANTO_PREFECTURES`] or [`OTHER_PREFECTURE`]
    pub prefecture: String,
    /// Monthly rent in whole yen; `None` when unpublished
    pub rent: Option<i64>,
    /// Inferred availability
    pub status: PropertyStatus,
    /// Always [`PropertyType::GarageHouse`] for now
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Best-effort thumbnail URL
    pub image_url: Option<String>,
    /// Absolute URL of the detail page
    pub detail_url: String,
    /// Short tags in append order
    pub features: Vec<String>,
}

/// A property row as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedProperty {
    /// System-assigned identifier
    pub id: String,
    /// Site-local identifier
    pub source_id: String,
    /// Key of the originating site
    pub source: String,
    /// Latest observed title
    pub name: String,
    /// Address from the first observation
    pub address: String,
    /// Prefecture from the first observation
    pub prefecture: String,
    /// Latest observed rent
    pub rent: Option<i64>,
    /// Latest observed status
    pub status: PropertyStatus,
    /// Property type discriminator
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Latest observed thumbnail
    pub image_url: Option<String>,
    /// Detail page from the first observation
    pub detail_url: String,
    /// Tags from the first observation
    pub features: Vec<String>,
    /// When the property was first inserted
    pub first_seen_at: DateTime<Utc>,
    /// When the property was last re-observed
    pub last_seen_at: DateTime<Utc>,
}

impl PersistedProperty {
    /// True if the property was first seen within [`NEW_LISTING_WINDOW_DAYS`] of `now`
    #[must_use]
    pub fn is_new(&self, now: DateTime<Utc>) -> bool {
        now - self.first_seen_at < Duration::days(NEW_LISTING_WINDOW_DAYS)
    }
}

/// Result of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed for (source, source_id)
    Inserted,
    /// An existing row was refreshed
    Updated,
}

/// Totals for one batch upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Rows created
    pub inserted: usize,
    /// Rows refreshed
    pub updated: usize,
}

impl UpsertSummary {
    /// Fold one outcome into the totals
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }
}

/// Outcome recorded for one extractor run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeLogStatus {
    /// Records were produced and persisted
    Success,
    /// The run failed; nothing from it was counted
    Error,
}

impl ScrapeLogStatus {
    /// Stored representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ScrapeLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ScrapeLogStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(ParseEnumError {
                kind: "scrape log status",
                value: other.to_string(),
            }),
        }
    }
}

/// Data for appending a scrape log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScrapeLog {
    /// Source the run belonged to
    pub source: String,
    /// Run outcome
    pub status: ScrapeLogStatus,
    /// Records produced; zero on error
    pub count: i64,
}

impl NewScrapeLog {
    /// Entry for a run that produced `count` records
    #[must_use]
    pub fn success(source: &str, count: usize) -> Self {
        Self {
            source: source.to_string(),
            status: ScrapeLogStatus::Success,
            count: i64::try_from(count).unwrap_or(i64::MAX),
        }
    }

    /// Entry for a failed run
    #[must_use]
    pub fn error(source: &str) -> Self {
        Self {
            source: source.to_string(),
            status: ScrapeLogStatus::Error,
            count: 0,
        }
    }
}

/// Database representation of a scrape log entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbScrapeLog {
    /// Database primary key
    pub id: i64,
    /// Source the run belonged to
    pub source: String,
    /// Run outcome
    pub status: ScrapeLogStatus,
    /// Records produced
    pub count: i64,
    /// When the entry was appended
    pub created_at: DateTime<Utc>,
}

/// Filters and page selection for the listing view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// Inclusive lower rent bound
    pub min_rent: Option<i64>,
    /// Inclusive upper rent bound
    pub max_rent: Option<i64>,
    /// Exact prefecture match
    pub prefecture: Option<String>,
    /// Exclude occupied properties
    pub available_only: bool,
    /// 1-based page number
    pub page: usize,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            min_rent: None,
            max_rent: None,
            prefecture: None,
            available_only: false,
            page: 1,
        }
    }
}

/// One page of listing results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    /// Properties on this page, most recently seen first
    pub items: Vec<PersistedProperty>,
    /// 1-based page number
    pub page: usize,
    /// Number of pages for the query
    pub total_pages: usize,
    /// Number of matching properties
    pub total: usize,
}
