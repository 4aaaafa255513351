//! Garage House Scraper - Kanto garage-house rental aggregation
//!
//! Scrapes garage-house rental listings from several Kanto sites, normalizes
//! them into one record shape, and upserts them into an embedded SQLite store
//! with an append-only scrape log.
//!
//! # Features
//!
//! - Data-driven site extractors over fetched HTML
//! - Heuristic rent, address, prefecture and status extraction
//! - Idempotent upserts keyed by (source, source id) with write-once fields
//! - Sequential sessions where one failing site never stops the rest
//! - Authenticated, deadline-bounded trigger entry point
//! - Filtered, paginated listing queries

/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Site extractors and text heuristics
pub mod extract;
/// Page fetching
pub mod fetcher;
/// Listing queries and output formatting
pub mod listing;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Scraping session orchestration
pub mod session;
/// Scheduler entry point
pub mod trigger;
/// Input validation
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use error::{Result, ScrapeError};
pub use extract::{Extraction, Extractor, SiteExtractor, Source};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use models::{
    ListingPage, ListingQuery, NewScrapeLog, PersistedProperty, PropertyStatus, ScrapeLogStatus, ScrapedProperty,
    UpsertOutcome, UpsertSummary,
};
pub use repository::{PropertyRepository, SqlitePropertyRepository};
pub use session::{SessionReport, SessionRunner, SourceOutcome};
