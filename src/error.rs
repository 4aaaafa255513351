//! Error types for the garage-house-scraper library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the pipeline.

use thiserror::Error;

/// Errors that can occur while scraping, persisting, or serving properties.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Failed to fetch {url}: HTTP {status}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// A source profile carries a selector the HTML parser rejects
    #[error("Invalid selector `{selector}`: {message}")]
    InvalidSelector {
        /// Offending selector text
        selector: String,
        /// Parser message
        message: String,
    },

    /// A URL could not be parsed or resolved
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown source key
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Every target URL of an extractor failed to fetch
    #[error("All {attempted} target(s) failed for source {source_key}")]
    AllTargetsFailed {
        /// Source key
        source_key: String,
        /// Number of target URLs tried
        attempted: usize,
    },

    /// Trigger credential missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    /// Session exceeded its wall-clock ceiling
    #[error("Session exceeded {0} seconds")]
    DeadlineExceeded(u64),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with ScrapeError
pub type Result<T> = std::result::Result<T, ScrapeError>;

impl From<anyhow::Error> for ScrapeError {
    fn from(err: anyhow::Error) -> Self {
        ScrapeError::Other(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ScrapeError {
    fn from(err: tokio::task::JoinError) -> Self {
        ScrapeError::Other(format!("Background task failed: {err}"))
    }
}
