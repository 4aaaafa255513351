//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.
//! The tables themselves are created by `migrations/*/up.sql`.

/// Properties table schema
pub mod properties {
    /// Table name
    pub const TABLE: &str = "properties";
    /// Primary key column
    pub const ID: &str = "id";
    /// Site-local identifier column
    pub const SOURCE_ID: &str = "source_id";
    /// Source key column
    pub const SOURCE: &str = "source";
    /// Listing title column
    pub const NAME: &str = "name";
    /// Address column (write-once)
    pub const ADDRESS: &str = "address";
    /// Prefecture column (write-once)
    pub const PREFECTURE: &str = "prefecture";
    /// Monthly rent column, NULL when unpublished
    pub const RENT: &str = "rent";
    /// Availability status column
    pub const STATUS: &str = "status";
    /// Property type discriminator column
    pub const TYPE: &str = "type";
    /// Thumbnail URL column
    pub const IMAGE_URL: &str = "image_url";
    /// Detail page URL column (write-once)
    pub const DETAIL_URL: &str = "detail_url";
    /// JSON-encoded feature tags column (write-once)
    pub const FEATURES: &str = "features";
    /// First observation timestamp column
    pub const FIRST_SEEN_AT: &str = "first_seen_at";
    /// Latest observation timestamp column
    pub const LAST_SEEN_AT: &str = "last_seen_at";
}

/// Scrape log table schema
pub mod scrape_logs {
    /// Table name
    pub const TABLE: &str = "scrape_logs";
    /// Primary key column
    pub const ID: &str = "id";
    /// Source key column
    pub const SOURCE: &str = "source";
    /// Outcome column
    pub const STATUS: &str = "status";
    /// Record count column
    pub const COUNT: &str = "count";
    /// Append timestamp column
    pub const CREATED_AT: &str = "created_at";
}
