use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    DbScrapeLog, ListingPage, ListingQuery, NewScrapeLog, PersistedProperty, ScrapedProperty,
    UpsertOutcome,
};
use crate::schema::{properties, scrape_logs};

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for handling connections and operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (creating if needed) the database behind `database_url`
    pub fn new(database_url: &str) -> Result<Self> {
        Self::with_pool_settings(database_url, 10, Duration::from_secs(30))
    }

    /// Open the database with explicit pool limits
    pub fn with_pool_settings(database_url: &str, max_connections: u32, connection_timeout: Duration) -> Result<Self> {
        let path = database_path(database_url);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| conn.busy_timeout(Duration::from_secs(5)));
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(connection_timeout)
            .build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2026-01-10-000000_create_tables/up.sql"))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Insert a property or refresh the mutable fields of an existing one.
    ///
    /// Runs in its own transaction so a failure never leaves a half-written row.
    /// On update only `name`, `rent`, `status`, `image_url` and `last_seen_at`
    /// change; address, prefecture, features, detail URL and `first_seen_at`
    /// keep their first-observed values.
    pub fn upsert_property(&self, property: &ScrapedProperty, seen_at: DateTime<Utc>) -> Result<UpsertOutcome> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {} = ? AND {} = ?",
                    properties::ID,
                    properties::TABLE,
                    properties::SOURCE,
                    properties::SOURCE_ID
                ),
                params![property.source, property.source_id],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = if let Some(id) = existing {
            tx.execute(
                &format!(
                    "UPDATE {} SET {} = ?, {} = ?, {} = ?, {} = ?, {} = ? WHERE {} = ?",
                    properties::TABLE,
                    properties::NAME,
                    properties::RENT,
                    properties::STATUS,
                    properties::IMAGE_URL,
                    properties::LAST_SEEN_AT,
                    properties::ID
                ),
                params![
                    property.name,
                    property.rent,
                    property.status.as_str(),
                    property.image_url,
                    seen_at,
                    id
                ],
            )?;
            UpsertOutcome::Updated
        } else {
            let features = serde_json::to_string(&property.features)?;
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    properties::TABLE,
                    properties::ID,
                    properties::SOURCE_ID,
                    properties::SOURCE,
                    properties::NAME,
                    properties::ADDRESS,
                    properties::PREFECTURE,
                    properties::RENT,
                    properties::STATUS,
                    properties::TYPE,
                    properties::IMAGE_URL,
                    properties::DETAIL_URL,
                    properties::FEATURES,
                    properties::FIRST_SEEN_AT,
                    properties::LAST_SEEN_AT
                ),
                params![
                    Uuid::new_v4().to_string(),
                    property.source_id,
                    property.source,
                    property.name,
                    property.address,
                    property.prefecture,
                    property.rent,
                    property.status.as_str(),
                    property.property_type.as_str(),
                    property.image_url,
                    property.detail_url,
                    features,
                    seen_at,
                    seen_at
                ],
            )?;
            UpsertOutcome::Inserted
        };

        tx.commit()?;
        debug!(source = %property.source, source_id = %property.source_id, ?outcome, "Upserted property");
        Ok(outcome)
    }

    /// Get a property by its (source, source_id) identity
    pub fn get_property(&self, source: &str, source_id: &str) -> Result<Option<PersistedProperty>> {
        let conn = self.get_connection()?;

        let property = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ? AND {} = ?",
                    properties::TABLE,
                    properties::SOURCE,
                    properties::SOURCE_ID
                ),
                params![source, source_id],
                map_property,
            )
            .optional()?;

        Ok(property)
    }

    /// Count all stored properties
    pub fn count_properties(&self) -> Result<usize> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", properties::TABLE), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// One page of properties matching `query`, most recently seen first
    pub fn list_properties(&self, query: &ListingQuery, page_size: usize) -> Result<ListingPage> {
        let conn = self.get_connection()?;
        let page_size = page_size.max(1);

        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(min) = query.min_rent {
            conditions.push(format!("{} >= ?", properties::RENT));
            params.push(Box::new(min));
        }
        if let Some(max) = query.max_rent {
            conditions.push(format!("{} <= ?", properties::RENT));
            params.push(Box::new(max));
        }
        if let Some(prefecture) = &query.prefecture {
            conditions.push(format!("{} = ?", properties::PREFECTURE));
            params.push(Box::new(prefecture.clone()));
        }
        if query.available_only {
            conditions.push(format!("{} != 'occupied'", properties::STATUS));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}{}", properties::TABLE, where_clause),
            rusqlite::params_from_iter(params.iter()),
            |row| row.get(0),
        )?;
        let total = usize::try_from(total).unwrap_or(0);
        let total_pages = total.div_ceil(page_size);
        let page = query.page.max(1);

        let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
        let offset = i64::try_from((page - 1).saturating_mul(page_size)).unwrap_or(i64::MAX);
        params.push(Box::new(limit));
        params.push(Box::new(offset));

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {}{} ORDER BY {} DESC, rowid DESC LIMIT ? OFFSET ?",
            properties::TABLE,
            where_clause,
            properties::LAST_SEEN_AT
        ))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), map_property)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }

        Ok(ListingPage {
            items,
            page,
            total_pages,
            total,
        })
    }

    /// Append a scrape log entry
    pub fn add_scrape_log(&self, entry: &NewScrapeLog, created_at: DateTime<Utc>) -> Result<DbScrapeLog> {
        let conn = self.get_connection()?;

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?, ?, ?, ?)",
                scrape_logs::TABLE,
                scrape_logs::SOURCE,
                scrape_logs::STATUS,
                scrape_logs::COUNT,
                scrape_logs::CREATED_AT
            ),
            params![entry.source, entry.status.as_str(), entry.count, created_at],
        )?;

        Ok(DbScrapeLog {
            id: conn.last_insert_rowid(),
            source: entry.source.clone(),
            status: entry.status,
            count: entry.count,
            created_at,
        })
    }

    /// Most recent scrape log entries, newest first
    pub fn recent_scrape_logs(&self, limit: usize) -> Result<Vec<DbScrapeLog>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY {} DESC LIMIT ?",
            scrape_logs::TABLE,
            scrape_logs::ID
        ))?;
        let rows = stmt.query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], map_scrape_log)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }
}

/// Strip the `sqlite:` scheme from a database URL
fn database_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

/// Parse a text column through `FromStr`
fn parse_column<T>(row: &Row, column: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(column)?;
    let index = row.as_ref().column_index(column)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// Map a database row to a PersistedProperty
fn map_property(row: &Row) -> rusqlite::Result<PersistedProperty> {
    let features: String = row.get(properties::FEATURES)?;
    let features = serde_json::from_str(&features).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            row.as_ref().column_index(properties::FEATURES).unwrap_or(0),
            Type::Text,
            Box::new(e),
        )
    })?;

    Ok(PersistedProperty {
        id: row.get(properties::ID)?,
        source_id: row.get(properties::SOURCE_ID)?,
        source: row.get(properties::SOURCE)?,
        name: row.get(properties::NAME)?,
        address: row.get(properties::ADDRESS)?,
        prefecture: row.get(properties::PREFECTURE)?,
        rent: row.get(properties::RENT)?,
        status: parse_column(row, properties::STATUS)?,
        property_type: parse_column(row, properties::TYPE)?,
        image_url: row.get(properties::IMAGE_URL)?,
        detail_url: row.get(properties::DETAIL_URL)?,
        features,
        first_seen_at: row.get(properties::FIRST_SEEN_AT)?,
        last_seen_at: row.get(properties::LAST_SEEN_AT)?,
    })
}

/// Map a database row to a DbScrapeLog
fn map_scrape_log(row: &Row) -> rusqlite::Result<DbScrapeLog> {
    Ok(DbScrapeLog {
        id: row.get(scrape_logs::ID)?,
        source: row.get(scrape_logs::SOURCE)?,
        status: parse_column(row, scrape_logs::STATUS)?,
        count: row.get(scrape_logs::COUNT)?,
        created_at: row.get(scrape_logs::CREATED_AT)?,
    })
}
