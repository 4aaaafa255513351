use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::Result;
use crate::models::{NewScrapeLog, ScrapedProperty, UpsertSummary};

/// Persistence seam used by the session runner
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Upsert every record in order, stopping at the first failure.
    ///
    /// Records written before a failure stay committed.
    async fn upsert_batch(&self, records: &[ScrapedProperty]) -> Result<UpsertSummary>;

    /// Append one scrape log entry
    async fn record_scrape_log(&self, entry: NewScrapeLog) -> Result<()>;
}

/// [`PropertyRepository`] over the embedded SQLite store
#[derive(Clone)]
pub struct SqlitePropertyRepository {
    database: Database,
}

impl SqlitePropertyRepository {
    pub const fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl PropertyRepository for SqlitePropertyRepository {
    async fn upsert_batch(&self, records: &[ScrapedProperty]) -> Result<UpsertSummary> {
        let database = self.database.clone();
        let records = records.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut summary = UpsertSummary::default();
            for record in &records {
                // Each record gets its own timestamp so re-observations always advance.
                let outcome = database.upsert_property(record, Utc::now()).inspect_err(|e| {
                    warn!(
                        source = %record.source,
                        source_id = %record.source_id,
                        error = %e,
                        "Upsert failed; aborting batch"
                    );
                })?;
                summary.record(outcome);
            }
            debug!(inserted = summary.inserted, updated = summary.updated, "Batch upserted");
            Ok(summary)
        })
        .await?
    }

    async fn record_scrape_log(&self, entry: NewScrapeLog) -> Result<()> {
        let database = self.database.clone();
        tokio::task::spawn_blocking(move || database.add_scrape_log(&entry, Utc::now()).map(|_| ())).await?
    }
}
