//! Entry point for the external scheduler
//!
//! The scheduler presents `Authorization: Bearer <secret>`. The response
//! only says whether the session as a whole completed; per-source failures
//! are visible in the scrape log, not here.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{Result, ScrapeError};
use crate::extract::build_extractors;
use crate::fetcher::HttpFetcher;
use crate::repository::SqlitePropertyRepository;
use crate::session::{SessionReport, SessionRunner};

const BEARER_PREFIX: &str = "Bearer ";

/// Body returned to the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(message: &str) -> Self {
        Self {
            success: false,
            error: Some(message.to_string()),
        }
    }
}

/// Check an `Authorization` header against the shared secret.
///
/// An empty secret rejects everything.
#[must_use]
pub fn authorize(authorization: Option<&str>, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    authorization
        .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        .is_some_and(|token| token == secret)
}

/// [`authorize`] as a `Result`
pub fn require_authorized(authorization: Option<&str>, secret: &str) -> Result<()> {
    if authorize(authorization, secret) {
        Ok(())
    } else {
        Err(ScrapeError::Unauthorized)
    }
}

/// Authorize, then run one session with a store scoped to this call
pub async fn handle(config: &AppConfig, authorization: Option<&str>) -> TriggerResponse {
    if let Err(e) = require_authorized(authorization, &config.get_trigger_secret()) {
        warn!("Rejected trigger with missing or invalid credentials");
        return TriggerResponse::failed(&e.to_string());
    }

    match run_with_deadline(config, config.max_duration()).await {
        Ok(report) => {
            let totals = report.totals();
            info!(
                inserted = totals.inserted,
                updated = totals.updated,
                failed_sources = report.failed_sources(),
                "Triggered session completed"
            );
            TriggerResponse::ok()
        }
        Err(e) => {
            error!(error = %e, "Triggered session failed");
            TriggerResponse::failed("Scraping failed")
        }
    }
}

async fn run_with_deadline(config: &AppConfig, deadline: Duration) -> Result<SessionReport> {
    match tokio::time::timeout(deadline, run_session(config)).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::DeadlineExceeded(deadline.as_secs())),
    }
}

/// Open the store, build configured extractors and run one session.
///
/// The store handle lives only for the duration of the call.
pub async fn run_session(config: &AppConfig) -> Result<SessionReport> {
    let database_url = config.get_database_url();
    let max_connections = config.database.max_connections;
    let connection_timeout = config.connection_timeout();
    let database = tokio::task::spawn_blocking(move || {
        Database::with_pool_settings(&database_url, max_connections, connection_timeout)
    })
    .await??;

    let sources = config.sources()?;
    let fetcher = Arc::new(HttpFetcher::new(&config.scraper.user_agent, config.request_timeout())?);
    let extractors = build_extractors(&sources, fetcher)?;
    let repository = Arc::new(SqlitePropertyRepository::new(database));

    SessionRunner::new(extractors, repository).run_session().await
}
