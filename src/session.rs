//! One scraping pass over the configured sources
//!
//! Sources run strictly in order. Each gets exactly one scrape log entry; a
//! failing source is logged as an error and the pass moves on. Records
//! persisted by earlier sources are never rolled back.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{Result, ScrapeError};
use crate::extract::Extractor;
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{NewScrapeLog, ScrapeLogStatus, UpsertSummary};
use crate::repository::PropertyRepository;

/// What happened to one source during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutcome {
    pub source: &'static str,
    pub status: ScrapeLogStatus,
    /// Records extracted and persisted; zero on error
    pub count: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Target URLs that failed without failing the source
    pub failed_targets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceOutcome {
    fn success(source: &'static str, count: usize, summary: UpsertSummary, failed_targets: usize) -> Self {
        Self {
            source,
            status: ScrapeLogStatus::Success,
            count,
            inserted: summary.inserted,
            updated: summary.updated,
            failed_targets,
            error: None,
        }
    }

    fn failure(source: &'static str, error: &ScrapeError) -> Self {
        Self {
            source,
            status: ScrapeLogStatus::Error,
            count: 0,
            inserted: 0,
            updated: 0,
            failed_targets: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Per-source results of one session, in run order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub sources: Vec<SourceOutcome>,
    #[serde(skip)]
    pub duration: Duration,
}

impl SessionReport {
    /// Sources that ended with an error log
    #[must_use]
    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|outcome| outcome.status == ScrapeLogStatus::Error)
            .count()
    }

    /// Totals across all sources
    #[must_use]
    pub fn totals(&self) -> UpsertSummary {
        self.sources.iter().fold(UpsertSummary::default(), |mut acc, outcome| {
            acc.inserted += outcome.inserted;
            acc.updated += outcome.updated;
            acc
        })
    }
}

/// Runs extractors in order and persists their output
pub struct SessionRunner {
    extractors: Vec<Box<dyn Extractor>>,
    repository: Arc<dyn PropertyRepository>,
    metrics: MetricsCollector,
}

impl SessionRunner {
    pub fn new(extractors: Vec<Box<dyn Extractor>>, repository: Arc<dyn PropertyRepository>) -> Self {
        Self {
            extractors,
            repository,
            metrics: MetricsCollector::default(),
        }
    }

    /// Run every extractor once.
    ///
    /// Only a failure to write a scrape log escapes; everything else is
    /// recorded against the source and the session continues.
    pub async fn run_session(&self) -> Result<SessionReport> {
        let session_timer = OperationTimer::new("session");
        let mut report = SessionReport::default();

        info!(sources = self.extractors.len(), "Starting scraping session");

        for extractor in &self.extractors {
            let outcome = self.run_source(extractor.as_ref()).await?;
            report.sources.push(outcome);
        }

        report.duration = session_timer.finish();
        self.metrics.record_session(report.duration, report.failed_sources());

        let totals = report.totals();
        info!(
            inserted = totals.inserted,
            updated = totals.updated,
            failed_sources = report.failed_sources(),
            "Scraping session finished"
        );
        Ok(report)
    }

    async fn run_source(&self, extractor: &dyn Extractor) -> Result<SourceOutcome> {
        let source = extractor.source();
        let timer = OperationTimer::new(format!("extract:{source}"));

        let outcome = match self.extract_and_persist(extractor).await {
            Ok(outcome) => match self.repository.record_scrape_log(NewScrapeLog::success(source, outcome.count)).await {
                Ok(()) => outcome,
                Err(e) => {
                    // The data is committed but the success entry is not; record the source as failed instead.
                    warn!(source, error = %e, "Failed to record success log");
                    self.repository.record_scrape_log(NewScrapeLog::error(source)).await?;
                    SourceOutcome::failure(source, &e)
                }
            },
            Err(e) => {
                error!(source, error = %e, "Source failed");
                self.repository.record_scrape_log(NewScrapeLog::error(source)).await?;
                SourceOutcome::failure(source, &e)
            }
        };

        self.metrics
            .record_extraction(source, outcome.status, outcome.count, timer.finish());
        Ok(outcome)
    }

    async fn extract_and_persist(&self, extractor: &dyn Extractor) -> Result<SourceOutcome> {
        let source = extractor.source();
        let extraction = extractor.scrape().await?;

        let failed_targets = extraction.failed_targets.len();
        self.metrics.record_target_failures(source, failed_targets);

        if extraction.all_targets_failed() {
            return Err(ScrapeError::AllTargetsFailed {
                source_key: source.to_string(),
                attempted: extraction.targets_attempted,
            });
        }

        let summary = self.repository.upsert_batch(&extraction.records).await?;
        self.metrics.record_upserts(source, summary);

        info!(
            source,
            records = extraction.records.len(),
            inserted = summary.inserted,
            updated = summary.updated,
            failed_targets,
            "Source persisted"
        );
        Ok(SourceOutcome::success(source, extraction.records.len(), summary, failed_targets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Extraction, MockExtractor, TargetFailure};
    use crate::models::{PropertyStatus, PropertyType, ScrapedProperty};
    use crate::repository::MockPropertyRepository;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn record(source_id: &str) -> ScrapedProperty {
        ScrapedProperty {
            source_id: source_id.to_string(),
            source: "garrozze".to_string(),
            name: "Garage House".to_string(),
            address: String::new(),
            prefecture: "その他".to_string(),
            rent: None,
            status: PropertyStatus::Unknown,
            property_type: PropertyType::GarageHouse,
            image_url: None,
            detail_url: format!("https://garrozze.com/{source_id}/"),
            features: Vec::new(),
        }
    }

    fn extractor(source: &'static str, result: fn() -> Result<Extraction>) -> Box<dyn Extractor> {
        let mut mock = MockExtractor::new();
        mock.expect_source().return_const(source);
        mock.expect_scrape().times(1).returning(move || result());
        Box::new(mock)
    }

    #[tokio::test]
    async fn test_success_logs_record_count() {
        let mut repository = MockPropertyRepository::new();
        repository
            .expect_upsert_batch()
            .withf(|records| records.len() == 2)
            .times(1)
            .returning(|_| Ok(UpsertSummary { inserted: 1, updated: 1 }));
        repository
            .expect_record_scrape_log()
            .with(eq(NewScrapeLog::success("garrozze", 2)))
            .times(1)
            .returning(|_| Ok(()));

        let runner = SessionRunner::new(
            vec![extractor("garrozze", || {
                let mut extraction = Extraction::new("garrozze");
                extraction.targets_attempted = 1;
                extraction.records = vec![record("a1"), record("a2")];
                Ok(extraction)
            })],
            Arc::new(repository),
        );

        let report = runner.run_session().await.unwrap();
        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.sources[0].status, ScrapeLogStatus::Success);
        assert_eq!(report.totals(), UpsertSummary { inserted: 1, updated: 1 });
    }

    #[tokio::test]
    async fn test_failed_source_does_not_stop_session() {
        let mut repository = MockPropertyRepository::new();
        let mut sequence = Sequence::new();
        repository
            .expect_record_scrape_log()
            .with(eq(NewScrapeLog::error("tokyo-garage")))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));
        repository
            .expect_upsert_batch()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(UpsertSummary::default()));
        repository
            .expect_record_scrape_log()
            .with(eq(NewScrapeLog::success("garrozze", 0)))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));

        let runner = SessionRunner::new(
            vec![
                extractor("tokyo-garage", || Err(ScrapeError::Other("boom".to_string()))),
                extractor("garrozze", || {
                    let mut extraction = Extraction::new("garrozze");
                    extraction.targets_attempted = 1;
                    Ok(extraction)
                }),
            ],
            Arc::new(repository),
        );

        let report = runner.run_session().await.unwrap();
        assert_eq!(report.failed_sources(), 1);
        assert_eq!(report.sources[1].status, ScrapeLogStatus::Success);
    }

    #[tokio::test]
    async fn test_unreachable_source_logs_error_without_upsert() {
        let mut repository = MockPropertyRepository::new();
        repository.expect_upsert_batch().never();
        repository
            .expect_record_scrape_log()
            .with(eq(NewScrapeLog::error("garrozze")))
            .times(1)
            .returning(|_| Ok(()));

        let runner = SessionRunner::new(
            vec![extractor("garrozze", || {
                let mut extraction = Extraction::new("garrozze");
                extraction.targets_attempted = 1;
                extraction
                    .failed_targets
                    .push(TargetFailure::new("https://garrozze.com/", "HTTP 503"));
                Ok(extraction)
            })],
            Arc::new(repository),
        );

        let report = runner.run_session().await.unwrap();
        assert_eq!(report.sources[0].count, 0);
        assert!(report.sources[0].error.is_some());
    }

    #[tokio::test]
    async fn test_upsert_failure_becomes_error_log() {
        let mut repository = MockPropertyRepository::new();
        repository
            .expect_upsert_batch()
            .times(1)
            .returning(|_| Err(ScrapeError::Other("disk full".to_string())));
        repository
            .expect_record_scrape_log()
            .with(eq(NewScrapeLog::error("garrozze")))
            .times(1)
            .returning(|_| Ok(()));

        let runner = SessionRunner::new(
            vec![extractor("garrozze", || {
                let mut extraction = Extraction::new("garrozze");
                extraction.targets_attempted = 1;
                extraction.records = vec![record("a1")];
                Ok(extraction)
            })],
            Arc::new(repository),
        );

        let report = runner.run_session().await.unwrap();
        assert_eq!(report.sources[0].status, ScrapeLogStatus::Error);
    }

    #[tokio::test]
    async fn test_unwritable_log_escapes_session() {
        let mut repository = MockPropertyRepository::new();
        repository
            .expect_record_scrape_log()
            .returning(|_| Err(ScrapeError::Other("store unavailable".to_string())));

        let runner = SessionRunner::new(
            vec![extractor("garrozze", || Err(ScrapeError::Other("boom".to_string())))],
            Arc::new(repository),
        );

        assert!(runner.run_session().await.is_err());
    }
}
