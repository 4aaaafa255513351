use metrics::{counter, histogram};
use std::time::Duration;

use crate::models::{ScrapeLogStatus, UpsertSummary};

/// Metric names emitted by a scraping session
///
/// Recording is a no-op until the binary installs a recorder.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    // Extraction metrics
    pub extractions_total: &'static str,
    pub extraction_duration: &'static str,
    pub records_extracted_total: &'static str,
    pub target_failures_total: &'static str,

    // Persistence metrics
    pub properties_inserted_total: &'static str,
    pub properties_updated_total: &'static str,

    // Session metrics
    pub sessions_total: &'static str,
    pub session_duration: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            extractions_total: "garage_scraper_extractions_total",
            extraction_duration: "garage_scraper_extraction_duration_seconds",
            records_extracted_total: "garage_scraper_records_extracted_total",
            target_failures_total: "garage_scraper_target_failures_total",

            properties_inserted_total: "garage_scraper_properties_inserted_total",
            properties_updated_total: "garage_scraper_properties_updated_total",

            sessions_total: "garage_scraper_sessions_total",
            session_duration: "garage_scraper_session_duration_seconds",
        }
    }
}

impl MetricsCollector {
    /// Record the outcome of one extractor run
    pub fn record_extraction(&self, source: &'static str, status: ScrapeLogStatus, records: usize, duration: Duration) {
        counter!(self.extractions_total, "source" => source, "status" => status.as_str()).increment(1);
        histogram!(self.extraction_duration, "source" => source).record(duration.as_secs_f64());
        counter!(self.records_extracted_total, "source" => source).increment(records as u64);
    }

    /// Record target URLs that could not be fetched
    pub fn record_target_failures(&self, source: &'static str, failures: usize) {
        if failures > 0 {
            counter!(self.target_failures_total, "source" => source).increment(failures as u64);
        }
    }

    /// Record a batch upsert result
    pub fn record_upserts(&self, source: &'static str, summary: UpsertSummary) {
        counter!(self.properties_inserted_total, "source" => source).increment(summary.inserted as u64);
        counter!(self.properties_updated_total, "source" => source).increment(summary.updated as u64);
    }

    /// Record a finished session
    pub fn record_session(&self, duration: Duration, failed_sources: usize) {
        let status = if failed_sources == 0 { "clean" } else { "degraded" };
        counter!(self.sessions_total, "status" => status).increment(1);
        histogram!(self.session_duration).record(duration.as_secs_f64());
    }
}
