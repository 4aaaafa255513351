use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::error::{Result, ScrapeError};

/// Initialize structured logging
///
/// `RUST_LOG` wins over `log_level`. Console output goes to stderr, as JSON
/// when `json_console` is set. With `log_file`, a daily-rolling JSON log is
/// written next to it; keep the returned guard alive until exit so buffered
/// lines are flushed.
pub fn init_logging(log_level: Option<&str>, log_file: Option<&Path>, json_console: bool) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or("info")))
        .map_err(|e| ScrapeError::InvalidConfig(format!("Failed to create log filter: {e}")))?;

    let console_layer = if json_console {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .boxed()
    };

    let registry = Registry::default().with(env_filter).with(console_layer);

    let guard = if let Some(log_path) = log_file {
        let directory = log_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let file_name = log_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("garage-house-scraper.log");
        let (writer, guard) = non_blocking(rolling::daily(directory, file_name));

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .json();

        registry
            .with(file_layer)
            .try_init()
            .map_err(|e| ScrapeError::InvalidConfig(format!("Failed to install subscriber: {e}")))?;
        Some(guard)
    } else {
        registry
            .try_init()
            .map_err(|e| ScrapeError::InvalidConfig(format!("Failed to install subscriber: {e}")))?;
        None
    };

    info!("Logging initialized");
    Ok(guard)
}

/// Times one operation and logs its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
        duration
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            tracing::trace!(
                operation = %self.operation,
                duration_ms = self.start.elapsed().as_millis(),
                "Operation timer dropped"
            );
        }
    }
}
