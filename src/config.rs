use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, Value};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::extract::Source;
use crate::fetcher::DEFAULT_USER_AGENT;
use crate::validation::InputValidator;

/// Environment variable prefix for layered configuration
pub const ENV_PREFIX: &str = "GARAGE_SCRAPER";

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub scraper: ScraperConfig,
    pub trigger: TriggerConfig,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Source keys in session order
    pub enabled_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Shared bearer secret; empty rejects every request
    #[serde(default)]
    pub secret: String,
    pub max_duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub page_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/garage_houses.db".to_string(),
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            scraper: ScraperConfig {
                user_agent: DEFAULT_USER_AGENT.to_string(),
                request_timeout_secs: 30,
                enabled_sources: [Source::TokyoGarage, Source::GarageHouseBiz, Source::Garrozze]
                    .iter()
                    .map(|s| s.key().to_string())
                    .collect(),
            },
            trigger: TriggerConfig {
                secret: String::new(),
                max_duration_secs: 300,
            },
            listing: ListingConfig { page_size: 12 },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();
        for (key, value) in Self::default().into_pairs() {
            builder = builder.set_default(key, value)?;
        }

        let config = builder
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("scraper.enabled_sources")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        let app_config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        InputValidator::validate_database_url(&self.database.url)?;
        if self.database.max_connections == 0 {
            return Err(anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow!("connection_timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        InputValidator::validate_user_agent(&self.scraper.user_agent)?;
        if self.scraper.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be greater than 0"));
        }
        InputValidator::validate_enabled_sources(&self.scraper.enabled_sources)?;

        if self.trigger.max_duration_secs == 0 {
            return Err(anyhow!("max_duration_secs must be greater than 0"));
        }

        InputValidator::validate_page_size(self.listing.page_size)?;

        Ok(())
    }

    /// Enabled sources in session order
    pub fn sources(&self) -> Result<Vec<Source>> {
        InputValidator::validate_enabled_sources(&self.scraper.enabled_sources)
    }

    /// Get database URL from environment or config
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Get trigger secret from environment or config
    pub fn get_trigger_secret(&self) -> String {
        std::env::var("CRON_SECRET").unwrap_or_else(|_| self.trigger.secret.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.database.connection_timeout_secs)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper.request_timeout_secs)
    }

    pub const fn max_duration(&self) -> Duration {
        Duration::from_secs(self.trigger.max_duration_secs)
    }

    /// Flatten into `section.key` pairs for the defaults layer
    fn into_pairs(self) -> Vec<(&'static str, Value)> {
        let mut pairs = vec![
            ("database.url", Value::from(self.database.url)),
            ("database.max_connections", Value::from(self.database.max_connections)),
            ("database.connection_timeout_secs", Value::from(self.database.connection_timeout_secs)),
            ("logging.level", Value::from(self.logging.level)),
            ("logging.format", Value::from(self.logging.format)),
            ("scraper.user_agent", Value::from(self.scraper.user_agent)),
            ("scraper.request_timeout_secs", Value::from(self.scraper.request_timeout_secs)),
            ("scraper.enabled_sources", Value::from(self.scraper.enabled_sources)),
            ("trigger.secret", Value::from(self.trigger.secret)),
            ("trigger.max_duration_secs", Value::from(self.trigger.max_duration_secs)),
            ("listing.page_size", Value::from(self.listing.page_size as u64)),
        ];
        if let Some(file_path) = self.logging.file_path {
            pairs.push(("logging.file_path", Value::from(file_path)));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.url, "sqlite:data/garage_houses.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.listing.page_size, 12);
        assert_eq!(config.trigger.max_duration_secs, 300);
        assert_eq!(
            config.scraper.enabled_sources,
            vec!["tokyo-garage", "garagehouse-biz", "garrozze"]
        );
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_source_rejected() {
        let mut config = AppConfig::default();
        config.scraper.enabled_sources.push("suumo".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sources_keep_configured_order() {
        let mut config = AppConfig::default();
        config.scraper.enabled_sources = vec!["garrozze".to_string(), "garage110".to_string()];
        assert_eq!(config.sources().unwrap(), vec![Source::Garrozze, Source::Garage110]);
    }

    #[test]
    fn test_defaults_flatten_every_section() {
        let keys: Vec<_> = AppConfig::default().into_pairs().into_iter().map(|(k, _)| k).collect();
        for section in ["database.", "logging.", "scraper.", "trigger.", "listing."] {
            assert!(keys.iter().any(|k| k.starts_with(section)), "{section}");
        }
    }
}
