use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use garage_house_scraper::config::AppConfig;
use garage_house_scraper::listing::{render_table, write_csv};
use garage_house_scraper::logging::init_logging;
use garage_house_scraper::session::SessionReport;
use garage_house_scraper::trigger;
use garage_house_scraper::validation::InputValidator;
use garage_house_scraper::{Database, ListingQuery, Source};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write JSON logs to this file (rotated daily)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scraping session over the enabled sources
    Run,
    /// Run a session through the authenticated trigger
    Trigger {
        /// Authorization header value, e.g. "Bearer <secret>"
        #[arg(short, long)]
        authorization: Option<String>,
    },
    /// List stored properties
    List {
        /// Minimum monthly rent in yen (inclusive)
        #[arg(long)]
        min_rent: Option<i64>,

        /// Maximum monthly rent in yen (inclusive)
        #[arg(long)]
        max_rent: Option<i64>,

        /// Exact prefecture, e.g. 東京都
        #[arg(short, long)]
        prefecture: Option<String>,

        /// Hide occupied properties
        #[arg(short, long)]
        available: bool,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Show recent scrape log entries
    Logs {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show known sources and whether each is enabled
    Sources,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load()?;

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.logging.file_path.as_ref().map(PathBuf::from));
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        log_file.as_deref(),
        config.logging.format == "json",
    )?;

    debug!("Configuration loaded");

    match cli.command {
        Commands::Run => {
            let report = trigger::run_session(&config).await.context("Scraping session failed")?;
            print_report(&report);
        }
        Commands::Trigger { authorization } => {
            let response = trigger::handle(&config, authorization.as_deref()).await;
            println!("{}", serde_json::to_string(&response)?);
            if !response.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::List {
            min_rent,
            max_rent,
            prefecture,
            available,
            page,
            format,
        } => {
            InputValidator::validate_rent_range(min_rent, max_rent)?;
            InputValidator::validate_page(page)?;
            if let Some(prefecture) = &prefecture {
                InputValidator::validate_prefecture(prefecture)?;
            }

            let query = ListingQuery {
                min_rent,
                max_rent,
                prefecture,
                available_only: available,
                page,
            };
            list_properties(&config, &query, format)?;
        }
        Commands::Logs { limit } => show_logs(&config, limit)?,
        Commands::Sources => show_sources(&config)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let url = config.get_database_url();
    InputValidator::validate_database_url(&url)?;
    Database::with_pool_settings(&url, config.database.max_connections, config.connection_timeout())
        .with_context(|| format!("Failed to open database at {url}"))
}

fn print_report(report: &SessionReport) {
    for outcome in &report.sources {
        match &outcome.error {
            None => println!(
                "{:<16} {:<7} {:>4} records ({} new, {} updated{})",
                outcome.source,
                outcome.status,
                outcome.count,
                outcome.inserted,
                outcome.updated,
                if outcome.failed_targets > 0 {
                    format!(", {} pages failed", outcome.failed_targets)
                } else {
                    String::new()
                }
            ),
            Some(error) => println!("{:<16} {:<7} {error}", outcome.source, outcome.status),
        }
    }
    let totals = report.totals();
    println!(
        "{} new, {} updated, {} failed sources in {} ms",
        totals.inserted,
        totals.updated,
        report.failed_sources(),
        report.duration.as_millis()
    );
}

fn list_properties(config: &AppConfig, query: &ListingQuery, format: OutputFormat) -> Result<()> {
    let database = open_database(config)?;
    let page = database.list_properties(query, config.listing.page_size)?;
    info!(total = page.total, page = page.page, "Listing query served");

    let now = Utc::now();
    let stdout = io::stdout();
    match format {
        OutputFormat::Table => print!("{}", render_table(&page, now)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
        OutputFormat::Csv => write_csv(&page, now, stdout.lock())?,
    }
    Ok(())
}

fn show_logs(config: &AppConfig, limit: usize) -> Result<()> {
    if limit == 0 {
        bail!("limit must be greater than 0");
    }

    let database = open_database(config)?;
    let mut stdout = io::stdout().lock();
    for entry in database.recent_scrape_logs(limit)? {
        writeln!(
            stdout,
            "{:>6} {} {:<16} {:<7} {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.source,
            entry.status,
            entry.count
        )?;
    }
    Ok(())
}

fn show_sources(config: &AppConfig) -> Result<()> {
    let enabled = config.sources()?;
    for source in Source::ALL {
        let profile = source.profile();
        let marker = if enabled.contains(&source) { "enabled" } else { "disabled" };
        println!("{:<16} {:<8} {}", source.key(), marker, profile.base_url);
        for target in profile.targets {
            println!("    {}", target.url);
        }
    }
    Ok(())
}
