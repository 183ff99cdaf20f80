//! # sw — SPILLWAY command line
//!
//! Windowed, resumable extraction from a query-based log-search API.
//!
//! - `sw extract --config spillway.toml --bookmark 2022-12-29T00:00:00Z`
//!   — run an extraction, records as JSON lines on stdout, logs on stderr.
//! - `sw plan --config spillway.toml --bookmark ...` — print the planned
//!   windows without submitting any query.
//! - `sw check-query --config spillway.toml` — validate the query text.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sw_core::query::validate;
use sw_core::window::{effective_end, plan_windows};
use sw_core::CanonicalQuery;
use sw_extract::Extractor;

use crate::config::Config;
use crate::insights::InsightsHttpClient;

mod config;
mod insights;

type CliError = Box<dyn std::error::Error>;

#[derive(Parser)]
#[command(
    name = "sw",
    version,
    about = "SPILLWAY — windowed, resumable log extraction",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an extraction and write records as JSON lines to stdout.
    Extract {
        /// Path to the config file.
        #[arg(long, default_value = "spillway.toml")]
        config: PathBuf,

        /// Resume point: the earliest record timestamp to query (RFC 3339).
        #[arg(long)]
        bookmark: String,
    },

    /// Print the planned windows without submitting any query.
    Plan {
        #[arg(long, default_value = "spillway.toml")]
        config: PathBuf,

        /// Resume point the plan starts from (RFC 3339).
        #[arg(long)]
        bookmark: String,
    },

    /// Validate the configured query text.
    CheckQuery {
        #[arg(long, default_value = "spillway.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Records go to stdout; everything else goes to stderr.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Extract { config, bookmark } => extract(&config, &bookmark).await,
        Commands::Plan { config, bookmark } => plan(&config, &bookmark),
        Commands::CheckQuery { config } => check_query(&config),
    }
}

async fn extract(config_path: &Path, bookmark: &str) -> Result<(), CliError> {
    let config = Config::load(config_path)?;
    let bookmark = parse_bookmark(bookmark)?;
    let endpoint = config
        .endpoint_url
        .clone()
        .ok_or("endpoint_url must be set to run an extraction")?;

    let client = Arc::new(InsightsHttpClient::new(endpoint, config.auth_headers.clone()));
    let extractor = Extractor::new(client, config.settings());
    let mut stream = extractor.extract(bookmark, config.end_date)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut count: u64 = 0;
    while let Some(record) = stream.next_record().await? {
        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush()?;

    tracing::info!("Extracted {count} record(s)");
    match stream.max_timestamp() {
        Some(ts) => tracing::info!("Bookmark: {}", ts.to_rfc3339()),
        None => tracing::info!("No records observed; bookmark unchanged"),
    }
    Ok(())
}

fn plan(config_path: &Path, bookmark: &str) -> Result<(), CliError> {
    let config = Config::load(config_path)?;
    validate(&config.query)?;
    let bookmark = parse_bookmark(bookmark)?;

    let end = effective_end(config.end_date, Utc::now());
    let windows = plan_windows(bookmark.timestamp(), end.timestamp(), config.window_increment_s);
    for window in &windows {
        println!("{window}");
    }
    println!(
        "{} window(s) at {}s increments, ending {}",
        windows.len(),
        config.window_increment_s,
        end.to_rfc3339()
    );
    Ok(())
}

fn check_query(config_path: &Path) -> Result<(), CliError> {
    let config = Config::load(config_path)?;
    let canonical = CanonicalQuery::new(&config.query)?;
    println!("query ok: {canonical}");
    Ok(())
}

fn parse_bookmark(raw: &str) -> Result<DateTime<Utc>, CliError> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| format!("invalid bookmark '{raw}': {e}"))?
        .with_timezone(&Utc))
}
