//! Review-Harvester main entry point
//!
//! This is the command-line interface for the resumable marketplace harvester.

use anyhow::Context;
use clap::{Parser, Subcommand};
use review_harvester::config::{load_config_with_hash, Config};
use review_harvester::harvest::{HarvestContext, RotationScheduler, SessionHarvester, SystemClock};
use review_harvester::output::{format_session_summary, load_status, print_status};
use review_harvester::provider::{CollectorRegistry, MarketplaceClient};
use review_harvester::storage::{open_storage, SqliteStorage};
use review_harvester::{HarvestError, Source};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Review-Harvester: a resumable, time-budgeted marketplace harvester
///
/// Full scans page through a source across as many short invocations as it
/// takes; rotation ticks give every source a bounded incremental pull,
/// starting at a different source each time.
#[derive(Parser, Debug)]
#[command(name = "review-harvester")]
#[command(version)]
#[command(about = "A resumable, time-budgeted marketplace harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one full-scan session for a source
    FullScan {
        /// Id of the source to scan
        #[arg(long)]
        source: String,
    },

    /// Run one rotation tick over all active sources
    Tick,

    /// Show full-scan progress and the rotation offset
    Status,

    /// Mark a source's full scan inactive so the next session starts over
    Reset {
        /// Id of the source to reset
        #[arg(long)]
        source: String,
    },

    /// List configured sources
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match &cli.command {
        Command::FullScan { source } => handle_full_scan(&config, source).await,
        Command::Tick => handle_tick(&config).await,
        Command::Status => handle_status(&config),
        Command::Reset { source } => handle_reset(&config, source),
        Command::Sources => {
            handle_sources(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("review_harvester=info,warn"),
            1 => EnvFilter::new("review_harvester=debug,info"),
            2 => EnvFilter::new("review_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.storage.database_path);
    open_storage(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Resolves a source selection before any state is touched
fn resolve_source(
    config: &Config,
    id: &str,
    require_enabled: bool,
) -> Result<Source, HarvestError> {
    let entry = config
        .find_source(id)
        .ok_or_else(|| HarvestError::UnknownSource(id.to_string()))?;
    if require_enabled && !entry.enabled {
        return Err(HarvestError::SourceDisabled(id.to_string()));
    }
    Ok(entry.to_source())
}

/// Handles `full-scan`: runs one session and prints its summary
async fn handle_full_scan(config: &Config, source_id: &str) -> anyhow::Result<()> {
    let source = resolve_source(config, source_id, true)?;
    let client = MarketplaceClient::from_config(config).context("Failed to set up HTTP client")?;
    let storage = open_database(config)?;
    let clock = SystemClock;

    let harvester = SessionHarvester::new(
        &config.harvest,
        &client,
        HarvestContext::new(&storage, &clock),
    );

    match harvester.run(&source).await {
        Ok(outcome) => {
            println!("{}", format_session_summary(&outcome));
            Ok(())
        }
        Err(e) => {
            tracing::error!(source = %source.id, "Session failed: {}", e);
            let hint = if e.is_config_failure() {
                "Full-scan session could not start; check the configuration"
            } else {
                "Full-scan session failed; run again to resume from the last saved page"
            };
            Err(e).context(hint)
        }
    }
}

/// Handles `tick`: one rotation sweep, result reported through the log only
async fn handle_tick(config: &Config) -> anyhow::Result<()> {
    let pool = config.active_sources();
    let client = MarketplaceClient::from_config(config).context("Failed to set up HTTP client")?;
    let registry = CollectorRegistry::with_defaults(Arc::new(client));
    let storage = open_database(config)?;
    let clock = SystemClock;

    let scheduler = RotationScheduler::new(
        &config.harvest,
        &registry,
        HarvestContext::new(&storage, &clock),
    );

    let outcome = scheduler.tick(&pool).await.context("Rotation tick failed")?;
    tracing::debug!("Tick outcome: {:?}", outcome);
    Ok(())
}

/// Handles `status`: prints progress from the database
fn handle_status(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_database(config)?;
    let report = load_status(config, &storage)?;
    print_status(&report);

    Ok(())
}

/// Handles `reset`: marks a source's full scan inactive
fn handle_reset(config: &Config, source_id: &str) -> anyhow::Result<()> {
    let source = resolve_source(config, source_id, false)?;
    let storage = open_database(config)?;
    SessionHarvester::reset(&storage, &source)?;

    println!("✓ Full scan of {} reset; the next session starts from the beginning", source);
    Ok(())
}

/// Handles `sources`: lists configured sources
fn handle_sources(config: &Config) {
    println!("Sources ({}):", config.sources.len());
    for entry in &config.sources {
        let disabled = if entry.enabled { "" } else { " [disabled]" };
        println!(
            "  - {} ({}): provider {}, {}{}",
            entry.name, entry.id, entry.provider, entry.base_url, disabled
        );
    }
}
