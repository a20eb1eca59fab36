use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use puzzle_scraper::config::{parse_interval, AppConfig};
use puzzle_scraper::extract::{build_extractor, ExtractStrategy};
use puzzle_scraper::fetch::{Fetcher, FetcherConfig};
use puzzle_scraper::storage::{DownloadedSet, JsonDownloadStore, MemoryDownloadedSet};
use puzzle_scraper::sync::{PuzzleSync, SyncConfig};

#[derive(Parser)]
#[command(name = "puzzle-scraper")]
#[command(about = "Download printable daily puzzles that have not been fetched yet")]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults are used if it does not exist)
    #[arg(long, default_value = "./puzzle-scraper.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Listing page URL
    #[arg(long)]
    listing_url: Option<String>,

    /// Directory for downloaded puzzles
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Download record file
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Extraction strategy: dom, embedded-json or auto
    #[arg(long)]
    strategy: Option<ExtractStrategy>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download new puzzles (the default)
    Sync {
        /// Show what would be downloaded without downloading or recording
        #[arg(long)]
        dry_run: bool,

        /// Keep running, syncing at every interval
        #[arg(long)]
        watch: bool,

        /// Sync interval for --watch (e.g., "6h", "30m")
        #[arg(long, default_value = "6h")]
        interval: String,
    },

    /// Print the dates already downloaded
    List,

    /// Run the extractor on a saved listing page and print what it finds
    Extract {
        /// Path to an HTML file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    init_tracing(&config.log_level, cli.json_logs);

    tracing::info!("Starting puzzle-scraper v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Sync {
        dry_run: false,
        watch: false,
        interval: "6h".to_string(),
    }) {
        Commands::Sync {
            dry_run,
            watch,
            interval,
        } => {
            let interval = parse_interval(&interval)
                .with_context(|| format!("Invalid --interval (must be positive): {}", interval))?;
            run_sync(&config, dry_run, watch, interval).await?;
        }
        Commands::List => {
            let record = JsonDownloadStore::peek(&config.state_file)?;
            for id in &record.puzzles {
                println!("{}", id);
            }
            tracing::info!(
                "{} puzzles recorded in {:?}",
                record.puzzles.len(),
                config.state_file
            );
        }
        Commands::Extract { path } => {
            let page = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let extractor = build_extractor(&config.extract)?;
            let entries = extractor.extract(&page)?;

            println!(
                "\n=== {} puzzles ({} extraction) ===",
                entries.len(),
                extractor.name()
            );
            for entry in &entries {
                let id = puzzle_scraper::date::parse_display_date(&entry.raw_date_text)
                    .map(|d| puzzle_scraper::date::to_file_safe_id(d).to_string())
                    .unwrap_or_else(|e| format!("?? ({})", e));
                println!("{}  {}  {}", id, entry.raw_date_text, entry.download_url);
            }
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(url) = &cli.listing_url {
        config.listing_url = url.clone();
    }
    if let Some(dir) = &cli.download_dir {
        config.download_dir = dir.clone();
    }
    if let Some(path) = &cli.state_file {
        config.state_file = path.clone();
    }
    if let Some(strategy) = cli.strategy {
        config.extract.strategy = strategy;
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_sync(
    config: &AppConfig,
    dry_run: bool,
    watch: bool,
    interval: Duration,
) -> Result<()> {
    let listing_url = Url::parse(&config.listing_url)?;
    let fetcher = Fetcher::new(FetcherConfig::from(&config.fetch))?;
    let extractor = build_extractor(&config.extract)?;

    let sync = PuzzleSync::new(
        SyncConfig {
            listing_url,
            download_dir: config.download_dir.clone(),
            interval,
            dry_run,
        },
        Arc::new(fetcher),
        extractor,
    );

    let mut store: Box<dyn DownloadedSet> = if dry_run {
        let recorded = JsonDownloadStore::peek(&config.state_file)?;
        Box::new(MemoryDownloadedSet::with_ids(recorded.puzzles))
    } else {
        Box::new(JsonDownloadStore::load(&config.state_file)?)
    };

    if watch {
        tokio::select! {
            _ = sync.run_periodic(store.as_mut()) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping periodic sync");
            }
        }
        return Ok(());
    }

    let report = sync.sync_once(store.as_mut()).await?;

    println!("\n=== Sync Results ===");
    println!("Puzzles listed:   {}", report.entries_found);
    if dry_run {
        println!("Would download:   {}", report.downloaded.len());
    } else {
        println!("Downloaded:       {}", report.downloaded.len());
    }
    println!("Already present:  {}", report.skipped);
    println!("Duration:         {:?}", report.duration);
    if dry_run {
        println!("\n(dry run - nothing downloaded or recorded)");
    }
    if !report.failures.is_empty() {
        println!("\nFailures:");
        for failure in &report.failures {
            println!("  - {}: {}", failure.raw_date_text, failure.reason);
        }
    }

    Ok(())
}
