//! feedjoin - small data jobs over JSON feeds
//!
//! A CLI that fetches and caches the NeoWs asteroid feed, computes
//! per-user lifetime value from a user list and a transaction log, and
//! syncs client products against a master catalog.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (bad input, upstream failure, malformed data, etc.)

mod analysis;
mod cache;
mod cli;
mod config;
mod error;
mod feed;
mod input;
mod models;
mod report;

use analysis::{AggregateOptions, KeyedAggregator};
use anyhow::{Context, Result};
use cache::JsonCache;
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use error::FeedError;
use feed::{AsteroidSource, FeedRequest, NeoFeedClient};
use indicatif::{ProgressBar, ProgressStyle};
use input::LoadedRecords;
use models::{Asteroid, CatalogItem, Product, Status, Transaction, User};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("feedjoin v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("feedjoin failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .feedjoin.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` wins over the verbosity flags when it is set.
fn init_logging(args: &Args) -> Result<()> {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Dispatch the selected command and emit its output.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let Some(command) = args.command.clone() else {
        anyhow::bail!("A command is required (asteroids, ltv, sync)");
    };

    let output = match command {
        Command::Asteroids {
            start_date,
            span_days,
        } => run_asteroids(&config, &start_date, span_days, !args.quiet).await?,
        Command::Ltv {
            users,
            transactions,
            ..
        } => run_ltv(&config, &users, &transactions)?,
        Command::Sync { products, catalog } => run_sync(&config, &products, &catalog)?,
    };

    emit(&output, args.output.as_deref())
}

/// Fetch (or load from cache) asteroids and render them grouped by date.
async fn run_asteroids(
    config: &Config,
    start_date: &str,
    span_days: u32,
    show_progress: bool,
) -> Result<String> {
    let request = FeedRequest::parse(start_date, span_days)?;
    let client = NeoFeedClient::new((&config.feed).into())
        .context("Failed to create feed client")?;
    let source = SpinnerSource {
        inner: &client,
        show_progress,
    };

    let cache = if config.cache.enabled {
        Some(JsonCache::new(&config.cache.dir))
    } else {
        debug!("Feed cache disabled");
        None
    };

    let asteroids = feed::load_asteroids(&source, cache.as_ref(), &request)
        .await
        .with_context(|| {
            format!(
                "Failed to load asteroids for {} (+{} days)",
                start_date, span_days
            )
        })?;

    info!(
        "{} asteroids, {} potentially hazardous",
        asteroids.len(),
        analysis::hazardous_count(&asteroids)
    );

    let groups = analysis::group_by_date(&asteroids);
    match config.general.format {
        OutputFormat::Text => Ok(report::render_asteroids(&groups)),
        OutputFormat::Json => report::render_json(&groups),
    }
}

/// Compute lifetime value per user.
fn run_ltv(config: &Config, users_path: &Path, transactions_path: &Path) -> Result<String> {
    let users = input::load_records::<User>(users_path)?;
    if users.rejected > 0 {
        warn!("Skipped {} unreadable user records", users.rejected);
    }
    let LoadedRecords {
        records: transactions,
        rejected,
    } = input::load_records::<Transaction>(transactions_path)?;
    let users = users.records;

    let options = AggregateOptions::from(&config.aggregate);
    info!(
        "Aggregating {} transactions over {} users (threshold {}, statuses [{}])",
        transactions.len(),
        users.len(),
        options.threshold,
        options
            .statuses
            .iter()
            .map(Status::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut aggregation = KeyedAggregator::new(options)
        .aggregate(&users, &transactions)
        .context("Aggregation failed")?;
    aggregation.skipped.invalid_record = rejected;

    if aggregation.skipped.total() > 0 {
        warn!("Skipped {} transactions", aggregation.skipped.total());
    }
    let ghosts = aggregation
        .records
        .iter()
        .filter(|r| !r.subject.is_resolved())
        .count();
    info!(
        "{} users above threshold ({} not in the user list), {} at or below",
        aggregation.records.len(),
        ghosts,
        aggregation.below_threshold
    );

    match config.general.format {
        OutputFormat::Text => Ok(report::render_ltv(&aggregation)),
        OutputFormat::Json => report::render_json(&aggregation.rows()),
    }
}

/// Join client products with the master catalog.
fn run_sync(config: &Config, products_path: &Path, catalog_path: &Path) -> Result<String> {
    let products = input::load_records::<Product>(products_path)?;
    let catalog = input::load_records::<CatalogItem>(catalog_path)?;
    if products.rejected + catalog.rejected > 0 {
        warn!(
            "Skipped {} unreadable product and {} unreadable catalog records",
            products.rejected, catalog.rejected
        );
    }
    let (products, catalog) = (products.records, catalog.records);

    let outcome = analysis::sync_inventory(&products, &catalog);

    if !outcome.duplicates.is_empty() {
        warn!("{} duplicate product ids skipped", outcome.duplicates.len());
    }
    info!(
        "Synced {} of {} products",
        outcome.synced.len(),
        products.len()
    );

    match config.general.format {
        OutputFormat::Text => Ok(report::render_sync(&outcome)),
        OutputFormat::Json => report::render_json(&outcome),
    }
}

/// Write output to a file, or to stdout when no path is given.
fn emit(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Output saved to: {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Wraps a source with a terminal spinner while a fetch is in flight.
struct SpinnerSource<'a, S> {
    inner: &'a S,
    show_progress: bool,
}

impl<S: AsteroidSource> AsteroidSource for SpinnerSource<'_, S> {
    async fn fetch_asteroids(&self, request: &FeedRequest) -> Result<Vec<Asteroid>, FeedError> {
        let spinner = self.show_progress.then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                pb.set_style(style);
            }
            pb.set_message(format!("Fetching feed from {}...", request.start_date));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        let result = self.inner.fetch_asteroids(request).await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_run_ltv_survives_bad_typed_records() {
        let users = write_temp(
            r#"[{"user_id": 1, "name": "Alice"},
                {"user_id": 2, "name": "Bob"}]"#,
        );
        let transactions = write_temp(
            r#"[{"user_id": 1, "amount": 500, "state": "success"},
                {"user_id": 2, "amount": 5, "state": 1},
                {"user_id": 3, "amount": 600, "state": "success"},
                {"user_id": 2.0, "amount": 900, "state": "success"},
                {"user_id": 1, "amount": 50, "state": "success"}]"#,
        );

        let mut config = Config::default();
        config.general.format = OutputFormat::Json;
        let output = run_ltv(&config, users.path(), transactions.path()).unwrap();

        let rows: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            rows,
            serde_json::json!([
                {"user_id": 3, "name": "Unknown User", "ltv": 600.0},
                {"user_id": 1, "name": "Alice", "ltv": 550.0}
            ])
        );

        config.general.format = OutputFormat::Text;
        let text = run_ltv(&config, users.path(), transactions.path()).unwrap();
        assert!(text.contains("2 invalid record"));
    }
}
