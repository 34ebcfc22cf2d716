//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::feed::DATE_FORMAT;
use crate::models::Status;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// feedjoin - fetch, cache, join and aggregate small data feeds
///
/// Examples:
///   feedjoin asteroids 2015-09-07 3
///   feedjoin ltv --users users.json --transactions tx.json --threshold 500
///   feedjoin sync --products products.json --catalog catalog.json --format json
///   feedjoin --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .feedjoin.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// NeoWs API key
    #[arg(long, value_name = "KEY", env = "FEEDJOIN_API_KEY", global = true)]
    pub api_key: Option<String>,

    /// NeoWs feed endpoint URL
    #[arg(long, value_name = "URL", global = true)]
    pub endpoint: Option<String>,

    /// Feed request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Do not read or write the feed cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Directory holding feed cache files
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Generate a default .feedjoin.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch near-earth objects for a date window and list them by date
    Asteroids {
        /// First day of the window (YYYY-MM-DD)
        start_date: String,

        /// Number of days after the start date
        span_days: u32,
    },

    /// Compute lifetime value per user from a user list and a transaction log
    Ltv {
        /// JSON array of users ({"user_id", "name", ...})
        #[arg(long, value_name = "FILE")]
        users: PathBuf,

        /// JSON array of transactions ({"user_id", "amount", "state"})
        #[arg(long, value_name = "FILE")]
        transactions: PathBuf,

        /// Only report users whose LTV is strictly greater than this
        #[arg(long, value_name = "AMOUNT")]
        threshold: Option<f64>,

        /// Transaction statuses that count (comma-separated)
        #[arg(long, value_name = "STATUSES", value_delimiter = ',')]
        status: Option<Vec<Status>>,

        /// Skip transactions whose amount is not a number instead of failing
        #[arg(long)]
        skip_malformed: bool,
    },

    /// Join client products with a master catalog
    Sync {
        /// JSON array of client products ({"id", "price"})
        #[arg(long, value_name = "FILE")]
        products: PathBuf,

        /// JSON array of catalog items ({"id", "name"})
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,
    },
}

/// Output format for results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("Endpoint URL must start with 'http://' or 'https://'".to_string());
            }
        }

        match &self.command {
            None => Err("A command is required (asteroids, ltv, sync)".to_string()),
            Some(Command::Asteroids { start_date, .. }) => {
                NaiveDate::parse_from_str(start_date, DATE_FORMAT)
                    .map(|_| ())
                    .map_err(|_| format!("Start date must be YYYY-MM-DD, got '{}'", start_date))
            }
            Some(Command::Ltv {
                users,
                transactions,
                threshold,
                ..
            }) => {
                if let Some(t) = threshold {
                    if !t.is_finite() {
                        return Err("Threshold must be a finite number".to_string());
                    }
                }
                check_file(users)?;
                check_file(transactions)
            }
            Some(Command::Sync { products, catalog }) => {
                check_file(products)?;
                check_file(catalog)
            }
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn check_file(path: &Path) -> Result<(), String> {
    if !path.is_file() {
        return Err(format!("Input file does not exist: {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_asteroids_positionals() {
        let args = parse(&["feedjoin", "asteroids", "2015-09-07", "3"]);
        match args.command {
            Some(Command::Asteroids {
                ref start_date,
                span_days,
            }) => {
                assert_eq!(start_date, "2015-09-07");
                assert_eq!(span_days, 3);
            }
            _ => panic!("expected asteroids command"),
        }
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_bad_date() {
        let args = parse(&["feedjoin", "asteroids", "07-09-2015", "3"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_negative_span_rejected_by_parser() {
        assert!(Args::try_parse_from(["feedjoin", "asteroids", "2015-09-07", "-1"]).is_err());
    }

    #[test]
    fn test_parse_ltv_statuses() {
        let users = NamedTempFile::new().unwrap();
        let transactions = NamedTempFile::new().unwrap();
        let users_path = users.path().to_str().unwrap();
        let tx_path = transactions.path().to_str().unwrap();

        let args = parse(&[
            "feedjoin",
            "ltv",
            "--users",
            users_path,
            "--transactions",
            tx_path,
            "--status",
            "success,pending",
            "--threshold",
            "100",
            "--skip-malformed",
        ]);

        match args.command {
            Some(Command::Ltv {
                ref status,
                threshold,
                skip_malformed,
                ..
            }) => {
                assert_eq!(
                    status.clone().unwrap(),
                    vec![Status::Success, Status::Pending]
                );
                assert_eq!(threshold, Some(100.0));
                assert!(skip_malformed);
            }
            _ => panic!("expected ltv command"),
        }
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input_file() {
        let args = parse(&[
            "feedjoin",
            "sync",
            "--products",
            "/definitely/not/here.json",
            "--catalog",
            "/definitely/not/there.json",
        ]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_requires_command() {
        assert!(parse(&["feedjoin"]).validate().is_err());
        assert!(parse(&["feedjoin", "--init-config"]).validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["feedjoin", "-v", "-q", "asteroids", "2015-09-07", "1"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["feedjoin", "asteroids", "2015-09-07", "1", "--no-cache"]);
        assert!(args.no_cache);
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["feedjoin", "asteroids", "2015-09-07", "1"]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
