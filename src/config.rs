//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.feedjoin.toml` files.

use crate::analysis::AggregateOptions;
use crate::cli::{Args, Command, OutputFormat};
use crate::feed::client::FeedClientConfig;
use crate::models::Status;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".feedjoin.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// NeoWs feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// LTV aggregation settings.
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output format when `--format` is not given.
    #[serde(default)]
    pub format: OutputFormat,
}

/// NeoWs feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key sent as `api_key`.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: default_api_key(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.nasa.gov/neo/rest/v1/feed".to_string()
}

fn default_api_key() -> String {
    "DEMO_KEY".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl From<&FeedConfig> for FeedClientConfig {
    fn from(config: &FeedConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            timeout_seconds: config.timeout_seconds,
        }
    }
}

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether feed results are cached at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding cache files.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".")
}

/// LTV aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Users must exceed this value to be reported.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Transaction statuses that count toward LTV.
    #[serde(default = "default_statuses")]
    pub statuses: Vec<Status>,

    /// Skip transactions with malformed amounts instead of failing.
    #[serde(default)]
    pub skip_malformed: bool,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            statuses: default_statuses(),
            skip_malformed: false,
        }
    }
}

fn default_threshold() -> f64 {
    500.0
}

fn default_statuses() -> Vec<Status> {
    vec![Status::Success]
}

impl From<&AggregateConfig> for AggregateOptions {
    fn from(config: &AggregateConfig) -> Self {
        Self {
            threshold: config.threshold,
            statuses: config.statuses.iter().cloned().collect(),
            skip_malformed: config.skip_malformed,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually provided.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(ref api_key) = args.api_key {
            self.feed.api_key = api_key.clone();
        }
        if let Some(ref endpoint) = args.endpoint {
            self.feed.endpoint = endpoint.clone();
        }
        if let Some(timeout) = args.timeout {
            self.feed.timeout_seconds = timeout;
        }

        if args.no_cache {
            self.cache.enabled = false;
        }
        if let Some(ref dir) = args.cache_dir {
            self.cache.dir = dir.clone();
        }

        if let Some(Command::Ltv {
            threshold,
            status,
            skip_malformed,
            ..
        }) = &args.command
        {
            if let Some(threshold) = threshold {
                self.aggregate.threshold = *threshold;
            }
            if let Some(statuses) = status {
                self.aggregate.statuses = statuses.clone();
            }
            if *skip_malformed {
                self.aggregate.skip_malformed = true;
            }
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feed.endpoint, "https://api.nasa.gov/neo/rest/v1/feed");
        assert_eq!(config.feed.api_key, "DEMO_KEY");
        assert!(config.cache.enabled);
        assert_eq!(config.aggregate.threshold, 500.0);
        assert_eq!(config.aggregate.statuses, vec![Status::Success]);
        assert!(!config.aggregate.skip_malformed);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
format = "json"

[feed]
api_key = "secret"
timeout_seconds = 10

[cache]
enabled = false
dir = "/tmp/feedjoin"

[aggregate]
threshold = 100.0
statuses = ["success", "pending"]
skip_malformed = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.feed.api_key, "secret");
        assert_eq!(config.feed.timeout_seconds, 10);
        assert_eq!(config.feed.endpoint, default_endpoint());
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/feedjoin"));

        let options = AggregateOptions::from(&config.aggregate);
        assert_eq!(options.threshold, 100.0);
        assert!(options.statuses.contains(&Status::Pending));
        assert!(options.skip_malformed);
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args::try_parse_from([
            "feedjoin",
            "--api-key",
            "cli-key",
            "--no-cache",
            "--format",
            "json",
            "asteroids",
            "2015-09-07",
            "2",
        ])
        .unwrap();
        assert!(matches!(args.command, Some(Command::Asteroids { .. })));

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.feed.api_key, "cli-key");
        assert!(!config.cache.enabled);
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.feed.timeout_seconds, 30);
        assert_eq!(config.aggregate.threshold, 500.0);
    }

    #[test]
    fn test_merge_with_ltv_args() {
        let args = Args::try_parse_from([
            "feedjoin",
            "ltv",
            "--users",
            "users.json",
            "--transactions",
            "tx.json",
            "--threshold",
            "100",
            "--status",
            "success,pending",
            "--skip-malformed",
        ])
        .unwrap();

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.aggregate.threshold, 100.0);
        assert_eq!(
            config.aggregate.statuses,
            vec![Status::Success, Status::Pending]
        );
        assert!(config.aggregate.skip_malformed);
    }

    #[test]
    fn test_ltv_args_keep_config_values_when_absent() {
        let args = Args::try_parse_from([
            "feedjoin",
            "ltv",
            "--users",
            "users.json",
            "--transactions",
            "tx.json",
        ])
        .unwrap();

        let mut config = Config::default();
        config.aggregate.threshold = 42.0;
        config.aggregate.skip_malformed = true;
        config.merge_with_args(&args);

        assert_eq!(config.aggregate.threshold, 42.0);
        assert_eq!(config.aggregate.statuses, vec![Status::Success]);
        assert!(config.aggregate.skip_malformed);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[feed]"));
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[aggregate]"));
        assert!(!toml_str.contains("verbose"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.aggregate.statuses, vec![Status::Success]);
    }
}
