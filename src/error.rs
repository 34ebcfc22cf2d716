//! Error types for feedjoin.
//!
//! Data-quality problems inside the aggregation loop are recovered locally
//! and only counted (see [`SkipReason`]). Structural failures surface as
//! errors to the caller.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the keyed aggregator.
#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("Malformed amount for user {user_id} (event #{index}): {raw}")]
    MalformedAmount {
        user_id: String,
        index: usize,
        raw: String,
    },
}

/// Failures raised while talking to the NeoWs feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Upstream feed error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to decode feed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid feed request: {0}")]
    InvalidRequest(String),
}

/// Failures raised while writing cache entries.
///
/// Read-side problems never surface: a corrupt entry is a cache miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CacheError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why an event was skipped during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// A required field (identifier or status) was absent.
    MissingField { field: &'static str },
    /// The event's status is outside the configured filter.
    StatusFiltered,
    /// Amount could not be coerced and skip mode is on.
    MalformedAmount,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField { field } => write!(f, "missing field '{}'", field),
            SkipReason::StatusFiltered => write!(f, "status filtered"),
            SkipReason::MalformedAmount => write!(f, "malformed amount"),
        }
    }
}
