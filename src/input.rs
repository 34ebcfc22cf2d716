//! Loading JSON input files.
//!
//! Files must hold a JSON array. Elements that do not fit the record type
//! (wrong field types, missing required fields) are skipped and counted,
//! so one bad record never costs the rest of the file.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Records read from one input file.
#[derive(Debug)]
pub struct LoadedRecords<T> {
    pub records: Vec<T>,
    /// Array elements that could not be converted and were skipped.
    pub rejected: usize,
}

/// Read a JSON array of records from a file.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<LoadedRecords<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let elements: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input file: {}", path.display()))?;

    let mut records = Vec::with_capacity(elements.len());
    let mut rejected = 0;
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<T>(element) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    "Skipping record {} in {}: {}",
                    index,
                    path.display(),
                    e
                );
                rejected += 1;
            }
        }
    }

    debug!(
        "Loaded {} records from {} ({} rejected)",
        records.len(),
        path.display(),
        rejected
    );
    Ok(LoadedRecords { records, rejected })
}
