//! Flat-file JSON cache.
//!
//! One file per key under a cache directory, written as indented JSON.
//! Entries never expire; remove the file to force a refresh.

use crate::error::CacheError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A directory of JSON cache entries.
#[derive(Debug, Clone)]
pub struct JsonCache {
    dir: PathBuf,
}

impl JsonCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Load an entry.
    ///
    /// Returns `None` when the file is missing, unreadable, or does not
    /// parse as `T`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache miss: {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("Cannot read cache file {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => {
                debug!("Cache hit: {}", path.display());
                Some(value)
            }
            Err(e) => {
                warn!(
                    "Cache file {} is corrupt, ignoring it: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Store an entry, creating the cache directory if needed.
    pub fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<PathBuf, CacheError> {
        let content = serde_json::to_string_pretty(value)?;

        if !self.dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        }

        let path = self.path_for(key);
        fs::write(&path, content).map_err(|e| CacheError::io(&path, e))?;
        debug!("Cached entry at {}", path.display());

        Ok(path)
    }
}
