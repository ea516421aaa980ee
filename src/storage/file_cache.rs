//! Result cache persisted as one JSON document
//!
//! Nothing is held in memory: every lookup reads the file and every change
//! is a read-modify-write, so several vigil processes sharing one cache see
//! each other's entries and resets. Expired entries are never returned and
//! are dropped whenever the document is rewritten.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use vigil_core::{CacheKey, CacheStore, CachedResult, Clock};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    expires_at: DateTime<Utc>,
    result: CachedResult,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    entries: BTreeMap<String, StoredEntry>,
}

impl CacheDocument {
    fn live(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CachedResult> {
        self.entries
            .get(&key.to_string())
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.result.clone())
    }

    /// Drop expired entries, returning how many went
    fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }
}

pub struct FileCacheStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileCacheStore {
    /// Open the cache at `path`, starting empty when the file does not exist
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            clock,
            lock: Mutex::new(()),
        };

        let guard = store.guard()?;
        let mut document = store.read()?;
        let pruned = document.prune(store.clock.now());
        if pruned > 0 {
            store.write(&document)?;
        }
        log::debug!(
            "Opened cache {} with {} live entries ({} expired pruned)",
            store.path.display(),
            document.entries.len(),
            pruned
        );
        drop(guard);

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.read().map(|doc| doc.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    fn read(&self) -> Result<CacheDocument> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CacheDocument::default())
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read cache {}", self.path.display()))
            }
        };
        match serde_json::from_str::<CacheDocument>(&content) {
            Ok(document) => Ok(document),
            Err(e) => {
                // The cache is disposable; start over rather than refuse to run
                log::warn!("Discarding unreadable cache {}: {}", self.path.display(), e);
                Ok(CacheDocument::default())
            }
        }
    }

    fn update(&self, change: impl FnOnce(&mut CacheDocument)) -> Result<()> {
        let _guard = self.guard()?;
        let mut document = self.read()?;
        change(&mut document);
        document.prune(self.clock.now());
        self.write(&document)
    }

    fn write(&self, document: &CacheDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write next to the target and rename so readers never see half a file
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));
        std::fs::write(&tmp, serde_json::to_string_pretty(document)?)
            .with_context(|| format!("Failed to write cache {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace cache {}", self.path.display()))?;
        Ok(())
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedResult>> {
        let _guard = self.guard()?;
        Ok(self.read()?.live(key, self.clock.now()))
    }

    fn get_multiple(&self, keys: &[CacheKey]) -> Result<HashMap<CacheKey, CachedResult>> {
        let _guard = self.guard()?;
        let document = self.read()?;
        let now = self.clock.now();
        Ok(keys
            .iter()
            .filter_map(|key| document.live(key, now).map(|entry| (key.clone(), entry)))
            .collect())
    }

    fn set(&self, key: &CacheKey, entry: CachedResult, expires_at: DateTime<Utc>) -> Result<()> {
        self.update(|document| {
            document.entries.insert(
                key.to_string(),
                StoredEntry {
                    expires_at,
                    result: entry,
                },
            );
        })
    }

    fn delete(&self, key: &CacheKey) -> Result<()> {
        self.update(|document| {
            document.entries.remove(&key.to_string());
        })
    }

    fn delete_all(&self) -> Result<()> {
        self.update(|document| document.entries.clear())
    }
}
