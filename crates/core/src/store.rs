//! Storage capabilities consumed by the runner, plus in-memory versions.
//!
//! Stores own their thread safety; the runner never locks around them.

use crate::clock::Clock;
use crate::error::SensorFailure;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::error;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use vigil_types::{CachedResult, LogEntry, SensorStatus};

/// Cache key of a sensor result
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    sensor_name: String,
}

impl CacheKey {
    pub fn sensor(name: impl Into<String>) -> Self {
        Self {
            sensor_name: name.into(),
        }
    }

    pub fn sensor_name(&self) -> &str {
        &self.sensor_name
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor_result:{}", self.sensor_name)
    }
}

/// Cache of compiled results.
///
/// Expiry is the store's business: `get` must not return an entry whose
/// expiry has passed.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedResult>>;

    fn set(&self, key: &CacheKey, entry: CachedResult, expires_at: DateTime<Utc>) -> Result<()>;

    fn delete(&self, key: &CacheKey) -> Result<()>;

    /// Drop every sensor result entry
    fn delete_all(&self) -> Result<()>;

    /// Fetch several entries at once; absent and expired keys are omitted
    fn get_multiple(&self, keys: &[CacheKey]) -> Result<HashMap<CacheKey, CachedResult>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.get(key)? {
                found.insert(key.clone(), entry);
            }
        }
        Ok(found)
    }
}

/// Sink for history log snapshots
pub trait HistoryLog: Send + Sync {
    fn append(&self, entry: &LogEntry) -> Result<()>;

    /// Status of the most recently persisted entry for `sensor_name`
    fn last_status(&self, sensor_name: &str) -> Result<Option<SensorStatus>>;
}

/// Out-of-band receiver of per-sensor failures
pub trait ErrorSink: Send + Sync {
    fn report(&self, category: &str, failure: &SensorFailure);
}

/// Error sink writing to the log facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, category: &str, failure: &SensorFailure) {
        error!("[{}] sensor {}: {}", category, failure.sensor, failure);
    }
}

/// Process-local cache, checking expiry against its clock
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, (CachedResult, DateTime<Utc>)>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedResult>> {
        let now = self.clock.now();
        let entries = self.entries.read().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(entry, _)| entry.clone()))
    }

    fn set(&self, key: &CacheKey, entry: CachedResult, expires_at: DateTime<Utc>) -> Result<()> {
        let mut entries = self.entries.write().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        entries.insert(key.clone(), (entry, expires_at));
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> Result<()> {
        let mut entries = self.entries.write().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        entries.remove(key);
        Ok(())
    }

    fn delete_all(&self) -> Result<()> {
        let mut entries = self.entries.write().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        entries.clear();
        Ok(())
    }
}

/// Process-local history log
#[derive(Debug, Default)]
pub struct MemoryHistoryLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries in append order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn entries_for(&self, sensor_name: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.sensor_name == sensor_name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryLog for MemoryHistoryLog {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut entries = self.entries.write().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        entries.push(entry.clone());
        Ok(())
    }

    fn last_status(&self, sensor_name: &str) -> Result<Option<SensorStatus>> {
        let entries = self.entries.read().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        Ok(entries
            .iter()
            .rev()
            .find(|entry| entry.sensor_name == sensor_name)
            .map(LogEntry::status))
    }
}
