//! Append-only history log in JSON lines format

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use vigil_core::{HistoryLog, LogEntry, SensorStatus};

/// Last logged status per sensor, built from the log up to `offset`
#[derive(Debug, Default)]
struct StatusIndex {
    offset: u64,
    last_status: HashMap<String, SensorStatus>,
}

/// One `LogEntry` per line.
///
/// The last logged status of every sensor is indexed as the file is read.
/// Before each lookup the index catches up with lines appended since, by
/// this process or any other, so `last_status` always reflects the file.
pub struct JsonlHistoryLog {
    path: PathBuf,
    index: Mutex<StatusIndex>,
}

impl JsonlHistoryLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let log = Self {
            path: path.into(),
            index: Mutex::new(StatusIndex::default()),
        };
        let seen = {
            let mut index = log.index()?;
            log.catch_up(&mut index)?;
            index.last_status.len()
        };
        log::debug!("Opened history log {} ({} sensors seen)", log.path.display(), seen);
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The newest `limit` entries of a sensor, oldest first
    pub fn entries_for(&self, sensor_name: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let mut entries: Vec<LogEntry> = read_entries(&self.path)?
            .into_iter()
            .filter(|entry| entry.sensor_name == sensor_name)
            .collect();
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    fn index(&self) -> Result<MutexGuard<'_, StatusIndex>> {
        self.index.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Read complete lines past `index.offset` into the index
    fn catch_up(&self, index: &mut StatusIndex) -> Result<()> {
        let len = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        if len < index.offset {
            log::info!("History log {} shrank, reindexing", self.path.display());
            *index = StatusIndex::default();
        }
        if len == index.offset {
            return Ok(());
        }

        let mut file = File::open(&self.path)
            .with_context(|| format!("Failed to open history log {}", self.path.display()))?;
        file.seek(SeekFrom::Start(index.offset))?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            // A line without its newline is still being written
            if read == 0 || !line.ends_with('\n') {
                break;
            }
            index.offset += read as u64;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => {
                    index.last_status.insert(entry.sensor_name.clone(), entry.status());
                }
                Err(e) => log::warn!(
                    "Skipping line at byte {} of {}: {}",
                    index.offset - read as u64,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(())
    }
}

impl HistoryLog for JsonlHistoryLog {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        // Holding the index lock also serializes writers
        let mut index = self.index()?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history log {}", self.path.display()))?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;

        self.catch_up(&mut index)
    }

    fn last_status(&self, sensor_name: &str) -> Result<Option<SensorStatus>> {
        let mut index = self.index()?;
        self.catch_up(&mut index)?;
        Ok(index.last_status.get(sensor_name).copied())
    }
}

fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open history log {}", path.display()))?;

    let mut entries = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => log::warn!("Skipping line {} of {}: {}", number + 1, path.display(), e),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vigil_core::CachedResult;

    fn entry(sensor: &str, status: SensorStatus) -> LogEntry {
        LogEntry::new(
            sensor,
            CachedResult {
                value: None,
                expected_value: None,
                status,
                message: String::new(),
                execution_time_ms: 1.0,
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            },
        )
    }

    #[test]
    fn test_last_status_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("history.jsonl");

        let log = JsonlHistoryLog::open(&path).unwrap();
        assert_eq!(log.last_status("disk").unwrap(), None);
        log.append(&entry("disk", SensorStatus::Ok)).unwrap();
        log.append(&entry("cpu", SensorStatus::Critical)).unwrap();
        log.append(&entry("disk", SensorStatus::Warning)).unwrap();
        assert_eq!(log.last_status("disk").unwrap(), Some(SensorStatus::Warning));

        let reopened = JsonlHistoryLog::open(&path).unwrap();
        assert_eq!(reopened.last_status("disk").unwrap(), Some(SensorStatus::Warning));
        assert_eq!(reopened.last_status("cpu").unwrap(), Some(SensorStatus::Critical));
    }

    #[test]
    fn test_appends_from_another_instance_are_seen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let watcher = JsonlHistoryLog::open(&path).unwrap();
        let other = JsonlHistoryLog::open(&path).unwrap();

        watcher.append(&entry("disk", SensorStatus::Ok)).unwrap();
        assert_eq!(other.last_status("disk").unwrap(), Some(SensorStatus::Ok));

        other.append(&entry("disk", SensorStatus::Critical)).unwrap();
        assert_eq!(watcher.last_status("disk").unwrap(), Some(SensorStatus::Critical));

        // A half-written line is left for later
        let complete = serde_json::to_string(&entry("disk", SensorStatus::Warning)).unwrap();
        let (head, tail) = complete.split_at(10);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(head.as_bytes()).unwrap();
        assert_eq!(watcher.last_status("disk").unwrap(), Some(SensorStatus::Critical));
        file.write_all(format!("{}\n", tail).as_bytes()).unwrap();
        assert_eq!(watcher.last_status("disk").unwrap(), Some(SensorStatus::Warning));
    }

    #[test]
    fn test_truncated_log_is_reindexed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let log = JsonlHistoryLog::open(&path).unwrap();
        log.append(&entry("disk", SensorStatus::Critical)).unwrap();
        assert_eq!(log.last_status("disk").unwrap(), Some(SensorStatus::Critical));

        std::fs::write(&path, "").unwrap();
        assert_eq!(log.last_status("disk").unwrap(), None);
    }

    #[test]
    fn test_entries_for_limits_to_newest() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlHistoryLog::open(dir.path().join("history.jsonl")).unwrap();
        for status in [SensorStatus::Ok, SensorStatus::Warning, SensorStatus::Critical] {
            log.append(&entry("disk", status)).unwrap();
            log.append(&entry("cpu", SensorStatus::Ok)).unwrap();
        }

        let statuses: Vec<_> = log
            .entries_for("disk", 2)
            .unwrap()
            .iter()
            .map(LogEntry::status)
            .collect();
        assert_eq!(statuses, vec![SensorStatus::Warning, SensorStatus::Critical]);
        assert_eq!(log.entries_for("cpu", 10).unwrap().len(), 3);
        assert!(log.entries_for("missing", 10).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let good = serde_json::to_string(&entry("disk", SensorStatus::Info)).unwrap();
        std::fs::write(&path, format!("not json\n\n{}\n", good)).unwrap();

        let log = JsonlHistoryLog::open(&path).unwrap();
        assert_eq!(log.last_status("disk").unwrap(), Some(SensorStatus::Info));
        assert_eq!(log.entries_for("disk", 5).unwrap().len(), 1);
    }
}
