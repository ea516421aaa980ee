//! Persisted forms of sensor results (cache entries and history log entries)

use crate::status::SensorStatus;
use crate::value::SensorValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flattened result fields stored in the cache and the history log.
///
/// Verbose output is deliberately absent: it is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    #[serde(default)]
    pub value: Option<SensorValue>,
    #[serde(default)]
    pub expected_value: Option<SensorValue>,
    pub status: SensorStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub execution_time_ms: f64,
    pub timestamp: DateTime<Utc>,
}

/// One history log snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub sensor_name: String,
    #[serde(flatten)]
    pub result: CachedResult,
}

impl LogEntry {
    pub fn new(sensor_name: impl Into<String>, result: CachedResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            sensor_name: sensor_name.into(),
            result,
        }
    }

    pub fn status(&self) -> SensorStatus {
        self.result.status
    }
}

/// Process-wide policy deciding which results reach the history log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggingMode {
    /// Never log
    None,
    /// Log when the sensor asks for it or its status changed
    #[default]
    OnRequest,
    /// Log every non-cached result
    All,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_entry_is_flat_json() {
        let entry = LogEntry::new(
            "cron_last_run",
            CachedResult {
                value: Some(SensorValue::Int(120)),
                expected_value: None,
                status: SensorStatus::Warning,
                message: "Value 120".to_string(),
                execution_time_ms: 1.5,
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            },
        );

        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sensor_name"], "cron_last_run");
        assert_eq!(json["status"], "WARNING");
        assert_eq!(json["value"], 120);

        let restored: LogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(restored, entry);
    }

    #[test]
    fn test_logging_mode_names() {
        let mode: LoggingMode = serde_json::from_str("\"on_request\"").unwrap();
        assert_eq!(mode, LoggingMode::OnRequest);
        assert_eq!(LoggingMode::default(), LoggingMode::OnRequest);
    }
}
