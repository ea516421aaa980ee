//! Sensor status levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bounded status a sensor result resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorStatus {
    #[serde(alias = "ok")]
    Ok,
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "warning")]
    Warning,
    #[serde(alias = "critical")]
    Critical,
    /// Not assessed yet, or no assessment path applies
    #[default]
    #[serde(alias = "unknown")]
    Unknown,
}

impl SensorStatus {
    /// All statuses, most severe first
    pub const ALL: [SensorStatus; 5] = [
        SensorStatus::Critical,
        SensorStatus::Warning,
        SensorStatus::Unknown,
        SensorStatus::Info,
        SensorStatus::Ok,
    ];

    /// Status code as rendered in messages and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorStatus::Ok => "OK",
            SensorStatus::Info => "INFO",
            SensorStatus::Warning => "WARNING",
            SensorStatus::Critical => "CRITICAL",
            SensorStatus::Unknown => "UNKNOWN",
        }
    }

    /// Rank used when aggregating several results; higher is worse.
    ///
    /// UNKNOWN ranks between INFO and WARNING: a sensor that could not be
    /// assessed is worth a look but is not a confirmed problem.
    pub fn severity(&self) -> u8 {
        match self {
            SensorStatus::Ok => 0,
            SensorStatus::Info => 1,
            SensorStatus::Unknown => 2,
            SensorStatus::Warning => 3,
            SensorStatus::Critical => 4,
        }
    }

    /// WARNING and CRITICAL are problems, everything else is not
    pub fn is_problem(&self) -> bool {
        matches!(self, SensorStatus::Warning | SensorStatus::Critical)
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OK" => Ok(SensorStatus::Ok),
            "INFO" => Ok(SensorStatus::Info),
            "WARNING" => Ok(SensorStatus::Warning),
            "CRITICAL" => Ok(SensorStatus::Critical),
            "UNKNOWN" => Ok(SensorStatus::Unknown),
            other => Err(format!("Unknown sensor status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        let mut statuses = SensorStatus::ALL.to_vec();
        statuses.sort_by_key(|s| std::cmp::Reverse(s.severity()));
        assert_eq!(statuses, SensorStatus::ALL.to_vec());
    }

    #[test]
    fn test_serde_accepts_lowercase() {
        let status: SensorStatus = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(status, SensorStatus::Warning);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"WARNING\"");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("critical".parse::<SensorStatus>(), Ok(SensorStatus::Critical));
        assert!("broken".parse::<SensorStatus>().is_err());
    }
}
