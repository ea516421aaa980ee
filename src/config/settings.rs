//! Application configuration

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vigil_core::RunnerOptions;
use vigil_types::{LoggingMode, SensorDefinition};

use super::defaults::default_sensors;

/// Current config format version
pub const CONFIG_VERSION: u32 = 1;

/// Application-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: u32,
    /// When compiled results are written to the history log
    #[serde(default)]
    pub logging_mode: LoggingMode,
    /// Timeout for sensors that set none; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Cache file; defaults to the project data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    /// History log file; defaults to the project data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,
    /// Configured sensors, in evaluation order
    #[serde(default)]
    pub sensors: Vec<SensorDefinition>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from the default location, falling back to the
    /// built-in defaults when no file exists yet
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            log::info!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        if config.version > CONFIG_VERSION {
            log::warn!(
                "Config {} has version {}, newer than supported version {}",
                path.display(),
                config.version,
                CONFIG_VERSION
            );
        }
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("cache.json")),
        }
    }

    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.history_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("history.jsonl")),
        }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            logging_mode: self.logging_mode,
            default_timeout: match self.default_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            logging_mode: LoggingMode::default(),
            default_timeout_secs: default_timeout_secs(),
            cache_path: None,
            history_path: None,
            sensors: default_sensors(),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "vigil", "vigil")
        .ok_or_else(|| anyhow!("Could not determine config directory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.logging_mode = LoggingMode::All;
        config.cache_path = Some(dir.path().join("cache.json"));
        config.save_to_path(&path).unwrap();

        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.logging_mode, LoggingMode::All);
        assert_eq!(loaded.sensors, config.sensors);
        assert_eq!(loaded.cache_path().unwrap(), dir.path().join("cache.json"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"sensors": [{"name": "root", "sensor_type": "disk_usage"}]}"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.logging_mode, LoggingMode::OnRequest);
        assert_eq!(config.default_timeout_secs, 30);
        assert_eq!(config.sensors.len(), 1);
        assert!(config.sensors[0].enabled);
    }

    #[test]
    fn test_runner_options() {
        let mut config = AppConfig::default();
        assert_eq!(
            config.runner_options().default_timeout,
            Some(Duration::from_secs(30))
        );
        config.default_timeout_secs = 0;
        assert_eq!(config.runner_options().default_timeout, None);
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.json"));
    }
}
