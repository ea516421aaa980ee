//! File freshness sensor
//!
//! Reports the age of a file in seconds. Typical use is checking that a
//! cron job or a backup still touches its marker or log file.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use vigil_core::{BoxedSensor, ExtendedInfo, MessageVars, Sensor, SensorResult};
use vigil_types::{SensorDefinition, SensorStatus};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileAgeConfig {
    pub path: PathBuf,
    /// Whether a missing file is CRITICAL rather than a sensor failure
    #[serde(default = "default_missing_is_critical")]
    pub missing_is_critical: bool,
}

fn default_missing_is_critical() -> bool {
    true
}

pub struct FileAgeSensor {
    config: FileAgeConfig,
}

impl FileAgeSensor {
    pub fn create(definition: &SensorDefinition) -> Result<BoxedSensor> {
        let config: FileAgeConfig = definition
            .settings_as()
            .context("file_age sensors need a 'path' setting")?;
        Ok(Box::new(Self { config }))
    }
}

impl Sensor for FileAgeSensor {
    fn run_sensor(&self, _definition: &SensorDefinition, result: &mut SensorResult) -> Result<()> {
        let path = &self.config.path;
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound && self.config.missing_is_critical =>
            {
                result.set_status(SensorStatus::Critical);
                result.set_message(
                    "@path does not exist",
                    MessageVars::new().with("path", path.display()),
                );
                return Ok(());
            }
            Err(e) => return Err(e).with_context(|| format!("cannot stat {}", path.display())),
        };

        let modified = metadata.modified()?;
        // Timestamps in the future count as age zero
        let age = SystemTime::now()
            .duration_since(modified)
            .map(|age| age.as_secs())
            .unwrap_or(0);
        result.set_value(age);
        result.add_status_message(
            "@path is @value s old",
            MessageVars::new().with("path", path.display()),
        );
        Ok(())
    }

    fn extended_info(&self) -> Option<&dyn ExtendedInfo> {
        Some(self)
    }
}

impl ExtendedInfo for FileAgeSensor {
    fn result_verbose(&self, _result: &SensorResult) -> String {
        let path = &self.config.path;
        match fs::metadata(path) {
            Ok(metadata) => {
                let modified = metadata
                    .modified()
                    .map(|time| {
                        DateTime::<Local>::from(time)
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string()
                    })
                    .unwrap_or_else(|_| "unknown".to_string());
                format!(
                    "path: {}\nsize: {} bytes\nmodified: {}",
                    path.display(),
                    metadata.len(),
                    modified
                )
            }
            Err(e) => format!("path: {}\nerror: {}", path.display(), e),
        }
    }
}
