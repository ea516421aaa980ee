//! CPU usage and load average sensors

use crate::system;
use anyhow::Result;
use serde::Deserialize;
use sysinfo::System;
use vigil_core::{BoxedSensor, MessageVars, Sensor, SensorResult};
use vigil_types::SensorDefinition;

/// Global CPU usage in percent
pub struct CpuUsageSensor;

impl CpuUsageSensor {
    pub fn create(_definition: &SensorDefinition) -> Result<BoxedSensor> {
        Ok(Box::new(Self))
    }
}

impl Sensor for CpuUsageSensor {
    fn run_sensor(&self, _definition: &SensorDefinition, result: &mut SensorResult) -> Result<()> {
        let usage = system::cpu_usage();
        result.set_value((f64::from(usage) * 10.0).round() / 10.0);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadWindow {
    #[default]
    #[serde(alias = "1")]
    One,
    #[serde(alias = "5")]
    Five,
    #[serde(alias = "15")]
    Fifteen,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoadAverageConfig {
    #[serde(default)]
    pub window: LoadWindow,
    /// Divide by the number of logical CPUs
    #[serde(default)]
    pub per_cpu: bool,
}

/// System load average; 1-minute window unless configured otherwise
pub struct LoadAverageSensor {
    config: LoadAverageConfig,
}

impl LoadAverageSensor {
    pub fn create(definition: &SensorDefinition) -> Result<BoxedSensor> {
        let config: LoadAverageConfig = definition.settings_as()?;
        Ok(Box::new(Self { config }))
    }
}

impl Sensor for LoadAverageSensor {
    fn run_sensor(&self, _definition: &SensorDefinition, result: &mut SensorResult) -> Result<()> {
        let load = System::load_average();
        let mut value = match self.config.window {
            LoadWindow::One => load.one,
            LoadWindow::Five => load.five,
            LoadWindow::Fifteen => load.fifteen,
        };

        if self.config.per_cpu {
            let cpus = std::thread::available_parallelism()?.get();
            value /= cpus as f64;
        }

        result.set_value((value * 100.0).round() / 100.0);
        result.add_status_message(
            "load @one / @five / @fifteen",
            MessageVars::new()
                .with("one", format!("{:.2}", load.one))
                .with("five", format!("{:.2}", load.five))
                .with("fifteen", format!("{:.2}", load.fifteen)),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_window_settings() {
        let definition = SensorDefinition::new("load", "load_average")
            .with_setting("window", "15")
            .with_setting("per_cpu", true);
        let config: LoadAverageConfig = definition.settings_as().unwrap();
        assert_eq!(config.window, LoadWindow::Fifteen);
        assert!(config.per_cpu);

        let config: LoadAverageConfig = SensorDefinition::new("load", "load_average")
            .settings_as()
            .unwrap();
        assert_eq!(config, LoadAverageConfig::default());
    }
}
