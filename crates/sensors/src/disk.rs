//! Filesystem usage sensor

use crate::system::{percent, BYTES_PER_MB};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use sysinfo::Disks;
use vigil_core::{BoxedSensor, MessageVars, Sensor, SensorResult};
use vigil_types::SensorDefinition;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiskUsageConfig {
    #[serde(default = "default_mount_point")]
    pub mount_point: String,
}

fn default_mount_point() -> String {
    "/".to_string()
}

/// Percentage of space used on the filesystem mounted at `mount_point`
pub struct DiskUsageSensor {
    config: DiskUsageConfig,
}

impl DiskUsageSensor {
    pub fn create(definition: &SensorDefinition) -> Result<BoxedSensor> {
        let config: DiskUsageConfig = definition.settings_as()?;
        Ok(Box::new(Self { config }))
    }
}

impl Sensor for DiskUsageSensor {
    fn run_sensor(&self, _definition: &SensorDefinition, result: &mut SensorResult) -> Result<()> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .iter()
            .find(|disk| disk.mount_point().to_string_lossy() == self.config.mount_point)
            .ok_or_else(|| anyhow!("no filesystem mounted at {}", self.config.mount_point))?;

        let total = disk.total_space();
        let used = total.saturating_sub(disk.available_space());
        result.set_value(percent(used, total));
        result.add_status_message(
            "@free MB free on @mount",
            MessageVars::new()
                .with("free", (disk.available_space() as f64 / BYTES_PER_MB).round())
                .with("mount", &self.config.mount_point),
        );
        Ok(())
    }
}
