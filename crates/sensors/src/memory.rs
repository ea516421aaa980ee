//! RAM and swap usage sensors

use crate::system::{self, Usage, BYTES_PER_MB};
use anyhow::Result;
use vigil_core::{BoxedSensor, MessageVars, Sensor, SensorResult};
use vigil_types::SensorDefinition;

fn report(result: &mut SensorResult, usage: Usage) {
    result.set_value(usage.percent());
    result.add_status_message(
        "@used of @total MB in use",
        MessageVars::new()
            .with("used", (usage.used as f64 / BYTES_PER_MB).round())
            .with("total", (usage.total as f64 / BYTES_PER_MB).round()),
    );
}

/// Percentage of physical memory in use
pub struct MemoryUsageSensor;

impl MemoryUsageSensor {
    pub fn create(_definition: &SensorDefinition) -> Result<BoxedSensor> {
        Ok(Box::new(Self))
    }
}

impl Sensor for MemoryUsageSensor {
    fn run_sensor(&self, _definition: &SensorDefinition, result: &mut SensorResult) -> Result<()> {
        let usage = system::memory();
        log::trace!("Memory: {} of {} bytes used", usage.used, usage.total);
        report(result, usage);
        Ok(())
    }
}

/// Percentage of swap in use; 0 when the host has no swap
pub struct SwapUsageSensor;

impl SwapUsageSensor {
    pub fn create(_definition: &SensorDefinition) -> Result<BoxedSensor> {
        Ok(Box::new(Self))
    }
}

impl Sensor for SwapUsageSensor {
    fn run_sensor(&self, _definition: &SensorDefinition, result: &mut SensorResult) -> Result<()> {
        let usage = system::swap();
        if usage.total == 0 {
            result.set_value(0.0);
            result.add_status_message("no swap configured", MessageVars::new());
            return Ok(());
        }
        report(result, usage);
        Ok(())
    }
}
