//! Sensor reporting configured values
//!
//! Useful for trying out thresholds and message templates, and as a
//! placeholder for checks that are fed from elsewhere.

use anyhow::Result;
use serde::Deserialize;
use vigil_core::{BoxedSensor, MessageVars, Sensor, SensorResult};
use vigil_types::{SensorDefinition, SensorStatus, SensorValue};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StaticValueConfig {
    pub value: Option<SensorValue>,
    pub expected_value: Option<SensorValue>,
    pub status: Option<SensorStatus>,
    pub message: Option<String>,
}

pub struct StaticValueSensor {
    config: StaticValueConfig,
}

impl StaticValueSensor {
    pub fn new(config: StaticValueConfig) -> Self {
        Self { config }
    }

    pub fn create(definition: &SensorDefinition) -> Result<BoxedSensor> {
        Ok(Box::new(Self::new(definition.settings_as()?)))
    }
}

impl Sensor for StaticValueSensor {
    fn run_sensor(&self, _definition: &SensorDefinition, result: &mut SensorResult) -> Result<()> {
        if let Some(value) = &self.config.value {
            result.set_value(value.clone());
        }
        if let Some(expected) = &self.config.expected_value {
            result.set_expected_value(expected.clone());
        }
        if let Some(status) = self.config.status {
            result.set_status(status);
        }
        if let Some(message) = &self.config.message {
            result.set_message(message.as_str(), MessageVars::new());
        }
        Ok(())
    }
}
