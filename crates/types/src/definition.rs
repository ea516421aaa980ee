//! Sensor definitions as stored in the configuration

use crate::threshold::ThresholdConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read-only description of one configured sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDefinition {
    /// Unique key of this sensor
    pub name: String,
    /// Registry ID of the implementation (e.g. "disk_usage")
    pub sensor_type: String,
    /// Human-readable name; falls back to `name` when empty
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds a result stays valid in the cache (0 = never cache)
    #[serde(default)]
    pub caching_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdConfig>,
    /// Log every non-cached result, not only status changes
    #[serde(default)]
    pub result_logging: bool,
    /// Overrides the engine-wide sensor timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Implementation-specific settings
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
}

fn default_category() -> String {
    "Other".to_string()
}

fn default_enabled() -> bool {
    true
}

impl SensorDefinition {
    /// Create an enabled, uncached definition without thresholds
    pub fn new(name: impl Into<String>, sensor_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sensor_type: sensor_type.into(),
            label: String::new(),
            description: String::new(),
            category: default_category(),
            enabled: true,
            caching_time: 0,
            thresholds: None,
            result_logging: false,
            timeout_secs: None,
            settings: Map::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_caching_time(mut self, seconds: u64) -> Self {
        self.caching_time = seconds;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdConfig) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    pub fn with_result_logging(mut self, enabled: bool) -> Self {
        self.result_logging = enabled;
        self
    }

    pub fn with_timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = Some(seconds);
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Label for display, falling back to the sensor name
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    pub fn is_cacheable(&self) -> bool {
        self.caching_time > 0
    }

    /// Deserialize the settings map into a typed config.
    ///
    /// Missing keys fall back to the config's serde defaults.
    pub fn settings_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.settings.clone()))
    }
}
