//! Wiring of configuration, registry, stores and runner

use crate::config::AppConfig;
use crate::storage::{FileCacheStore, JsonlHistoryLog};
use anyhow::{Context, Result};
use log::debug;
use std::sync::Arc;
use vigil_core::{Clock, Registry, SensorCatalog, SensorRunner, SystemClock};

pub struct App {
    config: AppConfig,
    registry: Registry,
    runner: Arc<SensorRunner>,
    history: Arc<JsonlHistoryLog>,
}

impl App {
    /// Build the registry with the built-in sensors, instantiate the
    /// configured ones and open the file stores
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut registry = Registry::new();
        vigil_sensors::register_all(&mut registry);

        let catalog = SensorCatalog::from_registry(config.sensors.iter().cloned(), &registry)
            .context("Invalid sensor configuration")?;
        debug!("Catalog holds {} sensors", catalog.len());

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(FileCacheStore::open(config.cache_path()?, clock.clone())?);
        let history = Arc::new(JsonlHistoryLog::open(config.history_path()?)?);

        let runner = SensorRunner::new(Arc::new(catalog), cache, history.clone(), clock)
            .with_options(config.runner_options());

        Ok(Self {
            config,
            registry,
            runner: Arc::new(runner),
            history,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn runner(&self) -> &Arc<SensorRunner> {
        &self.runner
    }

    pub fn catalog(&self) -> &SensorCatalog {
        self.runner.catalog()
    }

    pub fn history(&self) -> &JsonlHistoryLog {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{EngineError, RunRequest, SensorStatus};
    use vigil_types::{LoggingMode, SensorDefinition};

    fn config(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            logging_mode: LoggingMode::OnRequest,
            cache_path: Some(dir.join("cache.json")),
            history_path: Some(dir.join("history.jsonl")),
            sensors: vec![
                SensorDefinition::new("flag", "static_value")
                    .with_caching_time(600)
                    .with_setting("value", "on")
                    .with_setting("expected_value", "on"),
                SensorDefinition::new("broken", "static_value")
                    .with_setting("value", "off")
                    .with_setting("expected_value", "on"),
            ],
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_run_persists_cache_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(config(dir.path())).unwrap();

        let batch = app.runner().run_sensors(&[], RunRequest::default()).unwrap();
        assert_eq!(batch.worst_status(), SensorStatus::Critical);
        assert!(dir.path().join("cache.json").exists());
        assert_eq!(app.history().entries_for("broken", 10).unwrap().len(), 1);

        // A second process sees the cached result
        let again = App::new(config(dir.path())).unwrap();
        let flag = again.runner().run_sensor("flag", RunRequest::default()).unwrap();
        assert!(flag.is_cached());
        assert!(flag.is_ok());
    }

    #[test]
    fn test_wrong_shaped_limits_never_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let json = r#"{
            "logging_mode": "none",
            "sensors": [{
                "name": "load",
                "sensor_type": "static_value",
                "settings": { "value": 75 },
                "thresholds": {
                    "type": "exceeds",
                    "levels": [
                        { "status": "CRITICAL", "limit": "ten" },
                        { "status": "CRITICAL", "limit": [60] },
                        { "status": "WARNING", "limit": 70 }
                    ]
                }
            }]
        }"#;
        std::fs::write(&path, json).unwrap();

        let mut config = AppConfig::load_from_path(&path).unwrap();
        config.cache_path = Some(dir.path().join("cache.json"));
        config.history_path = Some(dir.path().join("history.jsonl"));
        let app = App::new(config).unwrap();

        let result = app.runner().run_sensor("load", RunRequest::default()).unwrap();
        assert_eq!(result.status(), SensorStatus::Warning);
        assert!(result.message().contains("exceeds 70"));
    }

    #[test]
    fn test_unknown_sensor_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.sensors.push(SensorDefinition::new("odd", "does_not_exist"));

        let err = App::new(config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::UnknownSensorType { .. })
        ));
    }
}
