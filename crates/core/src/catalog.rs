//! The set of configured sensors, instantiated once

use crate::error::EngineError;
use crate::registry::Registry;
use crate::sensor::Sensor;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use vigil_types::SensorDefinition;

/// A definition together with its sensor instance
#[derive(Clone)]
pub struct CatalogEntry {
    definition: Arc<SensorDefinition>,
    sensor: Arc<dyn Sensor>,
}

impl CatalogEntry {
    pub fn definition(&self) -> &SensorDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn sensor(&self) -> &dyn Sensor {
        self.sensor.as_ref()
    }

    /// Whether the sensor can render verbose output
    pub fn is_extended_info(&self) -> bool {
        self.sensor.extended_info().is_some()
    }

    pub(crate) fn shared_definition(&self) -> Arc<SensorDefinition> {
        Arc::clone(&self.definition)
    }

    pub(crate) fn shared_sensor(&self) -> Arc<dyn Sensor> {
        Arc::clone(&self.sensor)
    }
}

/// Ordered, read-only view of the configured sensors
#[derive(Clone, Default)]
pub struct SensorCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl SensorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every definition through the registry
    pub fn from_registry(
        definitions: impl IntoIterator<Item = SensorDefinition>,
        registry: &Registry,
    ) -> Result<Self, EngineError> {
        let mut catalog = Self::new();
        for definition in definitions {
            let sensor = registry.create_sensor(&definition)?;
            debug!(
                "Created sensor {} of type {}",
                definition.name, definition.sensor_type
            );
            catalog.insert(definition, Arc::from(sensor));
        }
        Ok(catalog)
    }

    /// Add a sensor, replacing any existing one with the same name in place
    pub fn insert(&mut self, definition: SensorDefinition, sensor: Arc<dyn Sensor>) {
        let entry = CatalogEntry {
            definition: Arc::new(definition),
            sensor,
        };
        match self.index.get(entry.name()) {
            Some(&position) => self.entries[position] = entry,
            None => {
                self.index.insert(entry.name().to_string(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_sensor(
        mut self,
        definition: SensorDefinition,
        sensor: impl Sensor + 'static,
    ) -> Self {
        self.insert(definition, Arc::new(sensor));
        self
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    pub fn definition(&self, name: &str) -> Option<&SensorDefinition> {
        self.get(name).map(CatalogEntry::definition)
    }

    /// All entries in configuration order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Enabled entries in configuration order
    pub fn enabled(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|entry| entry.definition.enabled)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
