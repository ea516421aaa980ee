//! Registry of sensor implementations

use crate::error::EngineError;
use crate::sensor::BoxedSensor;
use std::collections::HashMap;
use vigil_types::SensorDefinition;

/// Function that creates a sensor for a definition
pub type SensorFactory = fn(&SensorDefinition) -> anyhow::Result<BoxedSensor>;

/// Descriptive information about a sensor type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorTypeInfo {
    /// Unique identifier referenced by `SensorDefinition::sensor_type`
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub description: String,
}

/// Registry mapping sensor type IDs to factories.
///
/// Built once at startup; sensors are instantiated from it when the
/// catalog is assembled, never looked up by name at evaluation time.
#[derive(Default)]
pub struct Registry {
    sensor_types: HashMap<String, (SensorTypeInfo, SensorFactory)>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensor type
    pub fn register_sensor_type(&mut self, id: &str, factory: SensorFactory) {
        self.register_sensor_type_with_info(id, id, "", factory);
    }

    /// Register a sensor type with a display name and description
    pub fn register_sensor_type_with_info(
        &mut self,
        id: &str,
        name: &str,
        description: &str,
        factory: SensorFactory,
    ) {
        let info = SensorTypeInfo {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        };
        if self
            .sensor_types
            .insert(id.to_string(), (info, factory))
            .is_some()
        {
            log::warn!("Sensor type {} registered twice, keeping the latest", id);
        }
    }

    /// Create the sensor for a definition
    pub fn create_sensor(&self, definition: &SensorDefinition) -> Result<BoxedSensor, EngineError> {
        let (_, factory) = self.sensor_types.get(&definition.sensor_type).ok_or_else(|| {
            EngineError::UnknownSensorType {
                sensor: definition.name.clone(),
                sensor_type: definition.sensor_type.clone(),
            }
        })?;
        factory(definition).map_err(|e| EngineError::SensorConstruction {
            sensor: definition.name.clone(),
            message: format!("{:#}", e),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sensor_types.contains_key(id)
    }

    /// All registered sensor types, sorted by ID
    pub fn list_sensor_types(&self) -> Vec<SensorTypeInfo> {
        let mut types: Vec<_> = self
            .sensor_types
            .values()
            .map(|(info, _)| info.clone())
            .collect();
        types.sort_by(|a, b| a.id.cmp(&b.id));
        types
    }

    pub fn get_sensor_type_info(&self, id: &str) -> Option<&SensorTypeInfo> {
        self.sensor_types.get(id).map(|(info, _)| info)
    }
}
