//! Sensor trait and related types

use crate::result::SensorResult;
use anyhow::Result;
use vigil_types::SensorDefinition;

/// Trait for all sensors
///
/// A sensor inspects some part of the system and records its reading on
/// the result it is handed. It may also set an expected value, an explicit
/// status or status messages; anything it leaves unset is derived later by
/// the result compiler from the definition's thresholds.
pub trait Sensor: Send + Sync {
    /// Take one reading.
    ///
    /// Errors and panics are isolated by the runner and turn the result
    /// CRITICAL; they never abort the surrounding batch.
    fn run_sensor(&self, definition: &SensorDefinition, result: &mut SensorResult) -> Result<()>;

    /// Diagnostic rendering capability, if this sensor has one
    fn extended_info(&self) -> Option<&dyn ExtendedInfo> {
        None
    }
}

/// Optional capability for sensors that can explain a result in detail
pub trait ExtendedInfo {
    /// Verbose, human-readable output for a freshly evaluated result
    fn result_verbose(&self, result: &SensorResult) -> String;
}

/// Type-erased sensor for dynamic dispatch
pub type BoxedSensor = Box<dyn Sensor>;
