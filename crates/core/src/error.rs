//! Error taxonomy of the engine

use std::fmt;
use thiserror::Error;

/// Errors surfaced to the caller of a run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Sensor {0} does not exist")]
    NonExistingSensor(String),

    #[error("Sensor {0} is not enabled and must not be run")]
    DisabledSensor(String),

    #[error("Sensor {sensor} uses unknown sensor type {sensor_type}")]
    UnknownSensorType { sensor: String, sensor_type: String },

    #[error("Failed to construct sensor {sensor}: {message}")]
    SensorConstruction { sensor: String, message: String },
}

/// What went wrong while evaluating a single sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// `run_sensor` returned an error
    Execution,
    /// `run_sensor` panicked
    Panic,
    /// `run_sensor` did not return within its timeout
    Timeout,
    /// Deriving status or message panicked
    Compilation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Execution => "SensorExecutionFailure",
            FailureKind::Panic => "SensorPanic",
            FailureKind::Timeout => "SensorTimeout",
            FailureKind::Compilation => "CompilationFailure",
        }
    }

    /// Category reported to the error sink
    pub fn category(&self) -> &'static str {
        match self {
            FailureKind::Compilation => "sensor_compilation",
            _ => "sensor_execution",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-sensor failure.
///
/// Absorbed into that sensor's result (CRITICAL, message `<kind>: <message>`)
/// and reported to the error sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SensorFailure {
    pub sensor: String,
    pub kind: FailureKind,
    pub message: String,
}

impl SensorFailure {
    pub fn new(sensor: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            sensor: sensor.into(),
            kind,
            message: message.into(),
        }
    }

    /// Failure from a panic payload as caught by `catch_unwind`
    pub(crate) fn from_panic(
        sensor: &str,
        kind: FailureKind,
        payload: Box<dyn std::any::Any + Send>,
    ) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self::new(sensor, kind, message)
    }
}
