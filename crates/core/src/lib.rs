//! vigil-core: Sensor execution and result compilation engine.
//!
//! This crate contains the `Sensor` trait, the sensor-type `Registry`,
//! the threshold evaluator, the result compiler and the `SensorRunner`
//! that drives batch evaluations against injected cache, history log,
//! error sink and clock implementations.

mod catalog;
mod clock;
mod error;
mod invoke;
mod message;
mod registry;
mod result;
mod runner;
mod sensor;
mod store;
pub mod threshold;

pub use catalog::{CatalogEntry, SensorCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, FailureKind, SensorFailure};
pub use message::{render_message, MessageVars};
pub use registry::{Registry, SensorFactory, SensorTypeInfo};
pub use result::{SensorResult, StatusMessage};
pub use runner::{BatchResults, RunRequest, RunnerOptions, SensorRunner};
pub use sensor::{BoxedSensor, ExtendedInfo, Sensor};
pub use store::{
    CacheKey, CacheStore, ErrorSink, HistoryLog, LogErrorSink, MemoryCacheStore,
    MemoryHistoryLog,
};
pub use threshold::{match_threshold, ThresholdMatch};

// Re-export types used in trait signatures for convenience
pub use vigil_types::{
    CachedResult, LogEntry, LoggingMode, SensorDefinition, SensorStatus, SensorValue,
    ThresholdConfig, ThresholdLevel, ThresholdLimit, ThresholdType,
};
