//! vigil-types: Shared data types for the vigil sensor engine.
//!
//! This crate contains pure data types (sensor definitions, statuses,
//! scalar values, threshold configs, cache/log snapshots) shared across
//! all vigil crates. Nothing here performs I/O.

pub mod definition;
pub mod snapshot;
pub mod status;
pub mod threshold;
pub mod value;

// Re-export commonly used types at the crate root for convenience
pub use definition::SensorDefinition;
pub use snapshot::{CachedResult, LogEntry, LoggingMode};
pub use status::SensorStatus;
pub use threshold::{ThresholdConfig, ThresholdLevel, ThresholdLimit, ThresholdType};
pub use value::SensorValue;
