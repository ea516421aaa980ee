//! Configuration management

mod defaults;
mod settings;

pub use defaults::default_sensors;
pub use settings::{AppConfig, CONFIG_VERSION};
