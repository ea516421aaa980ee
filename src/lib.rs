//! vigil: Pluggable health checks for hosts and services
//!
//! This library ties the engine crates together:
//! - Configuration management
//! - File-backed result cache and history log
//! - Periodic evaluation on a tokio runtime
//! - Text and JSON reporting

pub mod app;
pub mod config;
pub mod report;
pub mod scheduler;
pub mod storage;

// Re-export commonly used types
pub use app::App;
pub use config::AppConfig;
pub use scheduler::Scheduler;
