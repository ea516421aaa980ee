//! File-backed stores for the sensor runner

mod file_cache;
mod history;

pub use file_cache::FileCacheStore;
pub use history::JsonlHistoryLog;
