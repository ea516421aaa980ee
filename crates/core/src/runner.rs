//! Batch evaluation of sensors
//!
//! A batch is one pass: select sensors, preload the cache, evaluate each
//! sensor in selection order (cache hit or isolated invocation, then
//! compilation), write new cache entries, write history log entries, and
//! hand back every result. All results of a batch share one timestamp.

use crate::catalog::{CatalogEntry, SensorCatalog};
use crate::clock::Clock;
use crate::error::{EngineError, FailureKind, SensorFailure};
use crate::invoke::invoke;
use crate::result::SensorResult;
use crate::store::{CacheKey, CacheStore, ErrorSink, HistoryLog, LogErrorSink};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use vigil_types::{CachedResult, LogEntry, LoggingMode, SensorStatus};

/// Engine-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    pub logging_mode: LoggingMode,
    /// Timeout for sensors whose definition sets none; `None` disables it
    pub default_timeout: Option<Duration>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            logging_mode: LoggingMode::OnRequest,
            default_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Per-call flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Ignore cached results and invoke every selected sensor
    pub force: bool,
    /// Capture verbose output from sensors with extended info
    pub verbose: bool,
}

impl RunRequest {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

/// Results of one batch, in selection order
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    results: Vec<SensorResult>,
}

impl BatchResults {
    pub fn get(&self, sensor_name: &str) -> Option<&SensorResult> {
        self.results
            .iter()
            .find(|result| result.sensor_name() == sensor_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Most severe status in the batch; OK for an empty batch
    pub fn worst_status(&self) -> SensorStatus {
        self.results
            .iter()
            .map(SensorResult::status)
            .max_by_key(SensorStatus::severity)
            .unwrap_or(SensorStatus::Ok)
    }

    /// Count of results per status
    pub fn status_counts(&self) -> HashMap<SensorStatus, usize> {
        let mut counts = HashMap::new();
        for result in &self.results {
            *counts.entry(result.status()).or_insert(0) += 1;
        }
        counts
    }

    pub fn into_vec(self) -> Vec<SensorResult> {
        self.results
    }
}

impl IntoIterator for BatchResults {
    type Item = SensorResult;
    type IntoIter = std::vec::IntoIter<SensorResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Drives sensor evaluations against the injected stores
pub struct SensorRunner {
    catalog: Arc<SensorCatalog>,
    cache: Arc<dyn CacheStore>,
    history: Arc<dyn HistoryLog>,
    errors: Arc<dyn ErrorSink>,
    clock: Arc<dyn Clock>,
    options: RunnerOptions,
}

impl SensorRunner {
    pub fn new(
        catalog: Arc<SensorCatalog>,
        cache: Arc<dyn CacheStore>,
        history: Arc<dyn HistoryLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            cache,
            history,
            errors: Arc::new(LogErrorSink),
            clock,
            options: RunnerOptions::default(),
        }
    }

    pub fn with_error_sink(mut self, errors: Arc<dyn ErrorSink>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &SensorCatalog {
        &self.catalog
    }

    pub fn options(&self) -> RunnerOptions {
        self.options
    }

    /// Evaluate the named sensors, or every enabled sensor when `names` is
    /// empty.
    ///
    /// Naming an unknown or disabled sensor fails the whole call before
    /// anything runs. Failures of individual sensors never fail the call;
    /// they end up as CRITICAL results.
    pub fn run_sensors(
        &self,
        names: &[String],
        request: RunRequest,
    ) -> Result<BatchResults, EngineError> {
        let selected = self.select(names)?;
        let now = self.clock.now();
        debug!(
            "Running {} sensor(s) (force: {}, verbose: {})",
            selected.len(),
            request.force,
            request.verbose
        );

        let mut cached = if request.force {
            HashMap::new()
        } else {
            self.preload_cache(&selected)
        };

        let results: Vec<SensorResult> = selected
            .iter()
            .map(|entry| {
                let hit = cached.remove(&CacheKey::sensor(entry.name()));
                self.evaluate(entry, hit, now, request)
            })
            .collect();

        for (entry, result) in selected.iter().zip(&results) {
            if result.is_cached() {
                continue;
            }
            self.store_in_cache(entry, result, now);
            self.log_result(entry, result);
        }

        Ok(BatchResults { results })
    }

    /// Evaluate a single sensor
    pub fn run_sensor(&self, name: &str, request: RunRequest) -> Result<SensorResult, EngineError> {
        let batch = self.run_sensors(&[name.to_string()], request)?;
        batch
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::NonExistingSensor(name.to_string()))
    }

    /// Drop cached results of the named sensors, or of all sensors when
    /// `names` is empty
    pub fn reset_cache(&self, names: &[String]) -> anyhow::Result<()> {
        if names.is_empty() {
            info!("Clearing all cached sensor results");
            return self.cache.delete_all();
        }
        for name in names {
            debug!("Clearing cached result of sensor {}", name);
            self.cache.delete(&CacheKey::sensor(name.as_str()))?;
        }
        Ok(())
    }

    fn select(&self, names: &[String]) -> Result<Vec<&CatalogEntry>, EngineError> {
        if names.is_empty() {
            return Ok(self.catalog.enabled().collect());
        }
        names
            .iter()
            .map(|name| {
                let entry = self
                    .catalog
                    .get(name)
                    .ok_or_else(|| EngineError::NonExistingSensor(name.clone()))?;
                if !entry.definition().enabled {
                    return Err(EngineError::DisabledSensor(name.clone()));
                }
                Ok(entry)
            })
            .collect()
    }

    fn preload_cache(&self, selected: &[&CatalogEntry]) -> HashMap<CacheKey, CachedResult> {
        let keys: Vec<CacheKey> = selected
            .iter()
            .filter(|entry| entry.definition().is_cacheable())
            .map(|entry| CacheKey::sensor(entry.name()))
            .collect();
        if keys.is_empty() {
            return HashMap::new();
        }

        match self.cache.get_multiple(&keys) {
            Ok(found) => {
                debug!("{} of {} cacheable sensor(s) served from cache", found.len(), keys.len());
                found
            }
            Err(e) => {
                warn!("Failed to read sensor result cache, running uncached: {:#}", e);
                HashMap::new()
            }
        }
    }

    fn evaluate(
        &self,
        entry: &CatalogEntry,
        hit: Option<CachedResult>,
        now: DateTime<Utc>,
        request: RunRequest,
    ) -> SensorResult {
        let definition = entry.definition();
        let mut result = match hit {
            Some(cached) => SensorResult::from_cache(entry.name(), cached),
            None => SensorResult::new(entry.name(), now),
        };

        if !result.is_cached() {
            let invocation = invoke(entry, result, self.timeout_for(entry));
            result = invocation.result;
            if let Some(failure) = invocation.failure {
                self.errors.report(failure.kind.category(), &failure);
                result.mark_failed(&failure);
            }
            result.set_execution_time(invocation.elapsed);

            if request.verbose {
                if let Some(info) = entry.sensor().extended_info() {
                    let output = info.result_verbose(&result);
                    result.set_verbose_output(output);
                }
            }
        }

        self.compile_isolated(entry, &mut result, |result| result.compile(definition));

        debug!(
            "Sensor {}: {} ({}){}",
            entry.name(),
            result.status(),
            result.message(),
            if result.is_cached() { " [cached]" } else { "" }
        );
        result
    }

    /// Run `compile` on `result`; a panic turns the result CRITICAL
    fn compile_isolated(
        &self,
        entry: &CatalogEntry,
        result: &mut SensorResult,
        compile: impl FnOnce(&mut SensorResult),
    ) {
        let compiled = panic::catch_unwind(AssertUnwindSafe(|| compile(result)));
        if let Err(payload) = compiled {
            let failure =
                SensorFailure::from_panic(entry.name(), FailureKind::Compilation, payload);
            self.errors.report(failure.kind.category(), &failure);
            result.mark_failed(&failure);
            result.seal();
        }
    }

    fn timeout_for(&self, entry: &CatalogEntry) -> Option<Duration> {
        entry
            .definition()
            .timeout_secs
            .map(Duration::from_secs)
            .or(self.options.default_timeout)
            .filter(|timeout| !timeout.is_zero())
    }

    fn store_in_cache(&self, entry: &CatalogEntry, result: &SensorResult, now: DateTime<Utc>) {
        let definition = entry.definition();
        if !definition.is_cacheable() {
            return;
        }
        let seconds = i64::try_from(definition.caching_time).unwrap_or(i64::MAX);
        let expires_at = chrono::Duration::try_seconds(seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if let Err(e) = self
            .cache
            .set(&CacheKey::sensor(entry.name()), result.to_cached(), expires_at)
        {
            warn!("Failed to cache result of sensor {}: {:#}", entry.name(), e);
        }
    }

    fn log_result(&self, entry: &CatalogEntry, result: &SensorResult) {
        if !self.should_log(entry, result) {
            return;
        }
        let log_entry = LogEntry::new(entry.name(), result.to_cached());
        if let Err(e) = self.history.append(&log_entry) {
            warn!("Failed to log result of sensor {}: {:#}", entry.name(), e);
        }
    }

    /// Logging policy.
    ///
    /// In `on_request` mode the comparison is against the last *persisted*
    /// status, not the last computed one.
    fn should_log(&self, entry: &CatalogEntry, result: &SensorResult) -> bool {
        match self.options.logging_mode {
            LoggingMode::None => false,
            LoggingMode::All => true,
            LoggingMode::OnRequest => {
                if entry.definition().result_logging {
                    return true;
                }
                match self.history.last_status(entry.name()) {
                    Ok(last) => last != Some(result.status()),
                    Err(e) => {
                        warn!(
                            "Failed to read last logged status of sensor {}, logging anyway: {:#}",
                            entry.name(),
                            e
                        );
                        true
                    }
                }
            }
        }
    }
}
