//! Sensor results and their compilation into a final status and message

use crate::error::SensorFailure;
use crate::message::{render_message, MessageVars};
use crate::threshold::match_threshold;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use vigil_types::{CachedResult, SensorDefinition, SensorStatus, SensorValue};

/// Timestamp format used for the `@time` placeholder
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A message template with its own variables
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub variables: MessageVars,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, variables: MessageVars) -> Self {
        Self {
            text: text.into(),
            variables,
        }
    }
}

/// The result of one sensor evaluation, fresh or restored from the cache.
///
/// A result restored from the cache reports `is_cached() == true` until a
/// mutator is called on it; from then on it is a fresh result for good.
#[derive(Debug, Clone)]
pub struct SensorResult {
    sensor_name: String,
    value: Option<SensorValue>,
    expected_value: Option<SensorValue>,
    status: SensorStatus,
    message: String,
    explicit_message: Option<StatusMessage>,
    status_messages: Vec<StatusMessage>,
    execution_time_ms: f64,
    timestamp: DateTime<Utc>,
    cached: bool,
    compiled: bool,
    verbose_output: Option<String>,
    deadline: Option<Instant>,
}

impl SensorResult {
    /// Fresh result: UNKNOWN, not cached, evaluated at `timestamp`
    pub fn new(sensor_name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            value: None,
            expected_value: None,
            status: SensorStatus::Unknown,
            message: String::new(),
            explicit_message: None,
            status_messages: Vec::new(),
            execution_time_ms: 0.0,
            timestamp,
            cached: false,
            compiled: false,
            verbose_output: None,
            deadline: None,
        }
    }

    /// Rebuild a result from a cache entry.
    ///
    /// The cached status and message are final, so the result counts as
    /// compiled already.
    pub fn from_cache(sensor_name: impl Into<String>, entry: CachedResult) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            value: entry.value,
            expected_value: entry.expected_value,
            status: entry.status,
            message: entry.message,
            explicit_message: None,
            status_messages: Vec::new(),
            execution_time_ms: entry.execution_time_ms,
            timestamp: entry.timestamp,
            cached: true,
            compiled: true,
            verbose_output: None,
            deadline: None,
        }
    }

    /// Flattened fields for the cache and the history log
    pub fn to_cached(&self) -> CachedResult {
        CachedResult {
            value: self.value.clone(),
            expected_value: self.expected_value.clone(),
            status: self.status,
            message: self.message.clone(),
            execution_time_ms: self.execution_time_ms,
            timestamp: self.timestamp,
        }
    }

    pub fn sensor_name(&self) -> &str {
        &self.sensor_name
    }

    pub fn value(&self) -> Option<&SensorValue> {
        self.value.as_ref()
    }

    pub fn expected_value(&self) -> Option<&SensorValue> {
        self.expected_value.as_ref()
    }

    pub fn status(&self) -> SensorStatus {
        self.status
    }

    /// Composed message; empty until the result is compiled
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_messages(&self) -> &[StatusMessage] {
        &self.status_messages
    }

    pub fn execution_time_ms(&self) -> f64 {
        self.execution_time_ms
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn verbose_output(&self) -> Option<&str> {
        self.verbose_output.as_deref()
    }

    /// When the runner stops waiting for this evaluation, if it ever does.
    /// Sensors that start external work should not let it outlive this.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_ok(&self) -> bool {
        self.status == SensorStatus::Ok
    }

    pub fn is_warning(&self) -> bool {
        self.status == SensorStatus::Warning
    }

    pub fn is_critical(&self) -> bool {
        self.status == SensorStatus::Critical
    }

    pub fn is_unknown(&self) -> bool {
        self.status == SensorStatus::Unknown
    }

    // Mutators. Each one turns a cached result into a fresh one.

    pub fn set_value(&mut self, value: impl Into<SensorValue>) {
        self.cached = false;
        self.value = Some(value.into());
    }

    pub fn set_expected_value(&mut self, value: impl Into<SensorValue>) {
        self.cached = false;
        self.expected_value = Some(value.into());
    }

    pub fn set_status(&mut self, status: SensorStatus) {
        self.cached = false;
        self.status = status;
    }

    /// Set the explicit message. It replaces the composed message entirely.
    pub fn set_message(&mut self, text: impl Into<String>, variables: MessageVars) {
        self.cached = false;
        self.explicit_message = Some(StatusMessage::new(text, variables));
    }

    /// Queue a message to be appended to the composed message
    pub fn add_status_message(&mut self, text: impl Into<String>, variables: MessageVars) {
        self.cached = false;
        self.status_messages.push(StatusMessage::new(text, variables));
    }

    pub fn set_execution_time(&mut self, elapsed: Duration) {
        self.cached = false;
        self.execution_time_ms = elapsed.as_secs_f64() * 1000.0;
    }

    pub fn set_verbose_output(&mut self, output: impl Into<String>) {
        self.cached = false;
        self.verbose_output = Some(output.into());
    }

    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Force the result CRITICAL with the failure as its explicit message
    pub(crate) fn mark_failed(&mut self, failure: &SensorFailure) {
        self.set_status(SensorStatus::Critical);
        self.message = failure.to_string();
        self.explicit_message = Some(StatusMessage::new(failure.to_string(), MessageVars::new()));
    }

    /// Seal a result whose compilation blew up: keep what `mark_failed` set
    pub(crate) fn seal(&mut self) {
        if self.value.is_none() {
            self.value = Some(SensorValue::Text(self.status.as_str().to_string()));
        }
        self.compiled = true;
    }

    /// Derive the final status and message.
    ///
    /// Runs at most once per result; compiling a compiled (or cached)
    /// result changes nothing. When the status is still UNKNOWN it is
    /// assessed from the definition's thresholds, or else from the
    /// expected value. An unset value then defaults to the status code, and
    /// the message is composed from the value, the expected value and the
    /// status messages, unless the sensor set an explicit message.
    pub fn compile(&mut self, definition: &SensorDefinition) {
        if self.compiled {
            return;
        }

        if self.status == SensorStatus::Unknown {
            self.assess(definition);
        }

        if self.value.is_none() {
            self.value = Some(SensorValue::Text(self.status.as_str().to_string()));
        }

        self.message = self.compose_message(definition);
        self.compiled = true;
    }

    fn assess(&mut self, definition: &SensorDefinition) {
        if let Some(thresholds) = &definition.thresholds {
            let number = self.value.as_ref().map(SensorValue::to_number).unwrap_or(0.0);
            let matched = match_threshold(number, thresholds.threshold_type, &thresholds.levels);
            self.status = matched.status;
            if let Some(message) = matched.message {
                self.status_messages
                    .push(StatusMessage::new(message, MessageVars::new()));
            }
        } else if let Some(expected) = &self.expected_value {
            let matches = self
                .value
                .as_ref()
                .is_some_and(|value| value.loosely_equals(expected));
            self.status = if matches {
                SensorStatus::Ok
            } else {
                SensorStatus::Critical
            };
        }
    }

    fn default_vars(&self, definition: &SensorDefinition) -> MessageVars {
        let render = |value: &Option<SensorValue>| {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        };
        MessageVars::new()
            .with("sensor", definition.display_label())
            .with("value", render(&self.value))
            .with("time", self.timestamp.format(TIME_FORMAT))
            .with("expected", render(&self.expected_value))
    }

    fn compose_message(&self, definition: &SensorDefinition) -> String {
        let defaults = self.default_vars(definition);

        if let Some(explicit) = &self.explicit_message {
            return render_message(&explicit.text, &defaults.merged(&explicit.variables));
        }

        let mut parts = Vec::with_capacity(self.status_messages.len() + 2);
        if self.value.is_some() {
            parts.push(render_message("Value @value", &defaults));
        }
        if self.expected_value.is_some() {
            parts.push(render_message("expected @expected", &defaults));
        }
        for status_message in &self.status_messages {
            parts.push(render_message(
                &status_message.text,
                &defaults.merged(&status_message.variables),
            ));
        }
        parts.join(", ")
    }
}
