//! Rendering of batch results for the terminal

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use vigil_core::{BatchResults, LogEntry, SensorCatalog, SensorResult, SensorStatus, SensorValue};

/// Serializable view of one result
#[derive(Debug, Serialize)]
pub struct ResultView<'a> {
    pub sensor: &'a str,
    pub label: &'a str,
    pub status: SensorStatus,
    pub value: Option<&'a SensorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<&'a SensorValue>,
    pub message: &'a str,
    pub execution_time_ms: f64,
    pub timestamp: DateTime<Utc>,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose_output: Option<&'a str>,
}

impl<'a> ResultView<'a> {
    pub fn new(result: &'a SensorResult, catalog: &'a SensorCatalog) -> Self {
        let label = catalog
            .definition(result.sensor_name())
            .map(|definition| definition.display_label())
            .unwrap_or(result.sensor_name());
        Self {
            sensor: result.sensor_name(),
            label,
            status: result.status(),
            value: result.value(),
            expected_value: result.expected_value(),
            message: result.message(),
            execution_time_ms: result.execution_time_ms(),
            timestamp: result.timestamp(),
            cached: result.is_cached(),
            verbose_output: result.verbose_output(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchView<'a> {
    status: SensorStatus,
    results: Vec<ResultView<'a>>,
}

pub fn to_json(batch: &BatchResults, catalog: &SensorCatalog) -> Result<String> {
    let view = BatchView {
        status: batch.worst_status(),
        results: batch.iter().map(|result| ResultView::new(result, catalog)).collect(),
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

/// One line per result, verbose output indented below it, then a summary
pub fn to_text(batch: &BatchResults, catalog: &SensorCatalog) -> String {
    let width = batch
        .iter()
        .map(|result| ResultView::new(result, catalog).label.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for result in batch.iter() {
        let view = ResultView::new(result, catalog);
        let _ = write!(
            out,
            "{:<8} {:<width$}  {}",
            view.status.as_str(),
            view.label,
            view.message,
            width = width
        );
        if view.cached {
            out.push_str(" (cached)");
        } else {
            let _ = write!(out, " ({:.1} ms)", view.execution_time_ms);
        }
        out.push('\n');
        if let Some(verbose) = view.verbose_output {
            for line in verbose.lines() {
                let _ = writeln!(out, "    {}", line);
            }
        }
    }
    out.push_str(&summary(batch));
    out.push('\n');
    out
}

/// e.g. `4 sensors: 1 CRITICAL, 3 OK`
pub fn summary(batch: &BatchResults) -> String {
    let counts = batch.status_counts();
    let parts: Vec<String> = SensorStatus::ALL
        .iter()
        .filter_map(|status| counts.get(status).map(|count| format!("{} {}", count, status)))
        .collect();
    let noun = if batch.len() == 1 { "sensor" } else { "sensors" };
    if parts.is_empty() {
        format!("{} {}", batch.len(), noun)
    } else {
        format!("{} {}: {}", batch.len(), noun, parts.join(", "))
    }
}

pub fn history_to_text(entries: &[LogEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{}  {:<8} {}",
            entry.result.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.status().as_str(),
            entry.result.message
        );
    }
    out
}
