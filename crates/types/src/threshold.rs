//! Threshold configuration attached to sensor definitions

use crate::status::SensorStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicate used to map a numeric reading to a severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdType {
    /// Matches when the value is greater than the limit
    Exceeds,
    /// Matches when the value is lower than the limit
    Falls,
    /// Matches when the value lies strictly inside `[low, high]`
    InnerInterval,
    /// Matches when the value lies outside `[low, high]`
    OuterInterval,
}

impl ThresholdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdType::Exceeds => "exceeds",
            ThresholdType::Falls => "falls",
            ThresholdType::InnerInterval => "inner_interval",
            ThresholdType::OuterInterval => "outer_interval",
        }
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, ThresholdType::InnerInterval | ThresholdType::OuterInterval)
    }
}

impl fmt::Display for ThresholdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limit for one severity level.
///
/// In JSON a single limit is a number (or `null`), an interval is a
/// two-element array `[low, high]` whose bounds may be `null`. Anything
/// else is kept as `Malformed` so the rest of the config still loads; such
/// a level never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdLimit {
    Interval(Option<f64>, Option<f64>),
    Value(Option<f64>),
    Malformed(serde_json::Value),
}

impl ThresholdLimit {
    pub fn is_malformed(&self) -> bool {
        matches!(self, ThresholdLimit::Malformed(_))
    }
}

/// One severity with its limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdLevel {
    pub status: SensorStatus,
    pub limit: ThresholdLimit,
}

/// Threshold type plus severity levels, checked in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(rename = "type")]
    pub threshold_type: ThresholdType,
    /// Most severe level first; the first matching level wins
    #[serde(default)]
    pub levels: Vec<ThresholdLevel>,
}

impl ThresholdConfig {
    pub fn new(threshold_type: ThresholdType) -> Self {
        Self {
            threshold_type,
            levels: Vec::new(),
        }
    }

    /// Append a single-limit level
    pub fn with_limit(mut self, status: SensorStatus, limit: f64) -> Self {
        self.levels.push(ThresholdLevel {
            status,
            limit: ThresholdLimit::Value(Some(limit)),
        });
        self
    }

    /// Append an interval level
    pub fn with_interval(mut self, status: SensorStatus, low: f64, high: f64) -> Self {
        self.levels.push(ThresholdLevel {
            status,
            limit: ThresholdLimit::Interval(Some(low), Some(high)),
        });
        self
    }

    /// Append a level with an arbitrary limit, including malformed ones
    pub fn with_level(mut self, status: SensorStatus, limit: ThresholdLimit) -> Self {
        self.levels.push(ThresholdLevel { status, limit });
        self
    }
}
