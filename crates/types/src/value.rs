//! Scalar readings produced by sensors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw sensor reading
///
/// Serialized untagged so that config files and cache entries carry plain
/// JSON scalars (`true`, `42`, `3.5`, `"text"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SensorValue {
    /// Reduce the value to a number.
    ///
    /// Numbers are returned unchanged. Everything else goes through an
    /// integer cast: booleans become 0/1 and strings yield their leading
    /// integer (`"42"` -> 42, `"7 items"` -> 7, `"abc"` -> 0).
    pub fn to_number(&self) -> f64 {
        match self {
            SensorValue::Int(i) => *i as f64,
            SensorValue::Float(f) => *f,
            SensorValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            SensorValue::Text(s) => leading_integer(s) as f64,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SensorValue::Int(_) | SensorValue::Float(_))
    }

    /// Equality used for expected-value assessment.
    ///
    /// Numbers compare by value regardless of representation, so `5`
    /// equals `5.0`, and numeric text compares against numbers. Other
    /// mixed pairs compare by their rendered form.
    pub fn loosely_equals(&self, other: &SensorValue) -> bool {
        match (self, other) {
            (SensorValue::Text(a), SensorValue::Text(b)) => a == b,
            (SensorValue::Bool(a), SensorValue::Bool(b)) => a == b,
            (SensorValue::Text(text), number) | (number, SensorValue::Text(text))
                if number.is_numeric() =>
            {
                text.trim()
                    .parse::<f64>()
                    .map(|parsed| parsed == number.to_number())
                    .unwrap_or(false)
            }
            (a, b) if !matches!(a, SensorValue::Text(_)) && !matches!(b, SensorValue::Text(_)) => {
                a.to_number() == b.to_number()
            }
            (a, b) => a.to_string() == b.to_string(),
        }
    }
}

/// Integer prefix of a string, the way a loose integer cast reads it
fn leading_integer(s: &str) -> i64 {
    let trimmed = s.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return 0;
    }

    let magnitude = &digits[..end];
    let parsed = if negative {
        format!("-{}", magnitude).parse::<i64>()
    } else {
        magnitude.parse::<i64>()
    };
    parsed.unwrap_or(if negative { i64::MIN } else { i64::MAX })
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Bool(true) => f.write_str("TRUE"),
            SensorValue::Bool(false) => f.write_str("FALSE"),
            SensorValue::Int(i) => write!(f, "{}", i),
            SensorValue::Float(v) => write!(f, "{}", v),
            SensorValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SensorValue {
    fn from(value: bool) -> Self {
        SensorValue::Bool(value)
    }
}

impl From<i32> for SensorValue {
    fn from(value: i32) -> Self {
        SensorValue::Int(value.into())
    }
}

impl From<i64> for SensorValue {
    fn from(value: i64) -> Self {
        SensorValue::Int(value)
    }
}

impl From<u32> for SensorValue {
    fn from(value: u32) -> Self {
        SensorValue::Int(value.into())
    }
}

impl From<u64> for SensorValue {
    fn from(value: u64) -> Self {
        SensorValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f32> for SensorValue {
    fn from(value: f32) -> Self {
        SensorValue::Float(value.into())
    }
}

impl From<f64> for SensorValue {
    fn from(value: f64) -> Self {
        SensorValue::Float(value)
    }
}

impl From<&str> for SensorValue {
    fn from(value: &str) -> Self {
        SensorValue::Text(value.to_string())
    }
}

impl From<String> for SensorValue {
    fn from(value: String) -> Self {
        SensorValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_number() {
        assert_eq!(SensorValue::from(true).to_number(), 1.0);
        assert_eq!(SensorValue::from(false).to_number(), 0.0);
        assert_eq!(SensorValue::from("42").to_number(), 42.0);
        assert_eq!(SensorValue::from(3.5).to_number(), 3.5);
        assert_eq!(SensorValue::from(-7).to_number(), -7.0);
    }

    #[test]
    fn test_to_number_casts_text_through_integer() {
        assert_eq!(SensorValue::from("3.9").to_number(), 3.0);
        assert_eq!(SensorValue::from("  -12 apples").to_number(), -12.0);
        assert_eq!(SensorValue::from("apples").to_number(), 0.0);
        assert_eq!(SensorValue::from("").to_number(), 0.0);
    }

    #[test]
    fn test_display_renders_booleans_as_words() {
        assert_eq!(SensorValue::from(true).to_string(), "TRUE");
        assert_eq!(SensorValue::from(false).to_string(), "FALSE");
        assert_eq!(SensorValue::from(10.0).to_string(), "10");
        assert_eq!(SensorValue::from(2.25).to_string(), "2.25");
    }

    #[test]
    fn test_loosely_equals() {
        assert!(SensorValue::from(5).loosely_equals(&SensorValue::from(5.0)));
        assert!(SensorValue::from("5").loosely_equals(&SensorValue::from(5)));
        assert!(SensorValue::from(true).loosely_equals(&SensorValue::from(1)));
        assert!(!SensorValue::from("enabled").loosely_equals(&SensorValue::from("disabled")));
        assert!(!SensorValue::from("five").loosely_equals(&SensorValue::from(5)));
    }

    #[test]
    fn test_untagged_deserialization() {
        let values: Vec<SensorValue> = serde_json::from_str(r#"[true, 42, 3.5, "up"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                SensorValue::Bool(true),
                SensorValue::Int(42),
                SensorValue::Float(3.5),
                SensorValue::Text("up".to_string()),
            ]
        );
    }
}
