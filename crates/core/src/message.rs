//! Placeholder substitution for result messages

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Matches `@name` placeholders
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern is valid"));

/// Variables available to a message template, keyed without the `@`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageVars(BTreeMap<String, String>);

impl MessageVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Display) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Copy of `self` overlaid with `other`; `other` wins on conflicts
    pub fn merged(&self, other: &MessageVars) -> MessageVars {
        let mut merged = self.clone();
        merged
            .0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Replace every known `@name` in `template`; unknown placeholders stay as-is.
///
/// Substitution is a single pass, so substituted text is never expanded
/// again.
pub fn render_message(template: &str, vars: &MessageVars) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_known_and_unknown_placeholders() {
        let vars = MessageVars::new().with("count", 3).with("sensor", "queue");
        assert_eq!(
            render_message("@count items in @sensor, see @docs", &vars),
            "3 items in queue, see @docs"
        );
    }

    #[test]
    fn test_render_is_single_pass() {
        let vars = MessageVars::new().with("value", "@time").with("time", "noon");
        assert_eq!(render_message("Value @value", &vars), "Value @time");
    }

    #[test]
    fn test_merge_prefers_message_vars() {
        let defaults = MessageVars::new().with("value", 1).with("sensor", "a");
        let specific = MessageVars::new().with("value", 2);
        let merged = defaults.merged(&specific);
        assert_eq!(merged.get("value"), Some("2"));
        assert_eq!(merged.get("sensor"), Some("a"));
    }
}
