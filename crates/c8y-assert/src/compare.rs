//! Comparison helpers shared by the assertions.

use crate::error::AssertError;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::fmt;

/// A regular expression matched at the start of the input.
///
/// The pattern must match a prefix of the text, it does not have to consume
/// all of it: `"Temperature"` matches `"Temperature high"`, but `"high"` does
/// not.
///
/// # Examples
///
/// ```rust
/// use c8y_assert::compare::RegexPattern;
///
/// let pattern = RegexPattern::case_insensitive("temperature").unwrap();
/// assert!(pattern.is_match("Temperature high"));
/// assert!(!pattern.is_match("High temperature"));
/// ```
#[derive(Debug, Clone)]
pub struct RegexPattern {
    source: String,
    regex: Regex,
}

impl RegexPattern {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, false, false)
    }

    /// Compile `pattern` ignoring case.
    pub fn case_insensitive(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, true, false)
    }

    /// Compile `pattern` for multi-line text where `.` also matches newlines.
    pub fn multiline(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, false, true)
    }

    fn build(pattern: &str, case_insensitive: bool, multiline: bool) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&format!(r"\A(?:{pattern})"))
            .case_insensitive(case_insensitive)
            .multi_line(multiline)
            .dot_matches_new_line(multiline)
            .build()?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Whether the pattern matches at the start of `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The pattern as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Whether `actual` contains every non-empty value of `expected`.
///
/// Objects are compared key by key and recursively, keys of `actual` missing
/// from `expected` are ignored. Expected values that are `null`, `""`, `[]`
/// or `{}` impose no constraint. Everything else must be equal.
///
/// # Examples
///
/// ```rust
/// use c8y_assert::compare::contains_fragment_values;
/// use serde_json::json;
///
/// let device = json!({"name": "tedge01", "c8y_Agent": {"name": "thin-edge.io", "version": "1.1.2"}});
///
/// assert!(contains_fragment_values(&device, &json!({"c8y_Agent": {"name": "thin-edge.io"}})));
/// assert!(!contains_fragment_values(&device, &json!({"c8y_Agent": {"version": "1.0.0"}})));
/// ```
pub fn contains_fragment_values(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Object(wanted) => {
            let Some(actual) = actual.as_object() else {
                return false;
            };
            wanted
                .iter()
                .filter(|(_, value)| !is_empty(value))
                .all(|(key, value)| {
                    actual
                        .get(key)
                        .is_some_and(|found| contains_fragment_values(found, value))
                })
        }
        other => actual == other,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Inclusive bounds on the number of matching objects.
///
/// The default expects at least one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    /// Lower bound, unchecked when `None`
    pub min: Option<usize>,
    /// Upper bound, unchecked when `None`
    pub max: Option<usize>,
}

impl CountRange {
    /// At least `min` matches.
    pub fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// At most `max` matches.
    pub fn at_most(max: usize) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    /// Between `min` and `max` matches.
    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Exactly `count` matches.
    pub fn exactly(count: usize) -> Self {
        Self::between(count, count)
    }

    /// Any number of matches.
    pub fn any() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// Whether `total` lies within the bounds.
    pub fn contains(&self, total: usize) -> bool {
        self.min.is_none_or(|min| total >= min) && self.max.is_none_or(|max| total <= max)
    }

    /// Check `total`, describing a violation in terms of `subject`.
    pub fn check(&self, subject: &str, total: usize) -> Result<(), AssertError> {
        let message = match (self.min, self.max) {
            (Some(min), Some(max)) if !(min..=max).contains(&total) => format!(
                "{subject} count is not between min and max range (inclusive)\nwant=Between {min} and {max}\ngot={total}"
            ),
            (Some(min), None) if total < min => {
                format!("{subject} count is less than expected\nwant= >= {min}\ngot={total}")
            }
            (None, Some(max)) if total > max => {
                format!("{subject} count is greater than expected\nwant= <= {max}\ngot={total}")
            }
            _ => return Ok(()),
        };
        Err(AssertError::Unmet(message))
    }
}

impl Default for CountRange {
    fn default() -> Self {
        Self::at_least(1)
    }
}
