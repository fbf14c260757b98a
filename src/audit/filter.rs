//! Event-type filtering for exported audit records.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;

/// JSON pointer to the field a filter matches by default.
///
/// Audit API v2 events carry the short operation name (`LaunchInstance`,
/// `UpdateUser`) in `data.eventName`; the top-level `eventType` is the fully
/// qualified `com.oraclecloud.<service>.<Event>` form. Patterns are written
/// against the short name. `--event-field` selects another field, e.g.
/// `eventType`.
pub const DEFAULT_EVENT_FIELD: &str = "/data/eventName";

/// Ordered set of patterns matched against one string field of a record.
///
/// An empty set accepts everything. Otherwise a record is accepted when the
/// field is a string and at least one pattern finds a match anywhere in it.
#[derive(Debug, Clone)]
pub struct EventFilter {
    patterns: Vec<Regex>,
    field: String,
}

impl EventFilter {
    /// Filter that accepts every record.
    pub fn accept_all() -> Self {
        Self {
            patterns: Vec::new(),
            field: DEFAULT_EVENT_FIELD.to_string(),
        }
    }

    /// Compile a semicolon-delimited list of patterns, e.g. `Login.*;^Delete`.
    ///
    /// Empty segments are skipped, so `None`, `""` and `";"` all accept everything.
    pub fn parse(expression: Option<&str>) -> Result<Self> {
        let mut filter = Self::accept_all();
        let Some(expression) = expression else {
            return Ok(filter);
        };

        for pattern in expression.split(';').map(str::trim) {
            if pattern.is_empty() {
                continue;
            }
            let regex = Regex::new(pattern).map_err(|source| Error::InvalidFilter {
                pattern: pattern.to_string(),
                source,
            })?;
            filter.patterns.push(regex);
        }
        Ok(filter)
    }

    /// Match against the field at `pointer` instead of [`DEFAULT_EVENT_FIELD`].
    pub fn with_field(mut self, pointer: &str) -> Self {
        self.field = if pointer.starts_with('/') || pointer.is_empty() {
            pointer.to_string()
        } else {
            format!("/{}", pointer.replace('.', "/"))
        };
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The record's event-type value, if present and a string.
    pub fn event_type<'a>(&self, record: &'a Value) -> Option<&'a str> {
        record.pointer(&self.field).and_then(Value::as_str)
    }

    pub fn matches(&self, record: &Value) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        match self.event_type(record) {
            Some(event_type) => self.patterns.iter().any(|p| p.is_match(event_type)),
            None => false,
        }
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}
