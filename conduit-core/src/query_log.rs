//! Per-connection record of executed statements.

use std::time::Duration;

use serde::Serialize;

use crate::value::Value;

/// One executed (or pretended) statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryLogEntry {
    /// SQL text as submitted.
    pub query: String,
    /// Prepared bindings.
    pub bindings: Vec<Value>,
    /// Wall time in milliseconds, rounded to two decimals.
    pub time: f64,
}

impl QueryLogEntry {
    /// Create an entry from a measured duration.
    pub fn new(query: impl Into<String>, bindings: Vec<Value>, elapsed: Duration) -> Self {
        Self {
            query: query.into(),
            bindings,
            time: elapsed_ms(elapsed),
        }
    }
}

/// Milliseconds rounded to two decimals.
pub fn elapsed_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Ordered log of executed statements with an on/off switch.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryLog {
    enabled: bool,
    entries: Vec<QueryLogEntry>,
}

impl QueryLog {
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn record(&mut self, entry: QueryLogEntry) {
        if self.enabled {
            self.entries.push(entry);
        }
    }

    pub(crate) fn entries(&self) -> &[QueryLogEntry] {
        &self.entries
    }

    pub(crate) fn take(&mut self) -> Vec<QueryLogEntry> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
