//! Binding values and their preparation.
//!
//! Statement parameters are passed as [`Value`]s. Before a statement runs,
//! its bindings go through [`prepare_bindings`], which normalizes the values
//! drivers do not handle uniformly:
//!
//! - timestamps become their canonical string form (`%Y-%m-%d %H:%M:%S`
//!   unless the dialect says otherwise)
//! - boolean `false` becomes integer `0`
//!
//! ```rust
//! use chrono::NaiveDate;
//! use conduit_core::{prepare_bindings, Value, DEFAULT_DATE_FORMAT};
//!
//! let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
//!     .unwrap()
//!     .and_hms_opt(14, 5, 0)
//!     .unwrap();
//!
//! let prepared = prepare_bindings(
//!     &[Value::Timestamp(ts), Value::Bool(false), Value::Bool(true), Value::Int(5)],
//!     DEFAULT_DATE_FORMAT,
//! );
//!
//! assert_eq!(prepared[0], Value::String("2024-03-09 14:05:00".into()));
//! assert_eq!(prepared[1], Value::Int(0));
//! assert_eq!(prepared[2], Value::Bool(true));
//! assert_eq!(prepared[3], Value::Int(5));
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Canonical format used for timestamp bindings.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Text.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Date and time without a zone.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render the value as a SQL literal, for diagnostics only.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(true) => "1".to_string(),
            Self::Bool(false) => "0".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Bytes(b) => format!("<{} bytes>", b.len()),
            Self::Timestamp(ts) => format!("'{}'", ts.format(DEFAULT_DATE_FORMAT)),
        }
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Bytes(b) => JsonValue::Array(b.iter().map(|byte| (*byte).into()).collect()),
            Self::Timestamp(ts) => JsonValue::String(ts.format(DEFAULT_DATE_FORMAT).to_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Normalize bindings before they are handed to a driver.
///
/// Timestamps are formatted with `date_format`; `false` becomes `0`. All
/// other values, `true` included, pass through unchanged.
pub fn prepare_bindings(bindings: &[Value], date_format: &str) -> Vec<Value> {
    bindings
        .iter()
        .map(|value| match value {
            Value::Timestamp(ts) => Value::String(ts.format(date_format).to_string()),
            Value::Bool(false) => Value::Int(0),
            other => other.clone(),
        })
        .collect()
}

/// Build a binding list from heterogeneous values.
///
/// ```rust
/// use conduit_core::{bindings, Value};
///
/// let b = bindings![1, "two", false];
/// assert_eq!(b, vec![Value::Int(1), Value::String("two".into()), Value::Bool(false)]);
/// ```
#[macro_export]
macro_rules! bindings {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::Value::from($value)),+]
    };
}
