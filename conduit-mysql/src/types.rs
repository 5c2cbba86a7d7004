//! Type conversion utilities for MySQL.

use chrono::{Datelike, Timelike};
use conduit_core::Value;
use mysql_async::Value as MysqlValue;
use serde_json::Value as JsonValue;

/// Convert a binding to a MySQL value.
pub fn to_mysql_value(value: &Value) -> MysqlValue {
    match value {
        Value::Null => MysqlValue::NULL,
        Value::Bool(b) => MysqlValue::from(*b),
        Value::Int(i) => MysqlValue::from(*i),
        Value::Float(f) => MysqlValue::from(*f),
        Value::String(s) => MysqlValue::from(s.as_str()),
        Value::Bytes(b) => MysqlValue::Bytes(b.clone()),
        Value::Timestamp(ts) => MysqlValue::Date(
            u16::try_from(ts.year()).unwrap_or_default(),
            ts.month() as u8,
            ts.day() as u8,
            ts.hour() as u8,
            ts.minute() as u8,
            ts.second() as u8,
            ts.nanosecond() / 1_000,
        ),
    }
}

/// Convert a MySQL Value to a JSON Value.
pub fn from_mysql_value(value: MysqlValue) -> JsonValue {
    match value {
        MysqlValue::NULL => JsonValue::Null,
        MysqlValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s),
            Err(e) => JsonValue::Array(e.into_bytes().into_iter().map(JsonValue::from).collect()),
        },
        MysqlValue::Int(i) => JsonValue::Number(i.into()),
        MysqlValue::UInt(u) => JsonValue::Number(u.into()),
        MysqlValue::Float(f) => serde_json::Number::from_f64(f64::from(f))
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        MysqlValue::Double(d) => serde_json::Number::from_f64(d)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        MysqlValue::Date(year, month, day, hour, minute, second, micro) => {
            let mut datetime = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micro > 0 {
                datetime.push_str(&format!(".{:06}", micro));
            }
            JsonValue::String(datetime)
        }
        MysqlValue::Time(is_neg, days, hours, minutes, seconds, micro) => {
            let sign = if is_neg { "-" } else { "" };
            let mut time = format!(
                "{}{:02}:{:02}:{:02}",
                sign,
                days * 24 + u32::from(hours),
                minutes,
                seconds
            );
            if micro > 0 {
                time.push_str(&format!(".{:06}", micro));
            }
            JsonValue::String(time)
        }
    }
}
