//! Connection configuration.
//!
//! A [`ConnectionConfig`] is a loosely-typed mapping, as connection settings
//! come from files and differ per driver. Keys that the core understands:
//!
//! | Key        | Shape                         |
//! |------------|-------------------------------|
//! | `driver`   | string                        |
//! | `host`     | string or list of strings     |
//! | `port`     | integer                       |
//! | `database` | string                        |
//! | `username` / `password` | string           |
//! | `charset` / `collation` | string           |
//! | `prefix`   | string (table-name prefix)    |
//! | `name`     | string (logical name)         |
//! | `options`  | object (driver options)       |
//! | `read` / `write` | object or list of objects |
//!
//! ```rust
//! use conduit_core::ConnectionConfig;
//! use serde_json::json;
//!
//! let config = ConnectionConfig::from_json(json!({
//!     "driver": "mysql",
//!     "host": ["10.0.0.1", "10.0.0.2"],
//!     "database": "app",
//!     "options": {"timeout": 5}
//! }))
//! .unwrap();
//!
//! assert_eq!(config.driver(), Some("mysql"));
//! assert_eq!(config.hosts(), vec!["10.0.0.1", "10.0.0.2"]);
//! assert_eq!(config.get("options.timeout"), Some(&json!(5)));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{ConfigError, Result};

/// How fetched rows are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Rows are JSON objects keyed by column name.
    #[default]
    Assoc,
    /// Rows are JSON arrays in column order.
    Num,
}

/// Settings for a single logical connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionConfig(Map<String, JsonValue>);

impl ConnectionConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing map.
    pub fn from_map(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }

    /// Build from a JSON value, which must be an object.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            other => Err(ConfigError::InvalidValue {
                key: "<root>".to_string(),
                message: format!("expected an object, found {}", json_kind(&other)),
            }
            .into()),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a top-level key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove a top-level key.
    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.0.remove(key)
    }

    /// Check for a top-level key.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Look up a value by dot-separated path (`"options.timeout"`).
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.0.get(first)?;
        for part in parts {
            current = match current {
                JsonValue::Object(map) => map.get(part)?,
                JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Look up a string by dot-separated path.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(JsonValue::as_str)
    }

    /// Look up a boolean by dot-separated path.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(JsonValue::as_bool)
    }

    /// Driver name.
    pub fn driver(&self) -> Option<&str> {
        self.get_str("driver")
    }

    /// Database name.
    pub fn database(&self) -> Option<&str> {
        self.get_str("database")
    }

    /// Table-name prefix, empty when unset.
    pub fn prefix(&self) -> &str {
        self.get_str("prefix").unwrap_or("")
    }

    /// Logical connection name.
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// The configured host when it is a single string.
    pub fn host(&self) -> Option<&str> {
        self.get_str("host")
    }

    /// Every configured host, whether `host` is a string or a list.
    pub fn hosts(&self) -> Vec<&str> {
        match self.0.get("host") {
            Some(JsonValue::String(host)) => vec![host.as_str()],
            Some(JsonValue::Array(hosts)) => hosts.iter().filter_map(JsonValue::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Port, accepting a number or a numeric string.
    pub fn port(&self) -> Result<Option<u16>> {
        match self.0.get("port") {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .map(Some)
                .ok_or_else(|| invalid("port", "must be between 0 and 65535")),
            Some(JsonValue::String(s)) => s
                .parse::<u16>()
                .map(Some)
                .map_err(|_| invalid("port", "must be between 0 and 65535")),
            Some(other) => Err(invalid(
                "port",
                &format!("expected a number, found {}", json_kind(other)),
            )),
        }
    }

    /// User name.
    pub fn username(&self) -> Option<&str> {
        self.get_str("username")
    }

    /// Password.
    pub fn password(&self) -> Option<&str> {
        self.get_str("password")
    }

    /// Connection character set.
    pub fn charset(&self) -> Option<&str> {
        self.get_str("charset")
    }

    /// Connection collation.
    pub fn collation(&self) -> Option<&str> {
        self.get_str("collation")
    }

    /// Copy of this config with every key of `overrides` replacing its own.
    pub fn merged_with(&self, overrides: &Map<String, JsonValue>) -> Self {
        let mut map = self.0.clone();
        for (key, value) in overrides {
            map.insert(key.clone(), value.clone());
        }
        Self(map)
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Consume into the underlying map.
    pub fn into_map(self) -> Map<String, JsonValue> {
        self.0
    }
}

impl From<Map<String, JsonValue>> for ConnectionConfig {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

fn invalid(key: &str, message: &str) -> crate::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
    .into()
}

pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "an object",
    }
}

/// Settings consumed by [`crate::DatabaseManager`].
///
/// ```rust
/// use conduit_core::{DatabaseSettings, FetchMode};
///
/// let settings: DatabaseSettings = serde_json::from_str(r#"{
///     "default": "main",
///     "fetch": "num",
///     "connections": {
///         "main": {"driver": "sqlite", "database": ":memory:"}
///     }
/// }"#).unwrap();
///
/// assert_eq!(settings.default, "main");
/// assert_eq!(settings.fetch, FetchMode::Num);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Name of the default connection.
    pub default: String,
    /// Fetch mode applied to every connection.
    #[serde(default)]
    pub fetch: FetchMode,
    /// Connection configurations by name.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

impl DatabaseSettings {
    /// Settings with the given default connection name and no connections.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            fetch: FetchMode::default(),
            connections: HashMap::new(),
        }
    }

    /// Add a named connection.
    pub fn connection(mut self, name: impl Into<String>, config: ConnectionConfig) -> Self {
        self.connections.insert(name.into(), config);
        self
    }

    /// Set the fetch mode.
    pub fn fetch(mut self, mode: FetchMode) -> Self {
        self.fetch = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_json_rejects_non_objects() {
        let err = ConnectionConfig::from_json(json!(["a"])).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("a list"));
    }

    #[test]
    fn test_dot_path_lookup() {
        let config = ConnectionConfig::from_json(json!({
            "options": {"nested": {"deep": true}},
            "host": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(config.get_bool("options.nested.deep"), Some(true));
        assert_eq!(config.get_str("host.1"), Some("b"));
        assert_eq!(config.get("options.missing"), None);
        assert_eq!(config.get("host.x"), None);
    }

    #[test]
    fn test_prefix_defaults_to_empty() {
        assert_eq!(ConnectionConfig::new().prefix(), "");
        assert_eq!(ConnectionConfig::new().with("prefix", "app_").prefix(), "app_");
    }

    #[test]
    fn test_hosts_shapes() {
        assert_eq!(ConnectionConfig::new().with("host", "db").hosts(), vec!["db"]);
        assert_eq!(
            ConnectionConfig::new().with("host", json!(["a", "b"])).hosts(),
            vec!["a", "b"]
        );
        assert!(ConnectionConfig::new().hosts().is_empty());
    }

    #[test]
    fn test_port_parsing() {
        assert_eq!(ConnectionConfig::new().port().unwrap(), None);
        assert_eq!(ConnectionConfig::new().with("port", 3307).port().unwrap(), Some(3307));
        assert_eq!(ConnectionConfig::new().with("port", "5432").port().unwrap(), Some(5432));
        assert!(ConnectionConfig::new().with("port", 70000).port().is_err());
        assert!(ConnectionConfig::new().with("port", true).port().is_err());
    }

    #[test]
    fn test_merged_with_overrides_win() {
        let base = ConnectionConfig::new()
            .with("host", "base")
            .with("database", "app");
        let overrides = json!({"host": "replica"});
        let merged = base.merged_with(overrides.as_object().unwrap());

        assert_eq!(merged.host(), Some("replica"));
        assert_eq!(merged.database(), Some("app"));
        assert_eq!(base.host(), Some("base"));
    }

    #[test]
    fn test_settings_deserialize_defaults() {
        let settings: DatabaseSettings = serde_json::from_value(json!({
            "default": "main"
        }))
        .unwrap();
        assert_eq!(settings.fetch, FetchMode::Assoc);
        assert!(settings.connections.is_empty());
    }

    #[test]
    fn test_settings_builder() {
        let settings = DatabaseSettings::new("main")
            .connection("main", ConnectionConfig::new().with("driver", "sqlite"))
            .fetch(FetchMode::Num);
        assert_eq!(settings.connections["main"].driver(), Some("sqlite"));
        assert_eq!(settings.fetch, FetchMode::Num);
    }
}
