//! Driver capabilities consumed by the connection core.
//!
//! A backend plugs into Conduit by implementing three traits:
//!
//! - [`Connector`] opens a [`Handle`] from a resolved [`ConnectionConfig`]
//! - [`Handle`] is one open link to the database
//! - [`Statement`] is a prepared statement borrowed from a handle
//!
//! The core never constructs handles itself. It only holds deferred calls to
//! a connector, so no I/O happens until a statement needs a handle.
//!
//! Backends also provide a [`Dialect`] (savepoint grammar, date format) and
//! may override the [`LostConnectionDetector`] used to classify their errors.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::config::{ConnectionConfig, FetchMode};
use crate::detector::{LostConnectionDetector, PhraseDetector};
use crate::value::{DEFAULT_DATE_FORMAT, Value};

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Driver-specific options, keyed by option name.
pub type DriverOptions = Map<String, JsonValue>;

/// A fetched row. An object keyed by column for [`FetchMode::Assoc`], an
/// array of column values for [`FetchMode::Num`].
pub type Row = JsonValue;

/// A failure reported by a driver handle or connector.
#[derive(Debug)]
pub struct DriverError {
    message: String,
    code: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    /// Create an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Attach the backend's own error code (SQLSTATE, errno, ...).
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the underlying error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The driver's message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The backend error code, if the driver reported one.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// A prepared statement.
pub trait Statement {
    /// Execute with the given (already prepared) bindings.
    fn execute(&mut self, bindings: &[Value]) -> DriverResult<bool>;

    /// Return every row produced by the last execution.
    fn fetch_all(&mut self, mode: FetchMode) -> DriverResult<Vec<Row>>;

    /// Number of rows affected by the last execution.
    fn row_count(&self) -> u64;
}

/// An open link to a database backend.
pub trait Handle: Send {
    /// Prepare a statement for execution.
    fn prepare<'a>(&'a mut self, sql: &str) -> DriverResult<Box<dyn Statement + 'a>>;

    /// Execute raw SQL without preparation, returning the affected row count.
    fn exec(&mut self, sql: &str) -> DriverResult<u64>;

    /// Start a transaction.
    fn begin_transaction(&mut self) -> DriverResult<()>;

    /// Commit the active transaction.
    fn commit(&mut self) -> DriverResult<()>;

    /// Roll back the active transaction.
    fn roll_back(&mut self) -> DriverResult<()>;
}

/// Backend-specific SQL grammar used by the connection core.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Whether nested transactions can be emulated with savepoints.
    fn supports_savepoints(&self) -> bool {
        true
    }

    /// SQL that defines a savepoint.
    fn compile_savepoint(&self, name: &str) -> String {
        format!("SAVEPOINT {}", name)
    }

    /// SQL that rolls back to a savepoint.
    fn compile_savepoint_rollback(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {}", name)
    }

    /// SQL that releases a savepoint once its level commits.
    fn compile_savepoint_release(&self, name: &str) -> String {
        format!("RELEASE SAVEPOINT {}", name)
    }

    /// `strftime` format used for timestamp bindings.
    fn date_format(&self) -> &str {
        DEFAULT_DATE_FORMAT
    }
}

/// The ANSI grammar shared by most backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDialect;

impl Dialect for StandardDialect {}

/// Opens driver handles for one backend family.
pub trait Connector: Send + Sync {
    /// Name under which this connector is registered (`"mysql"`, `"sqlite"`).
    fn driver(&self) -> &str;

    /// Open a handle. The config is already resolved: no `read`/`write`
    /// blocks and a single host.
    fn connect(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn Handle>>;

    /// Options applied when no config overrides them.
    fn default_options(&self) -> DriverOptions {
        DriverOptions::new()
    }

    /// Resolve driver options: the config's `options` block wins over the
    /// connector defaults.
    fn options(&self, config: &ConnectionConfig) -> DriverOptions {
        let mut options = self.default_options();
        if let Some(JsonValue::Object(overrides)) = config.get("options") {
            for (key, value) in overrides {
                options.insert(key.clone(), value.clone());
            }
        }
        options
    }

    /// Grammar for connections opened by this connector.
    fn dialect(&self) -> Arc<dyn Dialect> {
        Arc::new(StandardDialect)
    }

    /// Classifier for this backend's transient failures.
    fn lost_connection_detector(&self) -> Arc<dyn LostConnectionDetector> {
        Arc::new(PhraseDetector::default())
    }
}

/// Shape a row of column values according to the fetch mode.
pub fn build_row(columns: &[String], values: Vec<JsonValue>, mode: FetchMode) -> Row {
    match mode {
        FetchMode::Assoc => {
            let mut map = Map::with_capacity(columns.len());
            for (column, value) in columns.iter().zip(values) {
                map.insert(column.clone(), value);
            }
            JsonValue::Object(map)
        }
        FetchMode::Num => JsonValue::Array(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NullConnector;

    impl Connector for NullConnector {
        fn driver(&self) -> &str {
            "null"
        }

        fn connect(&self, _config: &ConnectionConfig) -> DriverResult<Box<dyn Handle>> {
            Err(DriverError::new("not supported"))
        }

        fn default_options(&self) -> DriverOptions {
            let mut options = DriverOptions::new();
            options.insert("0".into(), json!("foo"));
            options.insert("1".into(), json!("bar"));
            options
        }
    }

    #[test]
    fn test_option_resolution() {
        let config = ConnectionConfig::from_json(json!({
            "options": {"0": "baz", "2": "boom"}
        }))
        .unwrap();

        let options = NullConnector.options(&config);
        assert_eq!(options.get("0"), Some(&json!("baz")));
        assert_eq!(options.get("1"), Some(&json!("bar")));
        assert_eq!(options.get("2"), Some(&json!("boom")));
    }

    #[test]
    fn test_options_without_overrides() {
        let options = NullConnector.options(&ConnectionConfig::new());
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_standard_dialect() {
        let dialect = StandardDialect;
        assert!(dialect.supports_savepoints());
        assert_eq!(dialect.compile_savepoint("trans2"), "SAVEPOINT trans2");
        assert_eq!(
            dialect.compile_savepoint_rollback("trans2"),
            "ROLLBACK TO SAVEPOINT trans2"
        );
        assert_eq!(
            dialect.compile_savepoint_release("trans2"),
            "RELEASE SAVEPOINT trans2"
        );
        assert_eq!(dialect.date_format(), "%Y-%m-%d %H:%M:%S");
    }

    #[test]
    fn test_build_row() {
        let columns = vec!["id".to_string(), "name".to_string()];
        assert_eq!(
            build_row(&columns, vec![json!(1), json!("a")], FetchMode::Assoc),
            json!({"id": 1, "name": "a"})
        );
        assert_eq!(
            build_row(&columns, vec![json!(1), json!("a")], FetchMode::Num),
            json!([1, "a"])
        );
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::new("gone").with_code("2006");
        assert_eq!(err.to_string(), "[2006] gone");
        assert_eq!(err.code(), Some("2006"));
        assert_eq!(DriverError::new("plain").to_string(), "plain");
    }
}
