//! SQLite configuration.
//!
//! A [`SqliteConfig`] is built from a resolved [`ConnectionConfig`] and the
//! connector's merged options:
//!
//! ```json
//! {
//!     "driver": "sqlite",
//!     "database": "/var/lib/app/app.sqlite",
//!     "options": { "journal_mode": "wal", "busy_timeout": 2000 }
//! }
//! ```
//!
//! `database` may be `":memory:"` for a private in-memory database.

use std::path::PathBuf;

use conduit_core::{ConnectionConfig, DriverOptions};
use serde_json::Value as JsonValue;

use crate::error::{SqliteError, SqliteResult};

/// SQLite database configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Database path (or in-memory).
    pub path: DatabasePath,
    /// Enforce foreign keys.
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u64>,
    /// Cache size (in pages, negative for KB).
    pub cache_size: Option<i64>,
    /// Synchronous mode, SQLite's default when unset.
    pub synchronous: Option<SynchronousMode>,
    /// Journal mode, SQLite's default when unset.
    pub journal_mode: Option<JournalMode>,
}

/// Database path configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// In-memory database.
    #[default]
    Memory,
    /// File-based database.
    File(PathBuf),
}

impl DatabasePath {
    /// Parse the `database` config value.
    pub fn parse(database: &str) -> Self {
        match database {
            ":memory:" => Self::Memory,
            path => Self::File(PathBuf::from(path)),
        }
    }

    /// Check if this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// SQLite synchronous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchronousMode {
    /// Synchronous OFF - Fastest but unsafe.
    Off,
    /// Synchronous NORMAL - Good balance.
    Normal,
    /// Synchronous FULL - Safe but slower.
    Full,
    /// Synchronous EXTRA - Maximum safety.
    Extra,
}

impl SynchronousMode {
    /// Parse a pragma value, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "OFF" => Some(Self::Off),
            "NORMAL" => Some(Self::Normal),
            "FULL" => Some(Self::Full),
            "EXTRA" => Some(Self::Extra),
            _ => None,
        }
    }

    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
            Self::Extra => "EXTRA",
        }
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// DELETE - Default mode, deletes journal after transaction.
    Delete,
    /// TRUNCATE - Truncates journal instead of deleting.
    Truncate,
    /// PERSIST - Keep journal file, zero out on commit.
    Persist,
    /// MEMORY - Keep journal in memory.
    Memory,
    /// WAL - Write-Ahead Logging.
    Wal,
    /// OFF - No journal.
    Off,
}

impl JournalMode {
    /// Parse a pragma value, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "DELETE" => Some(Self::Delete),
            "TRUNCATE" => Some(Self::Truncate),
            "PERSIST" => Some(Self::Persist),
            "MEMORY" => Some(Self::Memory),
            "WAL" => Some(Self::Wal),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }

    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout_ms: Some(5000),
            cache_size: None,
            synchronous: None,
            journal_mode: None,
        }
    }
}

impl SqliteConfig {
    /// Create a configuration for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Create a configuration for a file database.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: DatabasePath::File(path.into()),
            ..Default::default()
        }
    }

    /// Build from a resolved connection config and the connector's options.
    ///
    /// Fails when `database` is missing or an option has the wrong type.
    pub fn from_config(config: &ConnectionConfig, options: &DriverOptions) -> SqliteResult<Self> {
        let database = config
            .database()
            .ok_or_else(|| SqliteError::config("the [database] path is required"))?;

        let mut sqlite = Self {
            path: DatabasePath::parse(database),
            ..Default::default()
        };

        if let Some(value) = options.get("foreign_keys") {
            sqlite.foreign_keys = value
                .as_bool()
                .ok_or_else(|| invalid_option("foreign_keys", value))?;
        }
        if let Some(value) = options.get("busy_timeout") {
            sqlite.busy_timeout_ms = match value {
                JsonValue::Null => None,
                v => Some(v.as_u64().ok_or_else(|| invalid_option("busy_timeout", v))?),
            };
        }
        if let Some(value) = options.get("cache_size") {
            sqlite.cache_size = Some(
                value
                    .as_i64()
                    .ok_or_else(|| invalid_option("cache_size", value))?,
            );
        }
        if let Some(value) = options.get("synchronous") {
            sqlite.synchronous = Some(
                value
                    .as_str()
                    .and_then(SynchronousMode::parse)
                    .ok_or_else(|| invalid_option("synchronous", value))?,
            );
        }
        if let Some(value) = options.get("journal_mode") {
            sqlite.journal_mode = Some(
                value
                    .as_str()
                    .and_then(JournalMode::parse)
                    .ok_or_else(|| invalid_option("journal_mode", value))?,
            );
        }

        Ok(sqlite)
    }

    /// Generate the initialization SQL for this configuration.
    pub fn init_sql(&self) -> String {
        let mut sql = String::new();

        sql.push_str(&format!(
            "PRAGMA foreign_keys = {};\n",
            if self.foreign_keys { "ON" } else { "OFF" }
        ));

        if let Some(mode) = self.journal_mode {
            sql.push_str(&format!("PRAGMA journal_mode = {};\n", mode.as_pragma()));
        }

        if let Some(mode) = self.synchronous {
            sql.push_str(&format!("PRAGMA synchronous = {};\n", mode.as_pragma()));
        }

        if let Some(timeout) = self.busy_timeout_ms {
            sql.push_str(&format!("PRAGMA busy_timeout = {};\n", timeout));
        }

        if let Some(cache) = self.cache_size {
            sql.push_str(&format!("PRAGMA cache_size = {};\n", cache));
        }

        sql
    }
}

fn invalid_option(key: &str, value: &JsonValue) -> SqliteError {
    SqliteError::config(format!("invalid value for option [{}]: {}", key, value))
}
