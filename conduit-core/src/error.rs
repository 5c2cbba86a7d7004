//! Error types for connection management and statement execution.
//!
//! Every failure surfaced by Conduit falls into one of a small number of
//! categories, each with a stable error code:
//!
//! - 1xxx: Configuration errors (missing or unsupported driver, bad values)
//! - 2xxx: Connection errors (lost connections, state misuse)
//! - 3xxx: Query errors (a specific statement failed)
//! - 4xxx: Transaction errors (begin/commit/rollback failed)
//!
//! ```rust
//! use conduit_core::{ConfigError, Error, ErrorCode};
//!
//! let err: Error = ConfigError::UnsupportedDriver("oracle".into()).into();
//! assert_eq!(err.code(), ErrorCode::UnsupportedDriver);
//! assert_eq!(err.code().code(), "C1002");
//! assert!(err.to_string().contains("oracle"));
//! ```
//!
//! Statement failures carry the SQL and the prepared bindings:
//!
//! ```rust
//! use conduit_core::{DriverError, QueryError, Value};
//!
//! let err = QueryError::new(
//!     "select * from users where id = ?",
//!     vec![Value::Int(7)],
//!     DriverError::new("no such table: users"),
//! );
//! assert_eq!(
//!     err.to_string(),
//!     "no such table: users (SQL: select * from users where id = 7)"
//! );
//! ```

use std::fmt;

use thiserror::Error;

use crate::driver::DriverError;
use crate::value::Value;

/// Result type for Conduit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Configuration errors (1xxx)
    /// No driver was specified (C1001).
    MissingDriver = 1001,
    /// The driver is not registered with the factory (C1002).
    UnsupportedDriver = 1002,
    /// A configuration value is missing or malformed (C1003).
    InvalidConfiguration = 1003,
    /// The named connection is not configured (C1004).
    UnknownConnection = 1004,

    // Connection errors (2xxx)
    /// A handle was needed but no reconnector is available (C2002).
    NoReconnector = 2002,
    /// The write handle was swapped inside a transaction (C2003).
    HandleSwapInTransaction = 2003,
    /// The connection dropped while a transaction was open (C2004).
    LostInTransaction = 2004,

    // Query errors (3xxx)
    /// A statement failed to execute (C3001).
    QueryFailed = 3001,

    // Transaction errors (4xxx)
    /// Begin, commit or rollback failed on the driver (C4001).
    TransactionFailed = 4001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "C3001").
    pub fn code(&self) -> String {
        format!("C{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingDriver => "No database driver specified",
            Self::UnsupportedDriver => "Unsupported database driver",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::UnknownConnection => "Connection not configured",
            Self::NoReconnector => "Lost connection and no reconnector available",
            Self::HandleSwapInTransaction => "Handle swapped inside a transaction",
            Self::LostInTransaction => "Connection lost inside a transaction",
            Self::QueryFailed => "Query failed",
            Self::TransactionFailed => "Transaction failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Configuration problems detected before any I/O happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration has no `driver` key.
    #[error("A driver must be specified.")]
    MissingDriver,

    /// No connector is registered for the driver.
    #[error("Unsupported driver [{0}]")]
    UnsupportedDriver(String),

    /// A key has a value of the wrong shape.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// What is wrong with it.
        message: String,
    },

    /// The manager has no configuration under this name.
    #[error("Database [{0}] not configured.")]
    UnknownConnection(String),
}

/// The connection is in a state that does not allow the requested operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStateError {
    /// A handle was missing and nothing can re-establish it.
    #[error("Lost connection and no reconnector available.")]
    NoReconnector,

    /// The write handle cannot change while a transaction is open.
    #[error("Can't swap the write handle while within a transaction (depth {depth}).")]
    HandleSwapInTransaction {
        /// Transaction depth at the time of the attempt.
        depth: u32,
    },
}

/// A statement failed to execute.
///
/// Carries the raw SQL text, the prepared bindings and the driver failure.
#[derive(Error, Debug)]
pub struct QueryError {
    sql: String,
    bindings: Vec<Value>,
    #[source]
    source: DriverError,
}

impl QueryError {
    /// Wrap a driver failure with the statement that caused it.
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>, source: DriverError) -> Self {
        Self {
            sql: sql.into(),
            bindings,
            source,
        }
    }

    /// The SQL text as it was submitted.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The prepared bindings that were sent with the statement.
    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    /// The underlying driver failure.
    pub fn driver_error(&self) -> &DriverError {
        &self.source
    }

    /// The SQL with each `?` placeholder replaced by its binding.
    ///
    /// Diagnostics only. Placeholders inside quoted strings and identifiers
    /// are left alone, but comments and other dialect syntax are not parsed.
    pub fn interpolated_sql(&self) -> String {
        let mut bindings = self.bindings.iter();
        let mut out = String::with_capacity(self.sql.len());
        let mut quote: Option<char> = None;
        for ch in self.sql.chars() {
            match (quote, ch) {
                (Some(open), _) if ch == open => quote = None,
                (Some(_), _) => {}
                (None, '\'' | '"' | '`') => quote = Some(ch),
                (None, '?') => {
                    if let Some(value) = bindings.next() {
                        out.push_str(&value.to_sql_literal());
                        continue;
                    }
                }
                (None, _) => {}
            }
            out.push(ch);
        }
        out
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (SQL: {})", self.source, self.interpolated_sql())
    }
}

/// Errors that can occur while managing connections and running statements.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A statement failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The connection cannot perform the operation in its current state.
    #[error(transparent)]
    ConnectionState(#[from] ConnectionStateError),

    /// The connection dropped while a transaction was open.
    ///
    /// The statement is not retried: a fresh handle would have no open
    /// transaction and the caller's writes would silently escape it.
    #[error("Connection lost inside an open transaction: {0}")]
    ConnectionLostInTransaction(QueryError),

    /// The driver rejected a transaction control operation.
    #[error("Transaction error during {operation}: {source}")]
    Transaction {
        /// The transaction step that failed (`begin`, `commit`, `rollback`,
        /// `savepoint` or `release`).
        operation: &'static str,
        /// The driver failure.
        #[source]
        source: DriverError,
    },
}

impl Error {
    /// Create a transaction error for the given operation.
    pub fn transaction(operation: &'static str, source: DriverError) -> Self {
        Self::Transaction { operation, source }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(ConfigError::MissingDriver) => ErrorCode::MissingDriver,
            Self::Config(ConfigError::UnsupportedDriver(_)) => ErrorCode::UnsupportedDriver,
            Self::Config(ConfigError::UnknownConnection(_)) => ErrorCode::UnknownConnection,
            Self::Config(_) => ErrorCode::InvalidConfiguration,
            Self::Query(_) => ErrorCode::QueryFailed,
            Self::ConnectionState(ConnectionStateError::NoReconnector) => ErrorCode::NoReconnector,
            Self::ConnectionState(ConnectionStateError::HandleSwapInTransaction { .. }) => {
                ErrorCode::HandleSwapInTransaction
            }
            Self::ConnectionLostInTransaction(_) => ErrorCode::LostInTransaction,
            Self::Transaction { .. } => ErrorCode::TransactionFailed,
        }
    }

    /// Check if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::NoReconnector
                | ErrorCode::HandleSwapInTransaction
                | ErrorCode::LostInTransaction
        )
    }

    /// Check if the whole unit of work may be retried by the caller.
    ///
    /// Only a transaction interrupted by a lost connection qualifies: the
    /// server has discarded it, so replaying it from the start is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionLostInTransaction(_))
    }

    /// Get the query error, if this failure came from a statement.
    pub fn as_query_error(&self) -> Option<&QueryError> {
        match self {
            Self::Query(e) | Self::ConnectionLostInTransaction(e) => Some(e),
            _ => None,
        }
    }
}
