//! Error types for SQLite operations.

use std::fmt;

use conduit_core::DriverError;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for SQLite operations.
#[derive(Debug)]
pub enum SqliteError {
    /// SQLite driver error.
    Sqlite(rusqlite::Error),
    /// Configuration error.
    Config(String),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The SQLite extended result code, when the failure came from SQLite itself.
    pub fn extended_code(&self) -> Option<i32> {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => Some(err.extended_code),
            _ => None,
        }
    }
}

impl fmt::Display for SqliteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "{}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for SqliteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(err)
    }
}

impl From<SqliteError> for DriverError {
    fn from(err: SqliteError) -> Self {
        let message = err.to_string();
        match err {
            SqliteError::Sqlite(e) => {
                let error = DriverError::new(message);
                let error = match &e {
                    rusqlite::Error::SqliteFailure(ffi, _) => {
                        error.with_code(ffi.extended_code.to_string())
                    }
                    _ => error,
                };
                error.with_source(e)
            }
            SqliteError::Config(_) => DriverError::new(message),
        }
    }
}
