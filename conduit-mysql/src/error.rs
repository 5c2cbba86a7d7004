//! Error types for MySQL operations.

use std::fmt;

use conduit_core::DriverError;

/// Result type for MySQL operations.
pub type MysqlResult<T> = Result<T, MysqlError>;

/// Code attached to I/O failures, which always mean the link is unusable.
pub const IO_ERROR_CODE: &str = "io";

/// Error type for MySQL operations.
#[derive(Debug)]
pub enum MysqlError {
    /// MySQL driver error.
    Mysql(mysql_async::Error),
    /// Configuration error.
    Config(String),
    /// The private runtime could not be started.
    Runtime(std::io::Error),
    /// The handle was used after its connection was closed.
    Closed,
}

impl MysqlError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The backend code reported for this failure: the server error number,
    /// or [`IO_ERROR_CODE`] for transport failures.
    pub fn code(&self) -> Option<String> {
        match self {
            Self::Mysql(mysql_async::Error::Server(e)) => Some(e.code.to_string()),
            Self::Mysql(mysql_async::Error::Io(_)) => Some(IO_ERROR_CODE.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for MysqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mysql(e) => write!(f, "{}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Runtime(e) => write!(f, "Runtime error: {}", e),
            Self::Closed => write!(f, "no connection to the server"),
        }
    }
}

impl std::error::Error for MysqlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Mysql(e) => Some(e),
            Self::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<mysql_async::Error> for MysqlError {
    fn from(err: mysql_async::Error) -> Self {
        Self::Mysql(err)
    }
}

impl From<MysqlError> for DriverError {
    fn from(err: MysqlError) -> Self {
        let mut error = DriverError::new(err.to_string());
        if let Some(code) = err.code() {
            error = error.with_code(code);
        }
        error.with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MysqlError::config("invalid port");
        assert_eq!(err.to_string(), "Configuration error: invalid port");
    }

    #[test]
    fn test_closed_reads_as_lost_connection() {
        let driver: DriverError = MysqlError::Closed.into();
        assert_eq!(driver.message(), "no connection to the server");
        assert_eq!(driver.code(), None);
    }

    #[test]
    fn test_io_error_code() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = MysqlError::Mysql(mysql_async::Error::from(io));
        assert_eq!(err.code().as_deref(), Some(IO_ERROR_CODE));

        let driver: DriverError = err.into();
        assert_eq!(driver.code(), Some(IO_ERROR_CODE));
        assert!(std::error::Error::source(&driver).is_some());
    }

    #[test]
    fn test_runtime_error_has_source() {
        let err = MysqlError::Runtime(std::io::Error::other("no threads"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.code().is_none());
    }
}
