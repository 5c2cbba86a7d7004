//! # conduit-core
//!
//! Connection management core for Conduit.
//!
//! This crate provides everything between application code and a database
//! driver:
//! - Configuration resolution with read/write splitting and random host selection
//! - Lazy connections that open their handles on first use
//! - Uniform statement execution with error wrapping and a query log
//! - Transparent reconnect-and-retry on lost connections
//! - Nested transactions through savepoints
//! - Pretend mode that records statements without running them
//!
//! Drivers live in separate crates (`conduit-sqlite`, `conduit-mysql`) and
//! plug in through the [`Connector`], [`Handle`] and [`Statement`] traits.
//!
//! ## Configuration
//!
//! ```rust
//! use conduit_core::{ConnectionConfig, ConnectionFactory, ErrorCode};
//! use serde_json::json;
//!
//! let factory = ConnectionFactory::new();
//! let config = ConnectionConfig::from_json(json!({"driver": "oracle"})).unwrap();
//!
//! // Unknown drivers are rejected before any I/O.
//! let err = factory.make(config, Some("main")).unwrap_err();
//! assert_eq!(err.code(), ErrorCode::UnsupportedDriver);
//! ```
//!
//! ## Lost connections
//!
//! ```rust
//! use conduit_core::{DriverError, LostConnectionDetector, PhraseDetector};
//!
//! let detector = PhraseDetector::default();
//! assert!(detector.caused_by_lost_connection(&DriverError::new("MySQL server has gone away")));
//! assert!(!detector.caused_by_lost_connection(&DriverError::new("syntax error")));
//! ```

pub mod config;
pub mod connection;
pub mod detector;
pub mod driver;
pub mod error;
pub mod factory;
pub mod logging;
pub mod manager;
pub mod query_log;
pub mod transaction;
pub mod value;

#[cfg(test)]
mod mock;

pub use config::{ConnectionConfig, DatabaseSettings, FetchMode};
pub use connection::{Connection, HandleFactory, Reconnector};
pub use detector::{LOST_CONNECTION_PHRASES, LostConnectionDetector, PhraseDetector};
pub use driver::{
    Connector, Dialect, DriverError, DriverOptions, DriverResult, Handle, Row, StandardDialect,
    Statement, build_row,
};
pub use error::{ConfigError, ConnectionStateError, Error, ErrorCode, QueryError, Result};
pub use factory::{ConnectionFactory, ResolvedConfig};
pub use manager::DatabaseManager;
pub use query_log::QueryLogEntry;
pub use transaction::savepoint_name;
pub use value::{DEFAULT_DATE_FORMAT, Value, prepare_bindings};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::bindings;
    pub use crate::config::{ConnectionConfig, DatabaseSettings, FetchMode};
    pub use crate::connection::Connection;
    pub use crate::error::{Error, Result};
    pub use crate::factory::ConnectionFactory;
    pub use crate::manager::DatabaseManager;
    pub use crate::value::Value;
}
