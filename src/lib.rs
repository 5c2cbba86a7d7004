//! # Conduit
//!
//! Named database connections for synchronous Rust code.
//!
//! Conduit provides:
//! - Connection configs resolved into write and read endpoints, with a random
//!   pick among several read hosts
//! - Lazy connections that open their driver handles on first use
//! - One reconnect-and-retry when a statement fails because the link dropped
//! - Nested transactions through savepoints
//! - A per-connection query log and a pretend mode that only records SQL
//! - SQLite (default) and MySQL drivers behind feature flags
//!
//! ## Quick Start
//!
//! ```rust
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> Result<(), conduit::Error> {
//! use conduit::prelude::*;
//! use serde_json::json;
//!
//! let settings: DatabaseSettings = serde_json::from_value(json!({
//!     "default": "main",
//!     "connections": {
//!         "main": {"driver": "sqlite", "database": ":memory:"}
//!     }
//! }))
//! .unwrap();
//!
//! let mut db = DatabaseManager::new(settings, conduit::default_factory());
//! let conn = db.connection(None)?;
//!
//! conn.statement("create table users (id integer primary key, name text)", &[])?;
//! conn.transaction(|conn| {
//!     conn.insert("insert into users (name) values (?)", &bindings!["ada"])?;
//!     conn.insert("insert into users (name) values (?)", &bindings!["grace"])?;
//!     Ok::<_, conduit::Error>(())
//! })?;
//!
//! assert_eq!(conn.select("select * from users", &[])?.len(), 2);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use conduit_core::{
    ConfigError, Connection, ConnectionConfig, ConnectionFactory, ConnectionStateError, Connector,
    DatabaseManager, DatabaseSettings, Dialect, DriverError, DriverResult, Error, ErrorCode,
    FetchMode, Handle, LostConnectionDetector, PhraseDetector, QueryError, QueryLogEntry, Result,
    Row, Statement, Value, bindings,
};

/// Logging setup and debug macros.
pub mod logging {
    pub use conduit_core::logging::*;
}

/// Driver traits and helpers, for implementing custom connectors.
pub mod driver {
    pub use conduit_core::driver::*;
}

/// SQLite driver.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use conduit_sqlite::*;
}

/// MySQL driver.
#[cfg(feature = "mysql")]
#[cfg_attr(docsrs, doc(cfg(feature = "mysql")))]
pub mod mysql {
    pub use conduit_mysql::*;
}

/// A factory with every driver enabled by features registered.
pub fn default_factory() -> ConnectionFactory {
    let factory = ConnectionFactory::new();
    #[cfg(feature = "sqlite")]
    let factory = factory.with_connector(conduit_sqlite::SqliteConnector::new());
    #[cfg(feature = "mysql")]
    let factory = factory.with_connector(conduit_mysql::MysqlConnector::new());
    factory
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use conduit_core::prelude::*;
    pub use crate::default_factory;
}
