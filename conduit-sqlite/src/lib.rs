//! SQLite driver for Conduit.
//!
//! This crate plugs SQLite into `conduit-core` through `rusqlite`:
//!
//! - [`SqliteConnector`] opens handles for configs with `"driver": "sqlite"`
//! - [`SqliteHandle`] runs statements and transactions on one database
//! - [`SqliteConfig`] turns the `database` key and `options` block into pragmas
//!
//! SQLite supports `SAVEPOINT`, so nested transactions use the standard
//! dialect unchanged.
//!
//! # Example
//!
//! ```rust
//! use conduit_core::{ConnectionConfig, ConnectionFactory, Value};
//! use conduit_sqlite::SqliteConnector;
//!
//! let factory = ConnectionFactory::new().with_connector(SqliteConnector::new());
//! let config = ConnectionConfig::new()
//!     .with("driver", "sqlite")
//!     .with("database", ":memory:");
//!
//! let mut conn = factory.make(config, Some("local")).unwrap();
//! conn.statement("create table users (name text)", &[]).unwrap();
//! conn.insert("insert into users values (?)", &[Value::from("ada")]).unwrap();
//! assert_eq!(conn.select("select * from users", &[]).unwrap().len(), 1);
//! ```

pub mod config;
pub mod connector;
pub mod error;
pub mod handle;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use connector::SqliteConnector;
pub use error::{SqliteError, SqliteResult};
pub use handle::{SqliteHandle, SqliteStatement};
