//! MySQL driver for Conduit.
//!
//! This crate plugs MySQL into `conduit-core` through `mysql_async`:
//!
//! - [`MysqlConnector`] opens handles for configs with `"driver": "mysql"`
//! - [`MysqlHandle`] runs statements on one session, blocking on a private
//!   current-thread runtime
//! - [`MysqlConfig`] maps `host`/`port`/`unix_socket`, credentials and the
//!   session settings (`charset`, `collation`, `timezone`, `strict`, `modes`)
//! - [`MysqlLostConnectionDetector`] adds the client's lost-link error
//!   numbers to the shared phrase list
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_core::{ConnectionConfig, ConnectionFactory};
//! use conduit_mysql::MysqlConnector;
//!
//! let factory = ConnectionFactory::new().with_connector(MysqlConnector::new());
//! let config = ConnectionConfig::new()
//!     .with("driver", "mysql")
//!     .with("host", "127.0.0.1")
//!     .with("database", "app")
//!     .with("username", "app")
//!     .with("charset", "utf8mb4");
//!
//! let mut conn = factory.make(config, Some("mysql"))?;
//! let rows = conn.select("select * from users where id = ?", &[1.into()])?;
//! ```

pub mod config;
pub mod connector;
pub mod detector;
pub mod error;
pub mod handle;
pub mod types;

pub use config::{DEFAULT_PORT, MysqlConfig};
pub use connector::MysqlConnector;
pub use detector::{LOST_CONNECTION_CODES, MysqlLostConnectionDetector};
pub use error::{MysqlError, MysqlResult};
pub use handle::{MysqlHandle, MysqlStatement};
