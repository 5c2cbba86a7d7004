//! SQLite connector.

use conduit_core::{ConnectionConfig, Connector, DriverOptions, DriverResult, Handle};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::SqliteConfig;
use crate::handle::SqliteHandle;

/// Opens [`SqliteHandle`]s for configs with `"driver": "sqlite"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl SqliteConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

impl Connector for SqliteConnector {
    fn driver(&self) -> &str {
        "sqlite"
    }

    fn connect(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn Handle>> {
        let options = self.options(config);
        let sqlite = SqliteConfig::from_config(config, &options)?;
        debug!(database = config.database().unwrap_or_default(), "Opening SQLite handle");
        Ok(Box::new(SqliteHandle::open(&sqlite)?))
    }

    fn default_options(&self) -> DriverOptions {
        let mut options = DriverOptions::new();
        options.insert("foreign_keys".into(), JsonValue::Bool(true));
        options.insert("busy_timeout".into(), JsonValue::from(5000));
        options
    }
}
