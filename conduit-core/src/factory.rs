//! Building connections from configuration.
//!
//! [`ConnectionFactory::make`] turns a [`ConnectionConfig`] into a
//! [`Connection`] without opening anything. Resolution goes like this:
//!
//! 1. `prefix` defaults to `""` and `name` is injected when missing.
//! 2. With a `read` or `write` block the connection is split: each side is
//!    the top-level config with its block merged over it. A block may be a
//!    list of blocks, in which case one is picked at random.
//! 3. A `host` list is reduced to a single host, picked at random.
//! 4. Each side gets a deferred call to its driver's [`Connector`].
//!
//! ```rust,ignore
//! let factory = ConnectionFactory::new().with_connector(SqliteConnector::new());
//!
//! let conn = factory.make(
//!     ConnectionConfig::from_json(json!({
//!         "driver": "mysql",
//!         "database": "app",
//!         "read": {"host": ["10.0.0.2", "10.0.0.3"]},
//!         "write": {"host": "10.0.0.1"}
//!     }))?,
//!     Some("main"),
//! )?;
//! ```
//!
//! The connection also gets a reconnector that repeats steps 2-4, so a
//! reconnect may land on a different host.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};

use crate::config::{ConnectionConfig, json_kind};
use crate::connection::{Connection, HandleFactory, Reconnector};
use crate::detector::LostConnectionDetector;
use crate::driver::Connector;
use crate::error::{ConfigError, Result};

/// The effective configs of a logical connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Config of the write side (the only side without a split).
    pub write: ConnectionConfig,
    /// Config of the read side, when the connection is split.
    pub read: Option<ConnectionConfig>,
}

/// Creates [`Connection`]s from configuration using registered connectors.
#[derive(Clone, Default)]
pub struct ConnectionFactory {
    connectors: HashMap<String, Arc<dyn Connector>>,
    detector: Option<Arc<dyn LostConnectionDetector>>,
}

impl ConnectionFactory {
    /// A factory with no connectors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector under its driver name.
    pub fn with_connector<C: Connector + 'static>(mut self, connector: C) -> Self {
        self.register(Arc::new(connector));
        self
    }

    /// Register a shared connector under its driver name, replacing any
    /// previous one.
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors
            .insert(connector.driver().to_string(), connector);
    }

    /// Use this detector for every connection instead of each connector's own.
    pub fn with_detector(mut self, detector: Arc<dyn LostConnectionDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Registered driver names, sorted.
    pub fn drivers(&self) -> Vec<&str> {
        let mut drivers: Vec<&str> = self.connectors.keys().map(String::as_str).collect();
        drivers.sort_unstable();
        drivers
    }

    /// The connector for the config's `driver`.
    pub fn connector(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connector>> {
        let driver = config.driver().ok_or(ConfigError::MissingDriver)?;
        self.connectors
            .get(driver)
            .cloned()
            .ok_or_else(|| ConfigError::UnsupportedDriver(driver.to_string()).into())
    }

    /// Build a connection. No handle is opened.
    pub fn make(&self, config: ConnectionConfig, name: Option<&str>) -> Result<Connection> {
        let config = parse_config(config, name);
        let resolved = self.resolve(&config)?;
        let handles = self.handle_factories(&resolved)?;

        let write_connector = self.connector(&resolved.write)?;
        let detector = self
            .detector
            .clone()
            .unwrap_or_else(|| write_connector.lost_connection_detector());

        info!(
            name = ?resolved.write.name(),
            driver = write_connector.driver(),
            split = resolved.read.is_some(),
            "Connection created"
        );

        let mut conn = Connection::new(
            handles.write,
            resolved.write.database().unwrap_or_default(),
            resolved.write.prefix(),
            resolved.write.clone(),
        )
        .with_dialect(write_connector.dialect())
        .with_detector(detector);

        if let Some(read) = handles.read {
            conn.set_read_factory(read);
        }

        conn.set_reconnector(self.reconnector(config));
        Ok(conn)
    }

    /// Resolve the effective write and read configs. Random choices are made
    /// anew on every call.
    pub fn resolve(&self, config: &ConnectionConfig) -> Result<ResolvedConfig> {
        if !config.contains("read") && !config.contains("write") {
            return Ok(ResolvedConfig {
                write: select_host(config.clone())?,
                read: None,
            });
        }

        let write = merge_read_write(config, &read_write_block(config, "write")?)?;
        let read = merge_read_write(config, &read_write_block(config, "read")?)?;
        Ok(ResolvedConfig {
            write,
            read: Some(read),
        })
    }

    fn handle_factories(&self, resolved: &ResolvedConfig) -> Result<ResolvedHandles> {
        let write = self.deferred_connect(&resolved.write)?;
        let read = match &resolved.read {
            Some(read) => Some(self.deferred_connect(read)?),
            None => None,
        };
        Ok(ResolvedHandles { write, read })
    }

    fn deferred_connect(&self, config: &ConnectionConfig) -> Result<HandleFactory> {
        let connector = self.connector(config)?;
        let config = config.clone();
        Ok(Arc::new(move || {
            debug!(driver = connector.driver(), host = ?config.host(), "Connecting");
            connector.connect(&config)
        }))
    }

    fn reconnector(&self, parsed: ConnectionConfig) -> Reconnector {
        let factory = self.clone();
        Arc::new(move |conn: &mut Connection| -> Result<()> {
            let resolved = factory.resolve(&parsed)?;
            let handles = factory.handle_factories(&resolved)?;
            conn.set_write_factory(handles.write)?;
            match handles.read {
                Some(read) => conn.set_read_factory(read),
                None => conn.set_read_handle(None),
            }
            info!(name = ?conn.name(), "Reconnected");
            Ok(())
        })
    }
}

impl fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("drivers", &self.drivers())
            .field("custom_detector", &self.detector.is_some())
            .finish()
    }
}

struct ResolvedHandles {
    write: HandleFactory,
    read: Option<HandleFactory>,
}

fn parse_config(mut config: ConnectionConfig, name: Option<&str>) -> ConnectionConfig {
    if !config.contains("prefix") {
        config.insert("prefix", "");
    }
    if let Some(name) = name {
        if config.name().is_none() {
            config.insert("name", name);
        }
    }
    config
}

fn read_write_block(config: &ConnectionConfig, key: &str) -> Result<Map<String, JsonValue>> {
    match config.get(key) {
        None | Some(JsonValue::Null) => Ok(Map::new()),
        Some(JsonValue::Object(block)) => Ok(block.clone()),
        Some(JsonValue::Array(blocks)) => match pick(blocks) {
            Some(JsonValue::Object(block)) => Ok(block.clone()),
            Some(other) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a list of objects, found {}", json_kind(other)),
            }
            .into()),
            None => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "list of blocks is empty".to_string(),
            }
            .into()),
        },
        Some(other) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an object, found {}", json_kind(other)),
        }
        .into()),
    }
}

fn merge_read_write(
    config: &ConnectionConfig,
    block: &Map<String, JsonValue>,
) -> Result<ConnectionConfig> {
    let mut merged = config.merged_with(block);
    merged.remove("read");
    merged.remove("write");
    select_host(merged)
}

fn select_host(mut config: ConnectionConfig) -> Result<ConnectionConfig> {
    let chosen = match config.get("host") {
        Some(JsonValue::Array(hosts)) => Some(pick(hosts).cloned().ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "host".to_string(),
                message: "host list is empty".to_string(),
            }
        })?),
        _ => None,
    };

    if let Some(host) = chosen {
        config.insert("host", host);
    }
    Ok(config)
}

/// One element uniformly at random; the only element of a single-item list.
fn pick(items: &[JsonValue]) -> Option<&JsonValue> {
    match items.len() {
        0 => None,
        1 => items.first(),
        n => items.get(rand::rng().random_range(0..n)),
    }
}
