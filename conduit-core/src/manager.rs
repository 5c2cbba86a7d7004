//! Named connection registry.
//!
//! [`DatabaseManager`] owns the configured connections of an application.
//! Connections are built on first request and cached by name, so a name
//! maps to exactly one [`Connection`] for the lifetime of the manager (or
//! until it is purged).
//!
//! ```rust,ignore
//! let settings: DatabaseSettings = serde_json::from_str(&std::fs::read_to_string("db.json")?)?;
//! let mut db = DatabaseManager::new(settings, factory);
//!
//! let users = db.connection(None)?.select("select * from users", &[])?;
//! let stats = db.connection(Some("analytics"))?.select("select 1", &[])?;
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::config::DatabaseSettings;
use crate::connection::Connection;
use crate::error::{ConfigError, Result};
use crate::factory::ConnectionFactory;

/// Resolves and caches connections by name.
#[derive(Debug)]
pub struct DatabaseManager {
    settings: DatabaseSettings,
    factory: ConnectionFactory,
    connections: HashMap<String, Connection>,
}

impl DatabaseManager {
    /// Create a manager. No connection is built until requested.
    pub fn new(settings: DatabaseSettings, factory: ConnectionFactory) -> Self {
        Self {
            settings,
            factory,
            connections: HashMap::new(),
        }
    }

    /// Get a connection by name, or the default connection for `None`.
    pub fn connection(&mut self, name: Option<&str>) -> Result<&mut Connection> {
        let name = self.resolve_name(name);
        match self.connections.entry(name) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let conn = Self::make_connection(&self.settings, &self.factory, entry.key())?;
                Ok(entry.insert(conn))
            }
        }
    }

    /// Name of the default connection.
    pub fn default_connection(&self) -> &str {
        &self.settings.default
    }

    /// Change the default connection.
    pub fn set_default_connection(&mut self, name: impl Into<String>) {
        self.settings.default = name.into();
    }

    /// Drop the handles of a cached connection. The connection stays cached
    /// and reconnects on its next statement.
    pub fn disconnect(&mut self, name: Option<&str>) -> Result<()> {
        let name = self.resolve_name(name);
        if let Some(conn) = self.connections.get_mut(&name) {
            conn.disconnect()?;
            debug!(name = %name, "Connection disconnected");
        }
        Ok(())
    }

    /// Re-establish a connection, building it if it is not cached yet.
    pub fn reconnect(&mut self, name: Option<&str>) -> Result<&mut Connection> {
        self.disconnect(name)?;

        let name = self.resolve_name(name);
        match self.connections.entry(name) {
            Entry::Occupied(entry) => {
                let conn = entry.into_mut();
                conn.reconnect()?;
                Ok(conn)
            }
            Entry::Vacant(entry) => {
                let conn = Self::make_connection(&self.settings, &self.factory, entry.key())?;
                Ok(entry.insert(conn))
            }
        }
    }

    /// Disconnect and forget a connection.
    pub fn purge(&mut self, name: Option<&str>) -> Result<()> {
        self.disconnect(name)?;
        let name = self.resolve_name(name);
        self.connections.remove(&name);
        Ok(())
    }

    /// Names of the cached connections, sorted.
    pub fn connections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The settings this manager was built with.
    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    /// The factory used to build connections.
    pub fn factory(&self) -> &ConnectionFactory {
        &self.factory
    }

    fn resolve_name(&self, name: Option<&str>) -> String {
        name.unwrap_or(self.settings.default.as_str()).to_string()
    }

    fn make_connection(
        settings: &DatabaseSettings,
        factory: &ConnectionFactory,
        name: &str,
    ) -> Result<Connection> {
        let config = settings
            .connections
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownConnection(name.to_string()))?;

        let mut conn = factory.make(config, Some(name))?;
        conn.set_fetch_mode(settings.fetch);
        Ok(conn)
    }
}
