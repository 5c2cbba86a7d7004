//! MySQL connector.

use std::sync::Arc;

use conduit_core::{
    ConnectionConfig, Connector, DriverOptions, DriverResult, Handle, LostConnectionDetector,
};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::MysqlConfig;
use crate::detector::MysqlLostConnectionDetector;
use crate::handle::MysqlHandle;

/// Opens [`MysqlHandle`]s for configs with `"driver": "mysql"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlConnector;

impl MysqlConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }

    /// Resolve the client settings for a config without connecting.
    pub fn client_config(&self, config: &ConnectionConfig) -> DriverResult<MysqlConfig> {
        Ok(MysqlConfig::from_config(config, &self.options(config))?)
    }
}

impl Connector for MysqlConnector {
    fn driver(&self) -> &str {
        "mysql"
    }

    fn connect(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn Handle>> {
        let mysql = self.client_config(config)?;
        debug!(
            address = %mysql.address(),
            session_statements = mysql.session_statements().len(),
            "Opening MySQL handle"
        );
        Ok(Box::new(MysqlHandle::open(&mysql)?))
    }

    fn default_options(&self) -> DriverOptions {
        let mut options = DriverOptions::new();
        options.insert("tcp_nodelay".into(), JsonValue::Bool(true));
        options
    }

    fn lost_connection_detector(&self) -> Arc<dyn LostConnectionDetector> {
        Arc::new(MysqlLostConnectionDetector::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{ConnectionFactory, DriverError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_client_config() {
        let config = ConnectionConfig::from_json(json!({
            "driver": "mysql",
            "host": "foo",
            "database": "bar",
            "collation": "utf8_unicode_ci",
            "charset": "utf8",
            "options": {"stmt_cache_size": 16}
        }))
        .unwrap();

        let mysql = MysqlConnector::new().client_config(&config).unwrap();
        assert_eq!(mysql.address(), "foo:3306");
        assert!(mysql.tcp_nodelay);
        assert_eq!(mysql.stmt_cache_size, Some(16));
        assert_eq!(
            mysql.session_statements(),
            vec!["set names 'utf8' collate 'utf8_unicode_ci'".to_string()]
        );
    }

    #[test]
    fn test_invalid_config_fails_before_connecting() {
        let config = ConnectionConfig::new().with("driver", "mysql").with("port", "abc");
        let err = MysqlConnector::new().connect(&config).err().unwrap();
        assert!(err.message().starts_with("Configuration error"));
    }

    #[test]
    fn test_connector_detector() {
        let detector = MysqlConnector::new().lost_connection_detector();
        assert!(detector.caused_by_lost_connection(&DriverError::new("x").with_code("2013")));
    }

    #[test]
    fn test_factory_is_lazy() {
        let factory = ConnectionFactory::new().with_connector(MysqlConnector::new());
        let config = ConnectionConfig::from_json(json!({
            "driver": "mysql",
            "database": "app",
            "read": {"host": ["10.0.0.2", "10.0.0.3"]},
            "write": {"host": "10.0.0.1"}
        }))
        .unwrap();

        // No server is needed until a statement runs.
        let conn = factory.make(config, Some("mysql")).unwrap();
        assert!(!conn.has_open_handle());
        assert!(conn.has_read_handle());
        assert_eq!(conn.database_name(), "app");
    }
}
