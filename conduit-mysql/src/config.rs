//! MySQL configuration.
//!
//! A [`MysqlConfig`] is built from a resolved connection config:
//!
//! ```json
//! {
//!     "driver": "mysql",
//!     "host": "10.0.0.1",
//!     "port": 3306,
//!     "database": "app",
//!     "username": "app",
//!     "password": "secret",
//!     "charset": "utf8mb4",
//!     "collation": "utf8mb4_unicode_ci",
//!     "timezone": "+00:00",
//!     "strict": true
//! }
//! ```
//!
//! `unix_socket`, when present, takes precedence over `host` and `port`.

use conduit_core::{ConnectionConfig, DriverOptions};
use mysql_async::OptsBuilder;
use serde_json::Value as JsonValue;

use crate::error::{MysqlError, MysqlResult};

/// Default MySQL port.
pub const DEFAULT_PORT: u16 = 3306;

/// MySQL connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MysqlConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Unix socket path, used instead of TCP when set.
    pub unix_socket: Option<String>,
    /// Database name.
    pub database: Option<String>,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Connection character set.
    pub charset: Option<String>,
    /// Connection collation, only applied together with a charset.
    pub collation: Option<String>,
    /// Session time zone.
    pub timezone: Option<String>,
    /// Strict SQL mode. `None` leaves the server's mode untouched.
    pub strict: Option<bool>,
    /// Explicit SQL modes, overriding `strict`.
    pub modes: Option<Vec<String>>,
    /// Disable Nagle's algorithm.
    pub tcp_nodelay: bool,
    /// Server-side statement cache size.
    pub stmt_cache_size: Option<usize>,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            unix_socket: None,
            database: None,
            username: None,
            password: None,
            charset: None,
            collation: None,
            timezone: None,
            strict: None,
            modes: None,
            tcp_nodelay: true,
            stmt_cache_size: None,
        }
    }
}

impl MysqlConfig {
    /// Build from a resolved connection config and the connector's options.
    pub fn from_config(config: &ConnectionConfig, options: &DriverOptions) -> MysqlResult<Self> {
        let port = config
            .port()
            .map_err(|e| MysqlError::config(e.to_string()))?
            .unwrap_or(DEFAULT_PORT);

        let modes = match config.get("modes") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Array(items)) => Some(
                items
                    .iter()
                    .map(|m| {
                        m.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| MysqlError::config("[modes] must be a list of strings"))
                    })
                    .collect::<MysqlResult<Vec<_>>>()?,
            ),
            Some(_) => return Err(MysqlError::config("[modes] must be a list of strings")),
        };

        let mut mysql = Self {
            host: config.host().unwrap_or("localhost").to_string(),
            port,
            unix_socket: owned(config.get_str("unix_socket")),
            database: owned(config.database()),
            username: owned(config.username()),
            password: owned(config.password()),
            charset: owned(config.charset()),
            collation: owned(config.collation()),
            timezone: owned(config.get_str("timezone")),
            strict: config.get_bool("strict"),
            modes,
            ..Default::default()
        };

        if let Some(value) = options.get("tcp_nodelay") {
            mysql.tcp_nodelay = value
                .as_bool()
                .ok_or_else(|| invalid_option("tcp_nodelay", value))?;
        }
        if let Some(value) = options.get("stmt_cache_size") {
            mysql.stmt_cache_size = Some(
                value
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| invalid_option("stmt_cache_size", value))?,
            );
        }

        Ok(mysql)
    }

    /// Statements run on every new session, in order.
    pub fn session_statements(&self) -> Vec<String> {
        let mut statements = Vec::new();

        if let Some(charset) = &self.charset {
            let mut names = format!("set names '{}'", escape(charset));
            if let Some(collation) = &self.collation {
                names.push_str(&format!(" collate '{}'", escape(collation)));
            }
            statements.push(names);
        }

        if let Some(timezone) = &self.timezone {
            statements.push(format!("set time_zone='{}'", escape(timezone)));
        }

        match (&self.modes, self.strict) {
            (Some(modes), _) => {
                statements.push(format!("set session sql_mode='{}'", escape(&modes.join(","))));
            }
            (None, Some(true)) => {
                statements.push("set session sql_mode='STRICT_ALL_TABLES'".to_string());
            }
            (None, Some(false)) => {
                statements.push("set session sql_mode='NO_ENGINE_SUBSTITUTION'".to_string());
            }
            (None, None) => {}
        }

        statements
    }

    /// Convert to mysql_async OptsBuilder.
    pub fn to_opts_builder(&self) -> OptsBuilder {
        let mut builder = OptsBuilder::default()
            .db_name(self.database.as_deref())
            .user(self.username.as_deref())
            .pass(self.password.as_deref())
            .tcp_nodelay(self.tcp_nodelay)
            .prefer_socket(false)
            .init(self.session_statements());

        builder = match &self.unix_socket {
            Some(socket) => builder.socket(Some(socket.as_str())),
            None => builder.ip_or_hostname(self.host.as_str()).tcp_port(self.port),
        };

        if let Some(size) = self.stmt_cache_size {
            builder = builder.stmt_cache_size(size);
        }

        builder
    }

    /// Where this config connects, for logs.
    pub fn address(&self) -> String {
        match &self.unix_socket {
            Some(socket) => format!("unix:{}", socket),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

fn invalid_option(key: &str, value: &JsonValue) -> MysqlError {
    MysqlError::config(format!("invalid value for option [{}]: {}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config(value: JsonValue) -> ConnectionConfig {
        ConnectionConfig::from_json(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let mysql = MysqlConfig::from_config(&ConnectionConfig::new(), &DriverOptions::new()).unwrap();
        assert_eq!(mysql, MysqlConfig::default());
        assert_eq!(mysql.address(), "localhost:3306");
        assert!(mysql.session_statements().is_empty());
    }

    #[test]
    fn test_from_config() {
        let mysql = MysqlConfig::from_config(
            &config(json!({
                "host": "foo",
                "port": 111,
                "database": "bar",
                "username": "root",
                "password": "secret",
                "collation": "utf8_unicode_ci",
                "charset": "utf8"
            })),
            &DriverOptions::new(),
        )
        .unwrap();

        assert_eq!(mysql.host, "foo");
        assert_eq!(mysql.port, 111);
        assert_eq!(mysql.database.as_deref(), Some("bar"));
        assert_eq!(mysql.username.as_deref(), Some("root"));
        assert_eq!(mysql.password.as_deref(), Some("secret"));
        assert_eq!(mysql.address(), "foo:111");
    }

    #[test]
    fn test_unix_socket_wins_over_host() {
        let mysql = MysqlConfig::from_config(
            &config(json!({"host": "foo", "port": 111, "unix_socket": "baz", "database": "bar"})),
            &DriverOptions::new(),
        )
        .unwrap();
        assert_eq!(mysql.unix_socket.as_deref(), Some("baz"));
        assert_eq!(mysql.address(), "unix:baz");
    }

    #[test]
    fn test_port_as_string() {
        let mysql = MysqlConfig::from_config(&config(json!({"port": "3307"})), &DriverOptions::new())
            .unwrap();
        assert_eq!(mysql.port, 3307);
    }

    #[test]
    fn test_invalid_port() {
        let err = MysqlConfig::from_config(&config(json!({"port": 70000})), &DriverOptions::new())
            .unwrap_err();
        assert!(matches!(err, MysqlError::Config(_)));
    }

    #[test]
    fn test_names_statement() {
        let mysql = MysqlConfig {
            charset: Some("utf8".into()),
            collation: Some("utf8_unicode_ci".into()),
            ..Default::default()
        };
        assert_eq!(
            mysql.session_statements(),
            vec!["set names 'utf8' collate 'utf8_unicode_ci'".to_string()]
        );

        let mysql = MysqlConfig {
            charset: Some("utf8mb4".into()),
            ..Default::default()
        };
        assert_eq!(mysql.session_statements(), vec!["set names 'utf8mb4'".to_string()]);
    }

    #[test]
    fn test_collation_without_charset_is_ignored() {
        let mysql = MysqlConfig {
            collation: Some("utf8_unicode_ci".into()),
            ..Default::default()
        };
        assert!(mysql.session_statements().is_empty());
    }

    #[test]
    fn test_session_statements_order() {
        let mysql = MysqlConfig::from_config(
            &config(json!({
                "charset": "utf8",
                "collation": "utf8_unicode_ci",
                "timezone": "+00:00",
                "strict": false
            })),
            &DriverOptions::new(),
        )
        .unwrap();

        assert_eq!(
            mysql.session_statements(),
            vec![
                "set names 'utf8' collate 'utf8_unicode_ci'".to_string(),
                "set time_zone='+00:00'".to_string(),
                "set session sql_mode='NO_ENGINE_SUBSTITUTION'".to_string(),
            ]
        );
    }

    #[test]
    fn test_strict_and_explicit_modes() {
        let strict = MysqlConfig {
            strict: Some(true),
            ..Default::default()
        };
        assert_eq!(
            strict.session_statements(),
            vec!["set session sql_mode='STRICT_ALL_TABLES'".to_string()]
        );

        let mysql = MysqlConfig::from_config(
            &config(json!({"strict": true, "modes": ["STRICT_TRANS_TABLES", "NO_ZERO_DATE"]})),
            &DriverOptions::new(),
        )
        .unwrap();
        assert_eq!(
            mysql.session_statements(),
            vec!["set session sql_mode='STRICT_TRANS_TABLES,NO_ZERO_DATE'".to_string()]
        );
    }

    #[test]
    fn test_invalid_modes() {
        let err = MysqlConfig::from_config(&config(json!({"modes": "STRICT"})), &DriverOptions::new())
            .unwrap_err();
        assert!(err.to_string().contains("[modes]"));
    }

    #[test]
    fn test_quotes_are_escaped() {
        let mysql = MysqlConfig {
            timezone: Some("x'y".into()),
            ..Default::default()
        };
        assert_eq!(mysql.session_statements(), vec!["set time_zone='x''y'".to_string()]);
    }

    #[test]
    fn test_options() {
        let mut options = DriverOptions::new();
        options.insert("tcp_nodelay".into(), json!(false));
        options.insert("stmt_cache_size".into(), json!(64));

        let mysql = MysqlConfig::from_config(&ConnectionConfig::new(), &options).unwrap();
        assert!(!mysql.tcp_nodelay);
        assert_eq!(mysql.stmt_cache_size, Some(64));

        options.insert("stmt_cache_size".into(), json!("lots"));
        assert!(MysqlConfig::from_config(&ConnectionConfig::new(), &options).is_err());
    }
}
