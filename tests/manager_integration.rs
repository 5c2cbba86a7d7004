//! Integration tests for settings, the connection factory and the manager.
//!
//! These tests verify that:
//! - Settings deserialize from JSON and drive the manager
//! - Configuration errors surface before any database is opened
//! - Named connections are cached, reconnected and purged

#![cfg(feature = "sqlite")]

use conduit::prelude::*;
use conduit::{ConfigError, ErrorCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn settings(dir: &TempDir) -> DatabaseSettings {
    let main = dir.path().join("main.sqlite");
    let audit = dir.path().join("audit.sqlite");
    serde_json::from_value(json!({
        "default": "main",
        "fetch": "num",
        "connections": {
            "main": {"driver": "sqlite", "database": main.to_string_lossy(), "prefix": "app_"},
            "audit": {"driver": "sqlite", "database": audit.to_string_lossy()},
            "legacy": {"driver": "oracle", "database": "legacy"},
            "nameless": {"database": "x"}
        }
    }))
    .unwrap()
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_settings_deserialize() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);

    assert_eq!(settings.default, "main");
    assert_eq!(settings.fetch, FetchMode::Num);
    assert_eq!(settings.connections.len(), 4);
    assert_eq!(settings.connections["main"].prefix(), "app_");
}

#[test]
fn test_settings_defaults() {
    let settings: DatabaseSettings = serde_json::from_value(json!({"default": "main"})).unwrap();
    assert_eq!(settings.fetch, FetchMode::Assoc);
    assert!(settings.connections.is_empty());
}

// ============================================================================
// Manager
// ============================================================================

#[test]
fn test_default_connection() {
    let dir = TempDir::new().unwrap();
    let mut db = DatabaseManager::new(settings(&dir), default_factory());

    let conn = db.connection(None).unwrap();
    assert_eq!(conn.name(), Some("main"));
    assert_eq!(conn.driver_name(), Some("sqlite"));
    assert_eq!(conn.table_prefix(), "app_");
    assert_eq!(conn.fetch_mode(), FetchMode::Num);

    conn.statement("create table app_users (name text)", &[]).unwrap();
    conn.insert("insert into app_users values (?)", &bindings!["ada"])
        .unwrap();
    assert_eq!(
        conn.select("select name from app_users", &[]).unwrap(),
        vec![json!(["ada"])]
    );
}

#[test]
fn test_connections_are_cached_by_name() {
    let dir = TempDir::new().unwrap();
    let mut db = DatabaseManager::new(settings(&dir), default_factory());

    db.connection(Some("audit")).unwrap().enable_query_log();
    db.connection(Some("audit"))
        .unwrap()
        .statement("create table events (kind text)", &[])
        .unwrap();

    assert_eq!(db.connection(Some("audit")).unwrap().query_log().len(), 1);
    assert_eq!(db.connections(), vec!["audit"]);
}

#[test]
fn test_connections_are_isolated() {
    let dir = TempDir::new().unwrap();
    let mut db = DatabaseManager::new(settings(&dir), default_factory());

    db.connection(None)
        .unwrap()
        .statement("create table only_main (id integer)", &[])
        .unwrap();

    let err = db
        .connection(Some("audit"))
        .unwrap()
        .select("select * from only_main", &[])
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::QueryFailed);
}

#[test]
fn test_configuration_errors() {
    let dir = TempDir::new().unwrap();
    let mut db = DatabaseManager::new(settings(&dir), default_factory());

    let err = db.connection(Some("legacy")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsupportedDriver);
    assert!(err.is_config_error());

    let err = db.connection(Some("nameless")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingDriver);

    let err = db.connection(Some("warehouse")).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::UnknownConnection(ref name)) if name == "warehouse"
    ));

    assert!(db.connections().is_empty());
}

#[test]
fn test_disconnect_reconnect_and_purge() {
    let dir = TempDir::new().unwrap();
    let mut db = DatabaseManager::new(settings(&dir), default_factory());

    db.connection(None)
        .unwrap()
        .statement("create table kv (k text)", &[])
        .unwrap();
    db.disconnect(None).unwrap();
    assert!(!db.connection(None).unwrap().is_connected());

    // The file survives the handle.
    let conn = db.reconnect(None).unwrap();
    assert!(conn.is_connected());
    assert!(conn.select("select * from kv", &[]).unwrap().is_empty());

    db.purge(None).unwrap();
    assert!(db.connections().is_empty());
    db.connection(None)
        .unwrap()
        .insert("insert into kv values (?)", &bindings!["after purge"])
        .unwrap();
}

#[test]
fn test_set_default_connection() {
    let dir = TempDir::new().unwrap();
    let mut db = DatabaseManager::new(settings(&dir), default_factory());

    db.set_default_connection("audit");
    assert_eq!(db.default_connection(), "audit");
    assert_eq!(db.connection(None).unwrap().name(), Some("audit"));
}

// ============================================================================
// Factory
// ============================================================================

#[test]
fn test_default_factory_drivers() {
    let factory = default_factory();
    assert!(factory.drivers().contains(&"sqlite"));
}

#[test]
fn test_make_rejects_empty_host_list() {
    let config = ConnectionConfig::from_json(json!({
        "driver": "sqlite",
        "database": ":memory:",
        "host": []
    }))
    .unwrap();

    let err = default_factory().make(config, None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidConfiguration);
}

#[test]
fn test_read_block_without_write_block_splits() {
    let dir = TempDir::new().unwrap();
    let config = ConnectionConfig::from_json(json!({
        "driver": "sqlite",
        "database": dir.path().join("shared.sqlite").to_string_lossy(),
        "read": {}
    }))
    .unwrap();

    let resolved = default_factory().resolve(&config).unwrap();
    assert!(resolved.read.is_some());
    assert_eq!(resolved.write.database(), resolved.read.as_ref().and_then(|r| r.database()));
    assert!(!resolved.write.contains("read"));
}
