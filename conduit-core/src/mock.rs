//! Scriptable in-memory driver used by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::config::{ConnectionConfig, FetchMode};
use crate::connection::HandleFactory;
use crate::driver::{Connector, DriverError, DriverResult, Handle, Row, Statement};
use crate::value::Value;

#[derive(Default)]
struct MockState {
    calls: Vec<String>,
    failures: VecDeque<String>,
    connect_failures: VecDeque<String>,
    connects: Vec<ConnectionConfig>,
    rows: Vec<Row>,
    affected: u64,
}

/// Shared journal and script for mock handles.
#[derive(Clone, Default)]
pub(crate) struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every call made against any handle, as `"<label>: <call>"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Fail the next driver operation with this message.
    pub(crate) fn fail_next(&self, message: &str) {
        self.state.lock().failures.push_back(message.to_string());
    }

    /// Fail the next connect attempt with this message.
    pub(crate) fn fail_next_connect(&self, message: &str) {
        self.state.lock().connect_failures.push_back(message.to_string());
    }

    pub(crate) fn set_rows(&self, rows: Vec<Row>) {
        self.state.lock().rows = rows;
    }

    pub(crate) fn set_affected(&self, affected: u64) {
        self.state.lock().affected = affected;
    }

    /// Configs passed to [`MockConnector::connect`], in order.
    pub(crate) fn connects(&self) -> Vec<ConnectionConfig> {
        self.state.lock().connects.clone()
    }

    /// Factory producing handles labelled `label`.
    pub(crate) fn factory(&self, label: &str) -> HandleFactory {
        let driver = self.clone();
        let label = label.to_string();
        Arc::new(move || driver.open(&label))
    }

    fn open(&self, label: &str) -> DriverResult<Box<dyn Handle>> {
        let mut state = self.state.lock();
        state.calls.push(format!("{label}: connect"));
        if let Some(message) = state.connect_failures.pop_front() {
            return Err(DriverError::new(message));
        }
        drop(state);
        Ok(Box::new(MockHandle::new(self.clone(), label)))
    }

    fn record(&self, label: &str, call: String) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("{label}: {call}"));
        match state.failures.pop_front() {
            Some(message) => Err(DriverError::new(message)),
            None => Ok(()),
        }
    }
}

pub(crate) struct MockHandle {
    driver: MockDriver,
    label: String,
}

impl MockHandle {
    pub(crate) fn new(driver: MockDriver, label: &str) -> Self {
        Self {
            driver,
            label: label.to_string(),
        }
    }
}

impl Handle for MockHandle {
    fn prepare<'a>(&'a mut self, sql: &str) -> DriverResult<Box<dyn Statement + 'a>> {
        Ok(Box::new(MockStatement {
            driver: self.driver.clone(),
            label: self.label.clone(),
            sql: sql.to_string(),
            affected: 0,
        }))
    }

    fn exec(&mut self, sql: &str) -> DriverResult<u64> {
        self.driver.record(&self.label, format!("exec {sql}"))?;
        Ok(self.driver.state.lock().affected)
    }

    fn begin_transaction(&mut self) -> DriverResult<()> {
        self.driver.record(&self.label, "begin".to_string())
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.driver.record(&self.label, "commit".to_string())
    }

    fn roll_back(&mut self) -> DriverResult<()> {
        self.driver.record(&self.label, "rollback".to_string())
    }
}

struct MockStatement {
    driver: MockDriver,
    label: String,
    sql: String,
    affected: u64,
}

impl Statement for MockStatement {
    fn execute(&mut self, bindings: &[Value]) -> DriverResult<bool> {
        let rendered: Vec<String> = bindings.iter().map(Value::to_sql_literal).collect();
        self.driver.record(
            &self.label,
            format!("execute {} [{}]", self.sql, rendered.join(", ")),
        )?;
        self.affected = self.driver.state.lock().affected;
        Ok(true)
    }

    fn fetch_all(&mut self, mode: FetchMode) -> DriverResult<Vec<Row>> {
        let rows = self.driver.state.lock().rows.clone();
        Ok(match mode {
            FetchMode::Assoc => rows,
            FetchMode::Num => rows
                .into_iter()
                .map(|row| match row {
                    JsonValue::Object(map) => JsonValue::Array(map.into_iter().map(|(_, v)| v).collect()),
                    other => other,
                })
                .collect(),
        })
    }

    fn row_count(&self) -> u64 {
        self.affected
    }
}

/// Connector whose handles are labelled with the configured host.
pub(crate) struct MockConnector {
    driver: MockDriver,
}

impl MockConnector {
    pub(crate) fn new(driver: MockDriver) -> Self {
        Self { driver }
    }
}

impl Connector for MockConnector {
    fn driver(&self) -> &str {
        "mock"
    }

    fn connect(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn Handle>> {
        self.driver.state.lock().connects.push(config.clone());
        let label = config.host().or(config.database()).unwrap_or("default");
        self.driver.open(label)
    }
}
