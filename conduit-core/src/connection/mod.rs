//! The stateful connection: handles, statement execution and query log.
//!
//! A [`Connection`] owns a write handle and an optional read handle, both
//! held lazily: nothing touches the network until a statement needs a handle.
//!
//! Every statement goes through the same pipeline:
//!
//! 1. If the write handle is gone, the reconnector re-installs it.
//! 2. Bindings are normalized with [`prepare_bindings`](crate::prepare_bindings).
//! 3. The statement runs. A failure is wrapped in a [`QueryError`] carrying
//!    the SQL and the prepared bindings.
//! 4. If the failure looks like a lost connection and no transaction is open,
//!    the connection reconnects and runs the statement once more.
//! 5. The elapsed time is recorded in the query log, when enabled.
//!
//! ```rust,ignore
//! let mut conn = factory.make(config, Some("main"))?;
//!
//! conn.insert("insert into users (name) values (?)", &bindings!["ada"])?;
//! let rows = conn.select("select * from users where name = ?", &bindings!["ada"])?;
//!
//! conn.transaction(|conn| {
//!     conn.update("update users set active = ?", &bindings![true])?;
//!     Ok::<_, conduit_core::Error>(())
//! })?;
//! ```

mod slot;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

pub use slot::HandleFactory;
pub(crate) use slot::HandleSlot;

use crate::conduit_trace;
use crate::config::{ConnectionConfig, FetchMode};
use crate::detector::{LostConnectionDetector, PhraseDetector};
use crate::driver::{Dialect, DriverResult, Handle, Row, StandardDialect};
use crate::error::{ConnectionStateError, Error, QueryError, Result};
use crate::query_log::{QueryLog, QueryLogEntry};
use crate::value::{Value, prepare_bindings};

/// Callback that re-establishes the handles of a connection.
pub type Reconnector = Arc<dyn Fn(&mut Connection) -> Result<()> + Send + Sync>;

/// A logical database connection.
pub struct Connection {
    pub(crate) write: HandleSlot,
    pub(crate) read: HandleSlot,
    reconnector: Option<Reconnector>,
    detector: Arc<dyn LostConnectionDetector>,
    pub(crate) dialect: Arc<dyn Dialect>,
    pub(crate) transactions: u32,
    pretending: bool,
    log: QueryLog,
    database: String,
    prefix: String,
    fetch_mode: FetchMode,
    config: ConnectionConfig,
}

impl Connection {
    /// Create a connection whose write handle is opened by `factory` on
    /// first use.
    pub fn new(
        factory: HandleFactory,
        database: impl Into<String>,
        prefix: impl Into<String>,
        config: ConnectionConfig,
    ) -> Self {
        Self::with_slot(HandleSlot::Unresolved(factory), database.into(), prefix.into(), config)
    }

    /// Create a connection around an already open handle.
    pub fn from_handle(
        handle: Box<dyn Handle>,
        database: impl Into<String>,
        prefix: impl Into<String>,
        config: ConnectionConfig,
    ) -> Self {
        Self::with_slot(HandleSlot::Resolved(handle), database.into(), prefix.into(), config)
    }

    fn with_slot(write: HandleSlot, database: String, prefix: String, config: ConnectionConfig) -> Self {
        Self {
            write,
            read: HandleSlot::Disconnected,
            reconnector: None,
            detector: Arc::new(PhraseDetector::default()),
            dialect: Arc::new(StandardDialect),
            transactions: 0,
            pretending: false,
            log: QueryLog::default(),
            database,
            prefix,
            fetch_mode: FetchMode::default(),
            config,
        }
    }

    /// Replace the SQL grammar.
    pub fn with_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    /// Replace the lost-connection classifier.
    pub fn with_detector(mut self, detector: Arc<dyn LostConnectionDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Attach a reconnector.
    pub fn with_reconnector(mut self, reconnector: Reconnector) -> Self {
        self.reconnector = Some(reconnector);
        self
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Run a select and return every row. Uses the read handle unless a
    /// transaction is open.
    pub fn select(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        self.select_with(sql, bindings, true)
    }

    /// Run a select against the write handle.
    pub fn select_from_write_connection(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        self.select_with(sql, bindings, false)
    }

    /// Run a select, choosing the handle with `use_read`.
    pub fn select_with(&mut self, sql: &str, bindings: &[Value], use_read: bool) -> Result<Vec<Row>> {
        self.run(sql, bindings, move |conn, sql, bindings| {
            if conn.pretending {
                return Ok(Vec::new());
            }

            let mode = conn.fetch_mode;
            let handle = conn.handle_for_select(use_read)?;
            let mut statement = handle.prepare(sql)?;
            statement.execute(bindings)?;
            statement.fetch_all(mode)
        })
    }

    /// Run a select and return the first row, if any.
    pub fn select_one(&mut self, sql: &str, bindings: &[Value]) -> Result<Option<Row>> {
        Ok(self.select(sql, bindings)?.into_iter().next())
    }

    /// Run an insert statement.
    pub fn insert(&mut self, sql: &str, bindings: &[Value]) -> Result<bool> {
        self.statement(sql, bindings)
    }

    /// Run an update statement and return the number of affected rows.
    pub fn update(&mut self, sql: &str, bindings: &[Value]) -> Result<u64> {
        self.affecting_statement(sql, bindings)
    }

    /// Run a delete statement and return the number of affected rows.
    pub fn delete(&mut self, sql: &str, bindings: &[Value]) -> Result<u64> {
        self.affecting_statement(sql, bindings)
    }

    /// Execute a statement and return whether it succeeded.
    pub fn statement(&mut self, sql: &str, bindings: &[Value]) -> Result<bool> {
        self.run(sql, bindings, |conn, sql, bindings| {
            if conn.pretending {
                return Ok(true);
            }

            let handle = conn.write.resolve()?;
            let mut statement = handle.prepare(sql)?;
            statement.execute(bindings)
        })
    }

    /// Execute a statement and return the number of affected rows.
    pub fn affecting_statement(&mut self, sql: &str, bindings: &[Value]) -> Result<u64> {
        self.run(sql, bindings, |conn, sql, bindings| {
            if conn.pretending {
                return Ok(0);
            }

            let handle = conn.write.resolve()?;
            let mut statement = handle.prepare(sql)?;
            statement.execute(bindings)?;
            Ok(statement.row_count())
        })
    }

    /// Execute raw SQL on the write handle without preparing it.
    pub fn unprepared(&mut self, sql: &str) -> Result<bool> {
        self.run(sql, &[], |conn, sql, _| {
            if conn.pretending {
                return Ok(true);
            }

            conn.write.resolve()?.exec(sql)?;
            Ok(true)
        })
    }

    /// Normalize bindings with this connection's date format.
    pub fn prepare_bindings(&self, bindings: &[Value]) -> Vec<Value> {
        prepare_bindings(bindings, self.dialect.date_format())
    }

    fn handle_for_select(&mut self, use_read: bool) -> DriverResult<&mut dyn Handle> {
        if use_read && self.transactions == 0 && !self.read.is_disconnected() {
            return self.read.resolve();
        }
        self.write.resolve()
    }

    // ------------------------------------------------------------------
    // Execution pipeline
    // ------------------------------------------------------------------

    fn run<T, F>(&mut self, sql: &str, bindings: &[Value], operation: F) -> Result<T>
    where
        F: Fn(&mut Self, &str, &[Value]) -> DriverResult<T>,
    {
        self.reconnect_if_missing_connection()?;

        let prepared = self.prepare_bindings(bindings);
        conduit_trace!(sql = %sql, bindings = ?prepared, "Running statement");
        let start = Instant::now();

        let result = match self.run_query_callback(sql, &prepared, &operation) {
            Ok(result) => result,
            Err(err) => self.try_again_if_caused_by_lost_connection(err, sql, &prepared, &operation)?,
        };

        let entry = QueryLogEntry::new(sql, prepared, start.elapsed());
        debug!(sql = %sql, elapsed_ms = entry.time, pretending = self.pretending, "Statement executed");
        self.log.record(entry);

        Ok(result)
    }

    fn run_query_callback<T, F>(
        &mut self,
        sql: &str,
        prepared: &[Value],
        operation: &F,
    ) -> std::result::Result<T, QueryError>
    where
        F: Fn(&mut Self, &str, &[Value]) -> DriverResult<T>,
    {
        operation(self, sql, prepared).map_err(|e| QueryError::new(sql, prepared.to_vec(), e))
    }

    fn try_again_if_caused_by_lost_connection<T, F>(
        &mut self,
        err: QueryError,
        sql: &str,
        prepared: &[Value],
        operation: &F,
    ) -> Result<T>
    where
        F: Fn(&mut Self, &str, &[Value]) -> DriverResult<T>,
    {
        if !self.detector.caused_by_lost_connection(err.driver_error()) {
            return Err(err.into());
        }

        if self.transactions > 0 {
            warn!(
                depth = self.transactions,
                error = %err.driver_error(),
                "Connection lost inside a transaction"
            );
            return Err(Error::ConnectionLostInTransaction(err));
        }

        warn!(error = %err.driver_error(), "Lost connection, reconnecting and retrying once");
        self.reconnect()?;
        Ok(self.run_query_callback(sql, prepared, operation)?)
    }

    // ------------------------------------------------------------------
    // Handles
    // ------------------------------------------------------------------

    /// Re-establish the handles through the reconnector.
    pub fn reconnect(&mut self) -> Result<()> {
        let reconnector = self
            .reconnector
            .clone()
            .ok_or(ConnectionStateError::NoReconnector)?;
        reconnector(self)
    }

    pub(crate) fn reconnect_if_missing_connection(&mut self) -> Result<()> {
        if self.write.is_disconnected() {
            self.reconnect()?;
        }
        Ok(())
    }

    /// Drop both handles. Fails inside a transaction.
    pub fn disconnect(&mut self) -> Result<()> {
        self.ensure_no_transaction()?;
        self.write = HandleSlot::Disconnected;
        self.read = HandleSlot::Disconnected;
        debug!(name = ?self.name(), "Disconnected");
        Ok(())
    }

    /// Install an open write handle. Fails inside a transaction.
    pub fn set_write_handle(&mut self, handle: Box<dyn Handle>) -> Result<()> {
        self.ensure_no_transaction()?;
        self.write = HandleSlot::Resolved(handle);
        Ok(())
    }

    /// Install a pending write handle. Fails inside a transaction.
    pub fn set_write_factory(&mut self, factory: HandleFactory) -> Result<()> {
        self.ensure_no_transaction()?;
        self.write = HandleSlot::Unresolved(factory);
        Ok(())
    }

    /// Install an open read handle, or clear it so reads use the write handle.
    pub fn set_read_handle(&mut self, handle: Option<Box<dyn Handle>>) {
        self.read = match handle {
            Some(handle) => HandleSlot::Resolved(handle),
            None => HandleSlot::Disconnected,
        };
    }

    /// Install a pending read handle.
    pub fn set_read_factory(&mut self, factory: HandleFactory) {
        self.read = HandleSlot::Unresolved(factory);
    }

    /// Replace the reconnector.
    pub fn set_reconnector(&mut self, reconnector: Reconnector) {
        self.reconnector = Some(reconnector);
    }

    /// Whether a write handle is installed, open or pending.
    pub fn is_connected(&self) -> bool {
        !self.write.is_disconnected()
    }

    /// Whether the write handle has actually been opened.
    pub fn has_open_handle(&self) -> bool {
        self.write.is_resolved()
    }

    /// Whether a separate read handle is configured.
    pub fn has_read_handle(&self) -> bool {
        !self.read.is_disconnected()
    }

    fn ensure_no_transaction(&self) -> Result<()> {
        if self.transactions >= 1 {
            return Err(ConnectionStateError::HandleSwapInTransaction {
                depth: self.transactions,
            }
            .into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pretend mode and the query log
    // ------------------------------------------------------------------

    /// Run `work` without touching the database and return the statements
    /// it would have executed.
    ///
    /// The query log is emptied on entry and on exit, whether or not `work`
    /// fails.
    ///
    /// Selects return no rows, inserts and raw statements report success and
    /// updates report zero affected rows.
    pub fn pretend<F, E>(&mut self, work: F) -> std::result::Result<Vec<QueryLogEntry>, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<(), E>,
    {
        let logging = self.log.is_enabled();

        self.log.set_enabled(true);
        self.log.clear();
        self.pretending = true;

        let outcome = work(self);

        self.pretending = false;
        self.log.set_enabled(logging);
        let captured = self.log.take();

        outcome?;
        Ok(captured)
    }

    /// Whether the connection is inside [`pretend`](Self::pretend).
    pub fn pretending(&self) -> bool {
        self.pretending
    }

    /// Start recording executed statements.
    pub fn enable_query_log(&mut self) {
        self.log.set_enabled(true);
    }

    /// Stop recording executed statements.
    pub fn disable_query_log(&mut self) {
        self.log.set_enabled(false);
    }

    /// Whether statements are being recorded.
    pub fn logging(&self) -> bool {
        self.log.is_enabled()
    }

    /// Recorded statements, oldest first.
    pub fn query_log(&self) -> &[QueryLogEntry] {
        self.log.entries()
    }

    /// Clear the recorded statements.
    pub fn flush_query_log(&mut self) {
        self.log.clear();
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Logical name, from the `name` config key.
    pub fn name(&self) -> Option<&str> {
        self.config.name()
    }

    /// Driver name, from the `driver` config key.
    pub fn driver_name(&self) -> Option<&str> {
        self.config.driver()
    }

    /// Configuration value by dot-separated path.
    pub fn config(&self, key: &str) -> Option<&JsonValue> {
        self.config.get(key)
    }

    /// The full configuration.
    pub fn config_map(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Name of the connected database.
    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Change the recorded database name.
    pub fn set_database_name(&mut self, database: impl Into<String>) {
        self.database = database.into();
    }

    /// Table-name prefix.
    pub fn table_prefix(&self) -> &str {
        &self.prefix
    }

    /// Change the table-name prefix.
    pub fn set_table_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    /// Row shape returned by selects.
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    /// Change the row shape returned by selects.
    pub fn set_fetch_mode(&mut self, mode: FetchMode) {
        self.fetch_mode = mode;
    }

    /// The SQL grammar in use.
    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// Current transaction depth. Zero when no transaction is open.
    pub fn transaction_level(&self) -> u32 {
        self.transactions
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name())
            .field("database", &self.database)
            .field("write", &self.write)
            .field("read", &self.read)
            .field("transactions", &self.transactions)
            .field("pretending", &self.pretending)
            .finish_non_exhaustive()
    }
}
