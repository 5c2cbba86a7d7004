//! MySQL handle and prepared statements.
//!
//! `mysql_async` is asynchronous; each handle owns a current-thread `tokio`
//! runtime and blocks on it. Handles must therefore not be used from inside
//! another async runtime.

use std::fmt;

use conduit_core::{DriverResult, FetchMode, Handle, Row, Statement, Value, build_row};
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Params};
use serde_json::Value as JsonValue;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::config::MysqlConfig;
use crate::error::{MysqlError, MysqlResult};
use crate::types::{from_mysql_value, to_mysql_value};

/// An open MySQL session.
pub struct MysqlHandle {
    runtime: Runtime,
    conn: Option<Conn>,
}

impl MysqlHandle {
    /// Connect and run the session statements.
    pub fn open(config: &MysqlConfig) -> MysqlResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(MysqlError::Runtime)?;
        let conn = runtime.block_on(Conn::new(config.to_opts_builder()))?;

        debug!(
            address = %config.address(),
            connection_id = conn.id(),
            "MySQL connection opened"
        );
        Ok(Self {
            runtime,
            conn: Some(conn),
        })
    }

    /// Server-side id of this session, while open.
    pub fn connection_id(&self) -> Option<u32> {
        self.conn.as_ref().map(Conn::id)
    }

    fn parts(&mut self) -> MysqlResult<(&Runtime, &mut Conn)> {
        let conn = self.conn.as_mut().ok_or(MysqlError::Closed)?;
        Ok((&self.runtime, conn))
    }

    fn query_drop(&mut self, sql: &str) -> MysqlResult<u64> {
        let (runtime, conn) = self.parts()?;
        runtime.block_on(conn.query_drop(sql))?;
        Ok(conn.affected_rows())
    }
}

impl Handle for MysqlHandle {
    fn prepare<'a>(&'a mut self, sql: &str) -> DriverResult<Box<dyn Statement + 'a>> {
        Ok(Box::new(MysqlStatement::prepare(self, sql)?))
    }

    fn exec(&mut self, sql: &str) -> DriverResult<u64> {
        Ok(self.query_drop(sql)?)
    }

    fn begin_transaction(&mut self) -> DriverResult<()> {
        self.query_drop("START TRANSACTION")?;
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.query_drop("COMMIT")?;
        Ok(())
    }

    fn roll_back(&mut self) -> DriverResult<()> {
        self.query_drop("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for MysqlHandle {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        // Blocking inside a running runtime would panic; let the client
        // clean up on its own there.
        if tokio::runtime::Handle::try_current().is_ok() {
            return;
        }
        if let Err(e) = self.runtime.block_on(conn.disconnect()) {
            debug!(error = %e, "MySQL disconnect failed");
        }
    }
}

impl fmt::Debug for MysqlHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlHandle")
            .field("connection_id", &self.connection_id())
            .finish()
    }
}

/// A server-side prepared statement.
pub struct MysqlStatement<'a> {
    runtime: &'a Runtime,
    conn: &'a mut Conn,
    stmt: mysql_async::Statement,
    columns: Vec<String>,
    rows: Vec<Vec<JsonValue>>,
    affected: u64,
}

impl<'a> MysqlStatement<'a> {
    fn prepare(handle: &'a mut MysqlHandle, sql: &str) -> MysqlResult<Self> {
        let (runtime, conn) = handle.parts()?;
        let stmt = runtime.block_on(conn.prep(sql))?;
        let columns = stmt
            .columns()
            .iter()
            .map(|column| column.name_str().into_owned())
            .collect();
        Ok(Self {
            runtime,
            conn,
            stmt,
            columns,
            rows: Vec::new(),
            affected: 0,
        })
    }

    fn run(&mut self, bindings: &[Value]) -> MysqlResult<()> {
        let params = if bindings.is_empty() {
            Params::Empty
        } else {
            Params::Positional(bindings.iter().map(to_mysql_value).collect())
        };

        let rows: Vec<mysql_async::Row> =
            self.runtime.block_on(self.conn.exec(&self.stmt, params))?;
        self.affected = self.conn.affected_rows();

        let width = self.columns.len();
        self.rows = rows
            .into_iter()
            .map(|row| {
                (0..width)
                    .map(|i| {
                        row.as_ref(i)
                            .cloned()
                            .map(from_mysql_value)
                            .unwrap_or(JsonValue::Null)
                    })
                    .collect()
            })
            .collect();
        Ok(())
    }
}

impl Statement for MysqlStatement<'_> {
    fn execute(&mut self, bindings: &[Value]) -> DriverResult<bool> {
        self.run(bindings)?;
        Ok(true)
    }

    fn fetch_all(&mut self, mode: FetchMode) -> DriverResult<Vec<Row>> {
        let rows = std::mem::take(&mut self.rows);
        Ok(rows
            .into_iter()
            .map(|values| build_row(&self.columns, values, mode))
            .collect())
    }

    fn row_count(&self) -> u64 {
        self.affected
    }
}
