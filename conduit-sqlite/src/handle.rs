//! SQLite handle and prepared statements.

use conduit_core::{DriverResult, FetchMode, Handle, Row, Statement, Value, build_row};
use rusqlite::params_from_iter;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::SqliteResult;
use crate::types::{get_value_at_index, to_sqlite_value};

/// An open SQLite database.
#[derive(Debug)]
pub struct SqliteHandle {
    conn: rusqlite::Connection,
}

impl SqliteHandle {
    /// Open the configured database and apply its pragmas.
    pub fn open(config: &SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => rusqlite::Connection::open_in_memory()?,
            DatabasePath::File(path) => rusqlite::Connection::open(path)?,
        };
        conn.execute_batch(&config.init_sql())?;

        debug!(
            memory = config.path.is_memory(),
            foreign_keys = config.foreign_keys,
            "SQLite database opened"
        );
        Ok(Self { conn })
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// The underlying rusqlite connection.
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }

    fn batch(&self, sql: &str) -> SqliteResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

impl Handle for SqliteHandle {
    fn prepare<'a>(&'a mut self, sql: &str) -> DriverResult<Box<dyn Statement + 'a>> {
        Ok(Box::new(SqliteStatement::new(&self.conn, sql)?))
    }

    fn exec(&mut self, sql: &str) -> DriverResult<u64> {
        self.batch(sql)?;
        Ok(self.conn.changes() as u64)
    }

    fn begin_transaction(&mut self) -> DriverResult<()> {
        Ok(self.batch("BEGIN")?)
    }

    fn commit(&mut self) -> DriverResult<()> {
        Ok(self.batch("COMMIT")?)
    }

    fn roll_back(&mut self) -> DriverResult<()> {
        Ok(self.batch("ROLLBACK")?)
    }
}

/// A prepared SQLite statement.
///
/// Statements that produce columns buffer their rows on execute, so
/// `fetch_all` only shapes them. Writes with a `returning` clause also
/// produce columns; their change count is read back from the connection.
pub struct SqliteStatement<'conn> {
    conn: &'conn rusqlite::Connection,
    stmt: rusqlite::Statement<'conn>,
    columns: Vec<String>,
    rows: Vec<Vec<JsonValue>>,
    changes: u64,
}

impl<'conn> SqliteStatement<'conn> {
    fn new(conn: &'conn rusqlite::Connection, sql: &str) -> SqliteResult<Self> {
        let stmt = conn.prepare(sql)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(Self {
            conn,
            stmt,
            columns,
            rows: Vec::new(),
            changes: 0,
        })
    }

    fn run(&mut self, bindings: &[Value]) -> SqliteResult<()> {
        let params: Vec<_> = bindings.iter().map(to_sqlite_value).collect();
        self.rows.clear();

        if self.columns.is_empty() {
            self.changes = self.stmt.execute(params_from_iter(params.iter()))? as u64;
            return Ok(());
        }

        let width = self.columns.len();
        {
            let mut rows = self.stmt.query(params_from_iter(params.iter()))?;
            while let Some(row) = rows.next()? {
                self.rows
                    .push((0..width).map(|i| get_value_at_index(row, i)).collect());
            }
        }
        self.changes = if self.stmt.readonly() {
            0
        } else {
            self.conn.changes() as u64
        };
        Ok(())
    }
}

impl Statement for SqliteStatement<'_> {
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
        self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn handle() -> SqliteHandle {
        let mut handle = SqliteHandle::open(&SqliteConfig::memory()).unwrap();
        handle
            .exec("create table users (id integer primary key, name text not null, active integer)")
            .unwrap();
        handle
    }

    fn insert(handle: &mut SqliteHandle, name: &str) {
        let mut stmt = handle
            .prepare("insert into users (name, active) values (?, ?)")
            .unwrap();
        stmt.execute(&[Value::String(name.into()), Value::Int(1)])
            .unwrap();
        assert_eq!(stmt.row_count(), 1);
    }

    #[test]
    fn test_select_assoc_and_num() {
        let mut handle = handle();
        insert(&mut handle, "ada");
        insert(&mut handle, "grace");

        let mut stmt = handle
            .prepare("select id, name from users order by id")
            .unwrap();
        assert!(stmt.execute(&[]).unwrap());
        assert_eq!(
            stmt.fetch_all(FetchMode::Assoc).unwrap(),
            vec![json!({"id": 1, "name": "ada"}), json!({"id": 2, "name": "grace"})]
        );

        stmt.execute(&[]).unwrap();
        assert_eq!(
            stmt.fetch_all(FetchMode::Num).unwrap(),
            vec![json!([1, "ada"]), json!([2, "grace"])]
        );
    }

    #[test]
    fn test_bindings() {
        let mut handle = handle();
        insert(&mut handle, "ada");

        let mut stmt = handle
            .prepare("select name from users where id = ? and active = ?")
            .unwrap();
        stmt.execute(&[Value::Int(1), Value::Bool(true)]).unwrap();
        assert_eq!(
            stmt.fetch_all(FetchMode::Assoc).unwrap(),
            vec![json!({"name": "ada"})]
        );
    }

    #[test]
    fn test_row_count_for_update() {
        let mut handle = handle();
        insert(&mut handle, "ada");
        insert(&mut handle, "grace");

        let mut stmt = handle.prepare("update users set active = ?").unwrap();
        stmt.execute(&[Value::Int(0)]).unwrap();
        assert_eq!(stmt.row_count(), 2);
        assert!(stmt.fetch_all(FetchMode::Assoc).unwrap().is_empty());
    }

    #[test]
    fn test_row_count_for_update_returning() {
        let mut handle = handle();
        insert(&mut handle, "ada");
        insert(&mut handle, "grace");

        let mut stmt = handle
            .prepare("update users set active = ? returning id")
            .unwrap();
        stmt.execute(&[Value::Int(0)]).unwrap();
        assert_eq!(stmt.row_count(), 2);
        assert_eq!(
            stmt.fetch_all(FetchMode::Num).unwrap(),
            vec![json!([1]), json!([2])]
        );
    }

    #[test]
    fn test_select_after_write_reports_no_changes() {
        let mut handle = handle();
        insert(&mut handle, "ada");

        let mut stmt = handle.prepare("select id from users").unwrap();
        stmt.execute(&[]).unwrap();
        assert_eq!(stmt.row_count(), 0);
    }

    #[test]
    fn test_exec_reports_changes() {
        let mut handle = handle();
        insert(&mut handle, "ada");
        assert_eq!(handle.exec("delete from users").unwrap(), 1);
    }

    #[test]
    fn test_prepare_error() {
        let mut handle = handle();
        let err = handle.prepare("select * from missing").err().unwrap();
        assert!(err.message().contains("no such table: missing"));
        assert_eq!(err.code(), Some("1"));
    }

    #[test]
    fn test_transaction_roll_back() {
        let mut handle = handle();
        handle.begin_transaction().unwrap();
        insert(&mut handle, "ada");
        handle.roll_back().unwrap();

        handle.begin_transaction().unwrap();
        insert(&mut handle, "grace");
        handle.commit().unwrap();

        let mut stmt = handle.prepare("select name from users").unwrap();
        stmt.execute(&[]).unwrap();
        assert_eq!(
            stmt.fetch_all(FetchMode::Num).unwrap(),
            vec![json!(["grace"])]
        );
    }

    #[test]
    fn test_commit_without_transaction_fails() {
        let mut handle = handle();
        assert!(handle.commit().is_err());
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let mut handle = handle();
        handle
            .exec("create table posts (id integer primary key, user_id integer references users(id))")
            .unwrap();
        let mut stmt = handle
            .prepare("insert into posts (user_id) values (?)")
            .unwrap();
        assert!(stmt.execute(&[Value::Int(99)]).is_err());
    }
}
