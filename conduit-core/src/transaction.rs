//! Nested transactions.
//!
//! Set `CONDUIT_DEBUG=true` to enable transaction debug logging.
//!
//! A [`Connection`] keeps a transaction depth counter. Only the outermost
//! level talks to the driver's transaction API; inner levels become
//! savepoints named `trans<depth>` when the dialect supports them:
//!
//! | Call                | Depth before | Effect                             |
//! |---------------------|--------------|------------------------------------|
//! | `begin_transaction` | 0            | driver `begin`                     |
//! | `begin_transaction` | n >= 1       | `SAVEPOINT trans<n+1>`             |
//! | `commit`            | 1            | driver `commit`                    |
//! | `commit`            | n > 1        | `RELEASE SAVEPOINT trans<n>`       |
//! | `roll_back`         | 1            | driver `rollback`                  |
//! | `roll_back`         | n > 1        | `ROLLBACK TO SAVEPOINT trans<n>`   |
//!
//! Depth never drops below zero. Inside [`Connection::pretend`] the counter
//! moves but the driver is not called.
//!
//! ```rust,ignore
//! let user_id = conn.transaction(|conn| {
//!     conn.insert("insert into users (name) values (?)", &bindings!["ada"])?;
//!
//!     // An inner failure only undoes the inner work.
//!     let _ = conn.transaction(|conn| {
//!         conn.insert("insert into audit (note) values (?)", &bindings!["x"])?;
//!         Err::<(), _>(conduit_core::Error::from(ConfigError::UnknownConnection("x".into())))
//!     });
//!
//!     Ok::<_, conduit_core::Error>(42)
//! })?;
//! ```

use std::panic::{self, AssertUnwindSafe};

use tracing::{error, warn};

use crate::connection::Connection;
use crate::conduit_debug;
use crate::driver::DriverResult;
use crate::error::{Error, Result};

/// Savepoint name for the given depth.
pub fn savepoint_name(depth: u32) -> String {
    format!("trans{}", depth)
}

impl Connection {
    /// Open a transaction, or a savepoint when one is already open.
    pub fn begin_transaction(&mut self) -> Result<()> {
        if self.transactions == 0 {
            self.reconnect_if_missing_connection()?;
        }

        self.transactions += 1;
        let depth = self.transactions;

        let result = if self.pretending() {
            Ok(())
        } else if depth == 1 {
            self.write
                .resolve()
                .and_then(|handle| handle.begin_transaction())
                .map_err(|e| Error::transaction("begin", e))
        } else if self.dialect.supports_savepoints() {
            let sql = self.dialect.compile_savepoint(&savepoint_name(depth));
            self.exec_on_write(&sql)
                .map_err(|e| Error::transaction("savepoint", e))
        } else {
            Ok(())
        };

        if let Err(e) = result {
            self.transactions -= 1;
            return Err(e);
        }

        conduit_debug!(depth = depth, "Transaction started");
        Ok(())
    }

    /// Commit the outermost transaction, or release the current savepoint.
    pub fn commit(&mut self) -> Result<()> {
        let depth = self.transactions;
        if depth == 0 {
            warn!("commit called with no open transaction");
            return Ok(());
        }

        if !self.pretending() {
            if depth == 1 {
                self.write
                    .resolve()
                    .and_then(|handle| handle.commit())
                    .map_err(|e| Error::transaction("commit", e))?;
            } else if self.dialect.supports_savepoints() {
                let sql = self.dialect.compile_savepoint_release(&savepoint_name(depth));
                self.exec_on_write(&sql)
                    .map_err(|e| Error::transaction("release", e))?;
            }
        }

        self.transactions -= 1;
        conduit_debug!(depth = self.transactions, "Transaction committed");
        Ok(())
    }

    /// Roll back the outermost transaction, or to the current savepoint.
    ///
    /// The depth is decremented even when the driver call fails.
    pub fn roll_back(&mut self) -> Result<()> {
        let depth = self.transactions;

        let result = if depth == 0 || self.pretending() {
            Ok(())
        } else if depth == 1 {
            self.write
                .resolve()
                .and_then(|handle| handle.roll_back())
                .map_err(|e| Error::transaction("rollback", e))
        } else if self.dialect.supports_savepoints() {
            let sql = self.dialect.compile_savepoint_rollback(&savepoint_name(depth));
            self.exec_on_write(&sql)
                .map_err(|e| Error::transaction("rollback", e))
        } else {
            Ok(())
        };

        self.transactions = depth.saturating_sub(1);
        conduit_debug!(depth = self.transactions, "Transaction rolled back");
        result
    }

    /// Run `work` inside a transaction.
    ///
    /// Commits when `work` returns `Ok`. On `Err` the transaction is rolled
    /// back and the error is returned unchanged. A panic rolls back and then
    /// resumes unwinding.
    pub fn transaction<T, E, F>(&mut self, work: F) -> std::result::Result<T, E>
    where
        E: From<Error>,
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
    {
        self.begin_transaction()?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&mut *self)));

        match outcome {
            Ok(Ok(value)) => match self.commit() {
                Ok(()) => Ok(value),
                Err(commit_error) => {
                    self.roll_back_after_failure();
                    Err(commit_error.into())
                }
            },
            Ok(Err(work_error)) => {
                self.roll_back_after_failure();
                Err(work_error)
            }
            Err(payload) => {
                self.roll_back_after_failure();
                panic::resume_unwind(payload)
            }
        }
    }

    fn roll_back_after_failure(&mut self) {
        if let Err(e) = self.roll_back() {
            error!(error = %e, "Rollback after failed transaction also failed");
        }
    }

    fn exec_on_write(&mut self, sql: &str) -> DriverResult<()> {
        self.write.resolve()?.exec(sql)?;
        Ok(())
    }
}
