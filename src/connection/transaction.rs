use tracing::{debug, warn};

use crate::error::SqlGatewayError;

use super::Connection;

impl Connection {
    /// Start a native transaction, or a savepoint when `savepoint` is given.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::LogicError` inside a [`transaction`](Self::transaction) block,
    /// otherwise whatever the driver raises.
    pub fn begin_transaction(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError> {
        self.ensure_outside_block("begin_transaction")?;
        self.driver()?.begin_transaction(savepoint)
    }

    /// # Errors
    /// Returns `SqlGatewayError::LogicError` inside a [`transaction`](Self::transaction) block,
    /// otherwise whatever the driver raises.
    pub fn commit(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError> {
        self.ensure_outside_block("commit")?;
        self.driver()?.commit(savepoint)
    }

    /// # Errors
    /// Returns `SqlGatewayError::LogicError` inside a [`transaction`](Self::transaction) block,
    /// otherwise whatever the driver raises.
    pub fn rollback(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError> {
        self.ensure_outside_block("rollback")?;
        self.driver()?.rollback(savepoint)
    }

    /// Run `work` inside a transaction.
    ///
    /// Nested calls join the outermost transaction: only the outermost call issues the
    /// native BEGIN, and the native COMMIT or ROLLBACK happens once the depth is back to
    /// zero. A failure at any level rolls the whole transaction back when it reaches the
    /// outermost call, and that failure is what gets returned.
    ///
    /// ```rust
    /// use sql_gateway::prelude::*;
    ///
    /// let mut conn = Connection::open(ConnectOptions::new("sqlite::memory:")).unwrap();
    /// conn.query("CREATE TABLE t (id INTEGER)", ()).unwrap();
    /// conn.transaction(|c| {
    ///     c.query("INSERT INTO t VALUES (1)", ())?;
    ///     c.transaction(|inner| inner.query("INSERT INTO t VALUES (2)", ()).map(|_| ()))
    /// })
    /// .unwrap();
    /// assert_eq!(conn.fetch_field("SELECT COUNT(*) FROM t", ()).unwrap(), Some(RowValues::Int(2)));
    /// ```
    ///
    /// # Errors
    /// Returns the error from `work`, or from the native BEGIN/COMMIT.
    pub fn transaction<T>(
        &mut self,
        work: impl FnOnce(&mut Self) -> Result<T, SqlGatewayError>,
    ) -> Result<T, SqlGatewayError> {
        if self.depth == 0 {
            self.driver()?.begin_transaction(None)?;
            debug!("transaction started");
        }
        self.depth += 1;
        let result = work(self);
        self.depth = self.depth.saturating_sub(1);
        if self.depth > 0 {
            return result;
        }

        match result {
            Ok(value) => {
                let driver = self.driver.as_deref_mut().ok_or_else(|| {
                    SqlGatewayError::InvalidState(
                        "connection was closed inside a transaction block".into(),
                    )
                })?;
                driver.commit(None)?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Some(driver) = self.driver.as_deref_mut() {
                    match driver.rollback(None) {
                        Ok(()) => debug!(error = %err, "transaction rolled back"),
                        Err(rollback_err) => warn!(
                            error = %err,
                            rollback_error = %rollback_err,
                            "rollback after failed transaction block also failed"
                        ),
                    }
                }
                Err(err)
            }
        }
    }

    fn ensure_outside_block(&self, operation: &str) -> Result<(), SqlGatewayError> {
        if self.depth > 0 {
            return Err(SqlGatewayError::LogicError(format!(
                "{operation} is not allowed inside a transaction() block (depth {})",
                self.depth
            )));
        }
        Ok(())
    }
}
