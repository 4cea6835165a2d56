//! The database handle.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::dialect::Dialect;
use crate::driver::{Connection, ExecResult, Rows};
use crate::error::{DbError, DbResult};
use crate::log::{LogFlags, Logger};
use crate::ops::impl_session_ops;
use crate::registry::Registry;
use crate::session::{Session, SessionState, emit_info, query_logged};
use crate::tx::Tx;
use crate::value::Value;

/// Options for [`Db::open`].
pub struct DbOptions {
    registry: Registry,
    logger: Option<Arc<dyn Logger>>,
    flags: LogFlags,
}

impl DbOptions {
    /// Options resolving model types against `registry`.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            logger: None,
            flags: LogFlags::default(),
        }
    }

    /// Attach a logger taking precedence over the process-wide default.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Toggle query-text logging.
    pub fn with_log_queries(mut self, on: bool) -> Self {
        self.flags.queries = on;
        self
    }

    /// Toggle argument logging.
    pub fn with_log_args(mut self, on: bool) -> Self {
        self.flags.args = on;
        self
    }

    /// Toggle debug logging entirely. Error and transaction-boundary info
    /// events are still emitted.
    pub fn with_logging(mut self, on: bool) -> Self {
        self.flags.enabled = on;
        self
    }
}

/// A handle over one backend connection.
///
/// Cheap to clone; clones share the connection and registry. The dialect is
/// fixed by the driver name passed to [`open`](Db::open) and every statement
/// the handle renders uses that dialect's placeholders and quoting.
#[derive(Clone)]
pub struct Db {
    conn: Arc<dyn Connection>,
    state: SessionState,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}

impl Db {
    /// Open a handle, validating every registered model first.
    ///
    /// `driver_name` picks the dialect (`postgres`, `mysql`, `oracle`,
    /// `sqlserver`, `sqlite` and their aliases). Validation failure is the
    /// error from the first model missing a required `QueryByX` method.
    pub fn open(driver_name: &str, conn: Arc<dyn Connection>, options: DbOptions) -> DbResult<Self> {
        let db = Self::open_without_validation(driver_name, conn, options)?;
        db.state.registry.validate_all()?;
        Ok(db)
    }

    /// Open a handle without the model validation sweep.
    ///
    /// Missing lookup methods then surface later, per call, as validation
    /// errors from the operation that needed them.
    pub fn open_without_validation(
        driver_name: &str,
        conn: Arc<dyn Connection>,
        options: DbOptions,
    ) -> DbResult<Self> {
        let dialect = Dialect::from_driver_name(driver_name)?;
        Ok(Self {
            conn,
            state: SessionState {
                dialect,
                registry: options.registry,
                logger: options.logger,
                flags: options.flags,
            },
        })
    }

    /// A clone of this handle with debug logging off.
    pub fn with_no_logging(&self) -> Self {
        let mut db = self.clone();
        db.state.flags.enabled = false;
        db
    }

    /// A clone of this handle that logs calls without query text.
    pub fn with_no_query_logging(&self) -> Self {
        let mut db = self.clone();
        db.state.flags.queries = false;
        db
    }

    /// A clone of this handle that logs queries without their arguments.
    pub fn with_no_arg_logging(&self) -> Self {
        let mut db = self.clone();
        db.state.flags.args = false;
        db
    }

    /// Begin a transaction.
    pub async fn begin(&self) -> DbResult<Tx> {
        if self.state.flags.enabled {
            self.state.logger().debug("Beginning transaction", &[]);
        }
        let handle = self.conn.begin().await?;
        Ok(Tx::new(handle, self.state.clone()))
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// A rollback failure is logged and returned, wrapping the closure's
    /// error so neither is lost.
    pub async fn with_tx<R, F>(&self, f: F) -> DbResult<R>
    where
        R: Send,
        F: for<'a> FnOnce(&'a Tx) -> BoxFuture<'a, DbResult<R>> + Send,
    {
        let tx = self.begin().await?;
        match f(&tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    self.state
                        .logger()
                        .error("Transaction rollback failed", &[(
                            "error",
                            rollback_err.to_string(),
                        )]);
                    return Err(DbError::Tx(format!(
                        "rollback failed: {rollback_err} (while handling: {err})"
                    )));
                }
                Err(err)
            }
        }
    }

    /// Verify the connection is alive.
    pub async fn ping(&self) -> DbResult<()> {
        let sql = self.state.dialect.ping_sql();
        query_logged(self, "Querying row", sql, &[], &[]).await?;
        Ok(())
    }

    /// Close the underlying connection.
    pub async fn close(&self) -> DbResult<()> {
        emit_info(&self.state, "Closing database connection");
        self.conn.close().await
    }
}

#[async_trait]
impl Session for Db {
    fn state(&self) -> &SessionState {
        &self.state
    }

    async fn raw_execute(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        self.conn.execute(sql, params).await
    }

    async fn raw_query(&self, sql: &str, params: &[Value]) -> DbResult<Rows> {
        self.conn.query(sql, params).await
    }
}

impl_session_ops!(Db);
