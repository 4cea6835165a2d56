//! Shared plumbing for `Db` and `Tx`.
//!
//! A [`Session`] is anything the operation functions can execute through: a
//! connection handle or an open transaction. Every driver call funnels
//! through [`exec_logged`] / [`query_logged`], which emit the structured
//! debug/error events with redaction already applied. Logging is a side
//! channel and never alters the returned error.

use std::sync::Arc;

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::driver::{ExecResult, Rows};
use crate::error::{DbError, DbResult};
use crate::log::{LogFlags, Logger, default_logger};
use crate::registry::Registry;
use crate::value::Value;

/// Configuration shared by a handle and every transaction it begins.
#[derive(Clone)]
pub struct SessionState {
    pub(crate) dialect: Dialect,
    pub(crate) registry: Registry,
    pub(crate) logger: Option<Arc<dyn Logger>>,
    pub(crate) flags: LogFlags,
}

impl SessionState {
    pub(crate) fn logger(&self) -> Arc<dyn Logger> {
        self.logger.clone().unwrap_or_else(default_logger)
    }
}

/// An execution scope: either a `Db` handle or a `Tx`.
#[async_trait]
pub trait Session: Send + Sync {
    #[doc(hidden)]
    fn state(&self) -> &SessionState;

    /// Execute a statement without logging. Operations use [`exec_logged`].
    #[doc(hidden)]
    async fn raw_execute(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult>;

    /// Run a query without logging. Operations use [`query_logged`].
    #[doc(hidden)]
    async fn raw_query(&self, sql: &str, params: &[Value]) -> DbResult<Rows>;

    /// The dialect this session renders SQL for.
    fn dialect(&self) -> Dialect {
        self.state().dialect
    }

    /// The registry this session resolves model types against.
    fn registry(&self) -> &Registry {
        &self.state().registry
    }
}

fn call_fields(
    state: &SessionState,
    sql: &str,
    masked_args: &[String],
) -> Vec<(&'static str, String)> {
    let mut fields = Vec::with_capacity(2);
    if state.flags.enabled && state.flags.queries {
        fields.push(("query", sql.to_string()));
    }
    if state.flags.enabled && state.flags.args && !masked_args.is_empty() {
        fields.push(("args", format!("[{}]", masked_args.join(", "))));
    }
    fields
}

pub(crate) fn emit_debug(
    state: &SessionState,
    msg: &str,
    sql: &str,
    masked_args: &[String],
) {
    if !state.flags.enabled {
        return;
    }
    state.logger().debug(msg, &call_fields(state, sql, masked_args));
}

pub(crate) fn emit_info(state: &SessionState, msg: &str) {
    state.logger().info(msg, &[]);
}

pub(crate) fn emit_error(
    state: &SessionState,
    msg: &str,
    sql: &str,
    masked_args: &[String],
    err: &DbError,
) {
    let mut fields = call_fields(state, sql, masked_args);
    fields.push(("error", err.to_string()));
    state.logger().error(msg, &fields);
}

/// Execute a statement with debug/error events around it.
///
/// `masked_args` is built before this call, so redaction happens even when
/// the driver call fails.
pub(crate) async fn exec_logged<S: Session + ?Sized>(
    session: &S,
    debug_msg: &str,
    sql: &str,
    params: &[Value],
    masked_args: &[String],
) -> DbResult<ExecResult> {
    let state = session.state();
    emit_debug(state, debug_msg, sql, masked_args);
    match session.raw_execute(sql, params).await {
        Ok(result) => Ok(result),
        Err(err) => {
            emit_error(state, "Query execution failed", sql, masked_args, &err);
            Err(err)
        }
    }
}

/// Run a query with debug/error events around it.
pub(crate) async fn query_logged<S: Session + ?Sized>(
    session: &S,
    debug_msg: &str,
    sql: &str,
    params: &[Value],
    masked_args: &[String],
) -> DbResult<Rows> {
    let state = session.state();
    emit_debug(state, debug_msg, sql, masked_args);
    match session.raw_query(sql, params).await {
        Ok(rows) => Ok(rows),
        Err(err) => {
            emit_error(state, "Query failed", sql, masked_args, &err);
            Err(err)
        }
    }
}
