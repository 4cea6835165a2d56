//! The abstract driver boundary.
//!
//! typedb never speaks a wire protocol. Each backend is reached through an
//! implementation of [`Connection`], supplied by the caller (or by the
//! `postgres` feature's adapter). Connection establishment, pooling and
//! transport-level escaping are the driver's concern.

use async_trait::async_trait;

use crate::error::DbResult;
use crate::value::Value;

pub mod mock;

#[cfg(feature = "postgres")]
pub mod postgres;

/// Result of a statement execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Backend-generated id of the inserted row, where the driver exposes
    /// one (MySQL, SQLite). `None` on backends using RETURNING/OUTPUT.
    pub last_insert_id: Option<i64>,
}

/// A fully-materialized result set.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    /// Index of a result column by name, case-insensitive.
    ///
    /// Oracle drivers upcase unquoted column names; matching is relaxed so
    /// the same lookup works across backends.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// An executable connection to one backend.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a statement, returning affected rows and an optional
    /// last-insert-id.
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult>;

    /// Run a query, returning the described rows.
    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Rows>;

    /// Begin a transaction.
    async fn begin(&self) -> DbResult<Box<dyn TxHandle>>;

    /// Close the connection.
    async fn close(&self) -> DbResult<()>;
}

/// An open transaction on a [`Connection`].
///
/// Exclusively owned by the flow that began it; the underlying driver
/// enforces single-statement-in-flight semantics.
#[async_trait]
pub trait TxHandle: Send + Sync {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult>;

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Rows>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
