//! A scripted in-memory driver for tests.
//!
//! Outcomes are queued with `expect_*` and consumed in order by whichever
//! call comes next; every statement (including transaction boundaries) is
//! recorded for assertion. With no queued outcome, queries return an empty
//! result set and executions succeed with zero affected rows.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Connection, ExecResult, Rows, TxHandle};
use crate::error::{DbError, DbResult};
use crate::value::Value;

/// One statement seen by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
enum Outcome {
    Exec(ExecResult),
    Query(Rows),
    Error(String),
}

#[derive(Default)]
struct State {
    outcomes: VecDeque<Outcome>,
    statements: Vec<Statement>,
    rollback_error: Option<String>,
}

/// Scripted [`Connection`] implementation.
#[derive(Clone, Default)]
pub struct MockConn {
    state: Arc<Mutex<State>>,
}

impl MockConn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an execution outcome.
    pub fn expect_exec(&self, rows_affected: u64, last_insert_id: Option<i64>) -> &Self {
        self.push(Outcome::Exec(ExecResult {
            rows_affected,
            last_insert_id,
        }));
        self
    }

    /// Queue a query outcome.
    pub fn expect_query(&self, columns: &[&str], rows: Vec<Vec<Value>>) -> &Self {
        self.push(Outcome::Query(Rows {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        }));
        self
    }

    /// Queue a driver failure.
    pub fn expect_error(&self, message: &str) -> &Self {
        self.push(Outcome::Error(message.to_string()));
        self
    }

    /// Make the next rollback fail.
    pub fn expect_rollback_error(&self, message: &str) -> &Self {
        self.state.lock().expect("mock lock").rollback_error = Some(message.to_string());
        self
    }

    /// Statements recorded so far, including BEGIN/COMMIT/ROLLBACK markers.
    pub fn statements(&self) -> Vec<Statement> {
        self.state.lock().expect("mock lock").statements.clone()
    }

    /// SQL texts only, for terse assertions.
    pub fn sql_log(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.sql).collect()
    }

    fn push(&self, outcome: Outcome) {
        self.state.lock().expect("mock lock").outcomes.push_back(outcome);
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.state.lock().expect("mock lock").statements.push(Statement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }

    fn next_exec(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        self.record(sql, params);
        match self.state.lock().expect("mock lock").outcomes.pop_front() {
            Some(Outcome::Exec(result)) => Ok(result),
            Some(Outcome::Query(_)) | None => Ok(ExecResult::default()),
            Some(Outcome::Error(message)) => Err(DbError::driver("Exec", message)),
        }
    }

    fn next_query(&self, sql: &str, params: &[Value]) -> DbResult<Rows> {
        self.record(sql, params);
        match self.state.lock().expect("mock lock").outcomes.pop_front() {
            Some(Outcome::Query(rows)) => Ok(rows),
            Some(Outcome::Exec(_)) | None => Ok(Rows::default()),
            Some(Outcome::Error(message)) => Err(DbError::driver("Query", message)),
        }
    }
}

#[async_trait]
impl Connection for MockConn {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        self.next_exec(sql, params)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Rows> {
        self.next_query(sql, params)
    }

    async fn begin(&self) -> DbResult<Box<dyn TxHandle>> {
        self.record("BEGIN", &[]);
        Ok(Box::new(MockTx { conn: self.clone() }))
    }

    async fn close(&self) -> DbResult<()> {
        self.record("CLOSE", &[]);
        Ok(())
    }
}

/// Transaction handle sharing the parent mock's script and log.
pub struct MockTx {
    conn: MockConn,
}

#[async_trait]
impl TxHandle for MockTx {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        self.conn.next_exec(sql, params)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Rows> {
        self.conn.next_query(sql, params)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.conn.record("COMMIT", &[]);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.conn.record("ROLLBACK", &[]);
        match self.conn.state.lock().expect("mock lock").rollback_error.take() {
            Some(message) => Err(DbError::Tx(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_outcomes_consumed_in_order() {
        let conn = MockConn::new();
        conn.expect_exec(1, Some(7)).expect_error("boom");

        let result = conn.execute("INSERT ...", &[Value::Int(1)]).await.unwrap();
        assert_eq!(result.last_insert_id, Some(7));

        let err = conn.query("SELECT 1", &[]).await.unwrap_err();
        assert!(err.to_string().contains("boom"));

        assert_eq!(conn.sql_log(), ["INSERT ...", "SELECT 1"]);
    }

    #[tokio::test]
    async fn unscripted_calls_default() {
        let conn = MockConn::new();
        let rows = conn.query("SELECT 1", &[]).await.unwrap();
        assert!(rows.rows.is_empty());
        let result = conn.execute("DELETE", &[]).await.unwrap();
        assert_eq!(result.rows_affected, 0);
    }

    #[tokio::test]
    async fn transaction_markers_recorded() {
        let conn = MockConn::new();
        let tx = conn.begin().await.unwrap();
        tx.execute("UPDATE t SET a = ?", &[Value::Int(1)]).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(conn.sql_log(), ["BEGIN", "UPDATE t SET a = ?", "COMMIT"]);
    }
}
