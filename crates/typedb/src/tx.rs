//! Transactions.

use async_trait::async_trait;

use crate::driver::{ExecResult, Rows, TxHandle};
use crate::error::DbResult;
use crate::ops::impl_session_ops;
use crate::session::{Session, SessionState, emit_info};
use crate::value::Value;

/// An open transaction.
///
/// Obtained from [`Db::begin`](crate::Db::begin) or scoped through
/// [`Db::with_tx`](crate::Db::with_tx). Every operation available on a `Db`
/// handle works on a `Tx` and runs inside it. Dropping a `Tx` without
/// calling [`commit`](Tx::commit) leaves the rollback to the driver.
pub struct Tx {
    handle: Box<dyn TxHandle>,
    state: SessionState,
}

impl Tx {
    pub(crate) fn new(handle: Box<dyn TxHandle>, state: SessionState) -> Self {
        Self { handle, state }
    }

    /// Commit the transaction, consuming it.
    pub async fn commit(self) -> DbResult<()> {
        self.handle.commit().await?;
        emit_info(&self.state, "Transaction committed");
        Ok(())
    }

    /// Roll the transaction back, consuming it.
    pub async fn rollback(self) -> DbResult<()> {
        self.handle.rollback().await?;
        emit_info(&self.state, "Transaction rolled back");
        Ok(())
    }
}

#[async_trait]
impl Session for Tx {
    fn state(&self) -> &SessionState {
        &self.state
    }

    async fn raw_execute(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        self.handle.execute(sql, params).await
    }

    async fn raw_query(&self, sql: &str, params: &[Value]) -> DbResult<Rows> {
        self.handle.query(sql, params).await
    }
}

impl_session_ops!(Tx);
