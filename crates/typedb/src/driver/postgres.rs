//! `tokio-postgres` adapter, behind the `postgres` feature.
//!
//! Parameters cross the boundary as [`Value`]; each binding is encoded
//! against the statement's declared parameter type, and result columns are
//! decoded back into `Value` by their declared column type. Transactions are
//! driven with explicit `BEGIN`/`COMMIT`/`ROLLBACK` statements so a handle
//! can be held without borrowing the client.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls};

use crate::driver::{Connection, ExecResult, Rows, TxHandle};
use crate::error::{DbError, DbResult};
use crate::value::Value;

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => {
                if *ty == Type::INT2 {
                    (*i as i16).to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    (*i as i32).to_sql(ty, out)
                } else {
                    i.to_sql(ty, out)
                }
            }
            Value::UInt(u) => (*u as i64).to_sql(ty, out),
            Value::Float(f) => {
                if *ty == Type::FLOAT4 {
                    (*f as f32).to_sql(ty, out)
                } else {
                    f.to_sql(ty, out)
                }
            }
            Value::Text(s) => {
                if *ty == Type::UUID {
                    uuid::Uuid::parse_str(s)?.to_sql(ty, out)
                } else {
                    s.to_sql(ty, out)
                }
            }
            Value::Bytes(b) => b.to_sql(ty, out),
            Value::Timestamp(t) => t.to_sql(ty, out),
            Value::Json(j) => j.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        // Mismatches surface per-binding from the inner encode.
        true
    }

    to_sql_checked!();
}

fn driver_err(op: &'static str, err: tokio_postgres::Error) -> DbError {
    DbError::driver(op, err.to_string())
}

fn decode_cell(row: &tokio_postgres::Row, idx: usize) -> DbResult<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let name = column.name();
    let err = |e: tokio_postgres::Error| DbError::decode(name.to_string(), e.to_string());

    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx).map_err(err)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)
            .map_err(err)?
            .map(|v| Value::Int(v.into()))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)
            .map_err(err)?
            .map(|v| Value::Int(v.into()))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx).map_err(err)?.map(Value::Int)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)
            .map_err(err)?
            .map(|v| Value::Float(v.into()))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx).map_err(err)?.map(Value::Float)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx).map_err(err)?.map(Value::Bytes)
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .map_err(err)?
            .map(Value::Timestamp)
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map_err(err)?
            .map(|v| Value::Timestamp(v.naive_utc()))
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(idx)
            .map_err(err)?
            .map(|v| Value::Text(v.to_string()))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(err)?
            .map(Value::Json)
    } else {
        // TEXT, VARCHAR, NAME, BPCHAR and anything else textual.
        row.try_get::<_, Option<String>>(idx).map_err(err)?.map(Value::Text)
    };
    Ok(value.unwrap_or(Value::Null))
}

fn materialize(rows: Vec<tokio_postgres::Row>) -> DbResult<Rows> {
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut values = Vec::with_capacity(row.len());
        for idx in 0..row.len() {
            values.push(decode_cell(row, idx)?);
        }
        out.push(values);
    }
    Ok(Rows { columns, rows: out })
}

fn bind(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

/// [`Connection`] over a single `tokio-postgres` client.
pub struct PgConnection {
    client: Arc<Client>,
}

impl PgConnection {
    /// Connect with `NoTls`, spawning the connection task.
    pub async fn connect(config: &str) -> DbResult<Self> {
        let (client, connection) = tokio_postgres::connect(config, NoTls)
            .await
            .map_err(|e| driver_err("connect", e))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "typedb", "connection task ended: {e}");
            }
        });
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Wrap an already-established client.
    pub fn from_client(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        let rows_affected = self
            .client
            .execute(sql, &bind(params))
            .await
            .map_err(|e| driver_err("execute", e))?;
        Ok(ExecResult {
            rows_affected,
            last_insert_id: None,
        })
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Rows> {
        let rows = self
            .client
            .query(sql, &bind(params))
            .await
            .map_err(|e| driver_err("query", e))?;
        materialize(rows)
    }

    async fn begin(&self) -> DbResult<Box<dyn TxHandle>> {
        self.client
            .batch_execute("BEGIN")
            .await
            .map_err(|e| driver_err("begin", e))?;
        Ok(Box::new(PgTx {
            client: self.client.clone(),
        }))
    }

    async fn close(&self) -> DbResult<()> {
        // tokio-postgres closes on drop of the last client handle.
        Ok(())
    }
}

struct PgTx {
    client: Arc<Client>,
}

#[async_trait]
impl TxHandle for PgTx {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        let rows_affected = self
            .client
            .execute(sql, &bind(params))
            .await
            .map_err(|e| driver_err("execute", e))?;
        Ok(ExecResult {
            rows_affected,
            last_insert_id: None,
        })
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Rows> {
        let rows = self
            .client
            .query(sql, &bind(params))
            .await
            .map_err(|e| driver_err("query", e))?;
        materialize(rows)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| driver_err("commit", e))
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| driver_err("rollback", e))
    }
}
