//! The typed CRUD operations and raw-SQL escape hatches.
//!
//! Typed operations are free generic functions taking any [`Session`]
//! (a `Db` handle or an open `Tx`). Each call builds the statement, renders
//! it for the session's dialect, executes once, and deserializes the
//! result; nothing is retried internally.

use std::collections::HashMap;

use crate::driver::Rows;
use crate::error::{DbError, DbResult};
use crate::registry::ModelDescriptor;
use crate::schema::{ColumnDef, ModelQueries, Record, column_by_field};
use crate::ser::{self, REDACTED};
use crate::session::{Session, exec_logged, query_logged};
use crate::track::Snapshot;
use crate::value::{Param, Value, decode_column};

fn mask_one(col: &ColumnDef, value: &Value) -> String {
    if col.nolog {
        REDACTED.to_string()
    } else {
        value.display_for_log()
    }
}

fn populate<T: Record>(record: &mut T, columns: &[String], row: Vec<Value>) -> DbResult<()> {
    for (column, value) in columns.iter().zip(row) {
        record.put(column, value)?;
    }
    Ok(())
}

fn lookup_sql<T: Record + ModelQueries>(
    desc: &ModelDescriptor,
    name: &str,
) -> DbResult<&'static str> {
    T::query_by(name).ok_or_else(|| {
        DbError::validation(format!("{} does not define {name}", desc.type_name))
    })
}

/// Load a record by its primary key, populating all remaining columns.
///
/// Returns [`DbError::NotFound`] when no row matches.
pub async fn load<T, S>(session: &S, record: &mut T) -> DbResult<()>
where
    T: Record + ModelQueries + 'static,
    S: Session,
{
    let desc = session.registry().descriptor::<T>()?;
    let pk_col = desc.pk_column().ok_or_else(|| {
        DbError::validation(format!("{} has no primary key field", desc.type_name))
    })?;
    let sql = lookup_sql::<T>(&desc, &pk_col.lookup_name())?;
    let pk = ser::pk_value(&desc, record)?;
    let masked = vec![mask_one(pk_col, &pk)];

    let rows = query_logged(session, "Querying row", sql, &[pk], &masked).await?;
    let Some(row) = rows.rows.into_iter().next() else {
        return Err(DbError::not_found(format!("{} row not found", desc.table)));
    };
    populate(record, &rows.columns, row)
}

/// Load a record through one of its unique fields.
///
/// `field` names the Rust field (either form, `email` or `Email`); it must
/// have been registered unique.
pub async fn load_by_field<T, S>(session: &S, record: &mut T, field: &str) -> DbResult<()>
where
    T: Record + ModelQueries + 'static,
    S: Session,
{
    let desc = session.registry().descriptor::<T>()?;
    let (idx, col) = column_by_field(desc.columns, field).ok_or_else(|| {
        DbError::validation(format!("{} has no field {field:?}", desc.type_name))
    })?;
    if !col.unique && !col.primary {
        return Err(DbError::validation(format!(
            "field {field:?} of {} is not registered unique",
            desc.type_name
        )));
    }
    let sql = lookup_sql::<T>(&desc, &col.lookup_name())?;
    let value = record.values().swap_remove(idx);
    let masked = vec![mask_one(col, &value)];

    let rows = query_logged(session, "Querying row", sql, &[value], &masked).await?;
    let Some(row) = rows.rows.into_iter().next() else {
        return Err(DbError::not_found(format!("{} row not found", desc.table)));
    };
    populate(record, &rows.columns, row)
}

/// Load a record by a named composite key group.
///
/// Parameters are bound in the group's alphabetically-sorted field order,
/// the same fixed ordering the `QueryByX` method name is built from.
pub async fn load_by_composite<T, S>(session: &S, record: &mut T, group: &str) -> DbResult<()>
where
    T: Record + ModelQueries + 'static,
    S: Session,
{
    let desc = session.registry().descriptor::<T>()?;
    let members = desc.composites.get(group).ok_or_else(|| {
        DbError::validation(format!(
            "{} has no composite key group {group:?}",
            desc.type_name
        ))
    })?;
    let lookup = desc.composite_lookup_name(group).ok_or_else(|| {
        DbError::validation(format!(
            "{} has no composite key group {group:?}",
            desc.type_name
        ))
    })?;
    let sql = lookup_sql::<T>(&desc, &lookup)?;

    let all = record.values();
    let mut params = Vec::with_capacity(members.len());
    let mut masked = Vec::with_capacity(members.len());
    for &idx in members {
        let col = &desc.columns[idx];
        masked.push(mask_one(col, &all[idx]));
        params.push(all[idx].clone());
    }

    let rows = query_logged(session, "Querying row", sql, &params, &masked).await?;
    let Some(row) = rows.rows.into_iter().next() else {
        return Err(DbError::not_found(format!("{} row not found", desc.table)));
    };
    populate(record, &rows.columns, row)
}

/// Insert a record, writing the database-generated id back into it.
pub async fn insert<T, S>(session: &S, record: &mut T) -> DbResult<()>
where
    T: Record + 'static,
    S: Session,
{
    let desc = session.registry().descriptor::<T>()?;
    let set = ser::insert_set(&desc, record);
    let dialect = session.dialect();

    let columns_sql = set
        .columns
        .iter()
        .map(|c| dialect.quote_ident(c.column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=set.values.len())
        .map(|i| dialect.placeholder(i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_ident(desc.table),
        columns_sql,
        placeholders
    );
    let masked = set.masked();

    match desc.pk_column() {
        Some(pk_col) if dialect.supports_returning() => {
            let sql = dialect.inject_returning(&sql, pk_col.column);
            let rows = query_logged(session, "Executing query", &sql, &set.values, &masked).await?;
            if let Some(idx) = rows.column_index(pk_col.column) {
                if let Some(row) = rows.rows.into_iter().next() {
                    record.put(pk_col.column, row[idx].clone())?;
                }
            }
        }
        Some(pk_col) => {
            let result = exec_logged(session, "Executing query", &sql, &set.values, &masked).await?;
            if let Some(id) = result.last_insert_id {
                record.put(pk_col.column, Value::Int(id))?;
            }
        }
        None => {
            exec_logged(session, "Executing query", &sql, &set.values, &masked).await?;
        }
    }
    Ok(())
}

/// Insert a record, then load it back so database-default columns
/// (timestamps and the like) are populated too.
pub async fn insert_and_load<T, S>(session: &S, record: &mut T) -> DbResult<()>
where
    T: Record + ModelQueries + 'static,
    S: Session,
{
    insert(session, record).await?;
    load(session, record).await
}

/// Execute a raw INSERT and return the generated id.
///
/// On RETURNING/OUTPUT backends the clause is injected (with a quoted `id`
/// column) when the statement does not already carry one; a clause that
/// fails to surface an `id` column is an explicit error. MySQL falls back to
/// the driver's last-insert-id.
pub async fn insert_and_get_id<S>(session: &S, sql: &str, params: &[Param]) -> DbResult<i64>
where
    S: Session,
{
    let dialect = session.dialect();
    let values = ser::raw_values(params);
    let masked = ser::masked_params(params);

    if dialect.supports_returning() {
        let sql = if dialect.has_returning(sql) {
            sql.to_string()
        } else {
            dialect.inject_returning(sql, "id")
        };
        let rows = query_logged(session, "Executing query", &sql, &values, &masked).await?;
        let idx = rows.column_index("id").ok_or(DbError::MissingIdColumn)?;
        let row = rows.rows.into_iter().next().ok_or(DbError::MissingIdColumn)?;
        decode_column::<i64>("id", row[idx].clone())
    } else {
        let result = exec_logged(session, "Executing query", sql, &values, &masked).await?;
        result.last_insert_id.ok_or_else(|| {
            DbError::driver("InsertAndGetID", "driver did not report a last-insert id")
        })
    }
}

async fn run_update<T, S>(
    session: &S,
    desc: &ModelDescriptor,
    record: &T,
    set: ser::ParamSet,
) -> DbResult<()>
where
    T: Record + 'static,
    S: Session,
{
    if set.is_empty() {
        // Nothing changed; an empty UPDATE is a no-op, not an error.
        return Ok(());
    }
    let pk_col = desc.pk_column().ok_or_else(|| {
        DbError::validation(format!("{} has no primary key field", desc.type_name))
    })?;
    let pk = ser::pk_value(desc, record)?;
    let dialect = session.dialect();

    let assignments = set
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = {}", dialect.quote_ident(c.column), dialect.placeholder(i + 1)))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        dialect.quote_ident(desc.table),
        assignments,
        dialect.quote_ident(pk_col.column),
        dialect.placeholder(set.values.len() + 1)
    );

    let mut masked = set.masked();
    masked.push(mask_one(pk_col, &pk));
    let mut params = set.values;
    params.push(pk);

    exec_logged(session, "Executing query", &sql, &params, &masked).await?;
    Ok(())
}

/// Update a record by primary key.
///
/// Includes every non-zero, non-auto-timestamp column. A column explicitly
/// set back to its zero value is indistinguishable from one never set on
/// this path; partial-update types get exact semantics through
/// [`update_tracked`].
pub async fn update<T, S>(session: &S, record: &T) -> DbResult<()>
where
    T: Record + 'static,
    S: Session,
{
    let desc = session.registry().descriptor::<T>()?;
    let set = ser::update_set_full(&desc, record);
    run_update(session, &desc, record, set).await
}

/// Update exactly the columns changed since `snapshot` was captured.
///
/// Only valid for types registered with `partial_update`; a previously
/// non-`None` option field now `None` is written as SQL NULL.
pub async fn update_tracked<T, S>(session: &S, record: &T, snapshot: &Snapshot) -> DbResult<()>
where
    T: Record + 'static,
    S: Session,
{
    let desc = session.registry().descriptor::<T>()?;
    if !desc.partial_update {
        return Err(DbError::validation(format!(
            "{} is not registered with partial update",
            desc.type_name
        )));
    }
    let changed = snapshot.diff(record)?;
    let set = ser::update_set_from_fields(&desc, record, &changed);
    run_update(session, &desc, record, set).await
}

async fn run_raw_query<S: Session>(
    session: &S,
    debug_msg: &str,
    sql: &str,
    params: &[Param],
) -> DbResult<Rows> {
    let values = ser::raw_values(params);
    let masked = ser::masked_params(params);
    query_logged(session, debug_msg, sql, &values, &masked).await
}

/// Run a raw query and deserialize every row.
pub async fn query_all<T, S>(session: &S, sql: &str, params: &[Param]) -> DbResult<Vec<T>>
where
    T: Record + Default + 'static,
    S: Session,
{
    let rows = run_raw_query(session, "Querying all rows", sql, params).await?;
    let mut out = Vec::with_capacity(rows.rows.len());
    for row in rows.rows {
        let mut record = T::default();
        populate(&mut record, &rows.columns, row)?;
        out.push(record);
    }
    Ok(out)
}

/// Run a raw query and deserialize the first row, if any.
///
/// Zero rows is not an error.
pub async fn query_first<T, S>(session: &S, sql: &str, params: &[Param]) -> DbResult<Option<T>>
where
    T: Record + Default + 'static,
    S: Session,
{
    let rows = run_raw_query(session, "Querying row", sql, params).await?;
    let Some(row) = rows.rows.into_iter().next() else {
        return Ok(None);
    };
    let mut record = T::default();
    populate(&mut record, &rows.columns, row)?;
    Ok(Some(record))
}

/// Run a raw query that must match exactly one row.
///
/// Zero rows is [`DbError::NotFound`]; more than one is
/// [`DbError::MultipleRows`], never silently truncated.
pub async fn query_one<T, S>(session: &S, sql: &str, params: &[Param]) -> DbResult<T>
where
    T: Record + Default + 'static,
    S: Session,
{
    let rows = run_raw_query(session, "Querying row", sql, params).await?;
    if rows.rows.len() > 1 {
        return Err(DbError::MultipleRows { expected: 1, got: rows.rows.len() });
    }
    let Some(row) = rows.rows.into_iter().next() else {
        return Err(DbError::not_found("query returned no rows"));
    };
    let mut record = T::default();
    populate(&mut record, &rows.columns, row)?;
    Ok(record)
}

/// Execute a raw statement and return the affected row count.
pub async fn exec<S: Session>(session: &S, sql: &str, params: &[Param]) -> DbResult<u64> {
    let values = ser::raw_values(params);
    let masked = ser::masked_params(params);
    let result = exec_logged(session, "Executing query", sql, &values, &masked).await?;
    Ok(result.rows_affected)
}

/// Run a raw query and return the first row as a column → value map.
///
/// `Ok(None)` when the query matches nothing.
pub async fn query_row_map<S: Session>(
    session: &S,
    sql: &str,
    params: &[Param],
) -> DbResult<Option<HashMap<String, Value>>> {
    let rows = run_raw_query(session, "Querying row", sql, params).await?;
    let Some(row) = rows.rows.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(rows.columns.into_iter().zip(row).collect()))
}

/// Run a raw query, invoking `f` once per row.
pub async fn query_do<S, F>(session: &S, sql: &str, params: &[Param], mut f: F) -> DbResult<()>
where
    S: Session,
    F: FnMut(&[String], &[Value]) -> DbResult<()> + Send,
{
    let rows = run_raw_query(session, "Querying all rows", sql, params).await?;
    for row in &rows.rows {
        f(&rows.columns, row)?;
    }
    Ok(())
}

/// Run a raw query and scan the first row into an existing record.
pub async fn get_into<T, S>(session: &S, sql: &str, params: &[Param], dest: &mut T) -> DbResult<()>
where
    T: Record + 'static,
    S: Session,
{
    let rows = run_raw_query(session, "Querying row", sql, params).await?;
    let Some(row) = rows.rows.into_iter().next() else {
        return Err(DbError::not_found("query returned no rows"));
    };
    populate(dest, &rows.columns, row)
}

// Inherent delegation so `db.load(&mut user)` and `tx.load(&mut user)` read
// the same; the free functions remain the single implementation.
macro_rules! impl_session_ops {
    ($ty:ty) => {
        impl $ty {
            pub async fn load<T>(&self, record: &mut T) -> crate::error::DbResult<()>
            where
                T: crate::schema::Record + crate::schema::ModelQueries + 'static,
            {
                crate::ops::load(self, record).await
            }

            pub async fn load_by_field<T>(
                &self,
                record: &mut T,
                field: &str,
            ) -> crate::error::DbResult<()>
            where
                T: crate::schema::Record + crate::schema::ModelQueries + 'static,
            {
                crate::ops::load_by_field(self, record, field).await
            }

            pub async fn load_by_composite<T>(
                &self,
                record: &mut T,
                group: &str,
            ) -> crate::error::DbResult<()>
            where
                T: crate::schema::Record + crate::schema::ModelQueries + 'static,
            {
                crate::ops::load_by_composite(self, record, group).await
            }

            pub async fn insert<T>(&self, record: &mut T) -> crate::error::DbResult<()>
            where
                T: crate::schema::Record + 'static,
            {
                crate::ops::insert(self, record).await
            }

            pub async fn insert_and_load<T>(&self, record: &mut T) -> crate::error::DbResult<()>
            where
                T: crate::schema::Record + crate::schema::ModelQueries + 'static,
            {
                crate::ops::insert_and_load(self, record).await
            }

            pub async fn insert_and_get_id(
                &self,
                sql: &str,
                params: &[crate::value::Param],
            ) -> crate::error::DbResult<i64> {
                crate::ops::insert_and_get_id(self, sql, params).await
            }

            pub async fn update<T>(&self, record: &T) -> crate::error::DbResult<()>
            where
                T: crate::schema::Record + 'static,
            {
                crate::ops::update(self, record).await
            }

            pub async fn update_tracked<T>(
                &self,
                record: &T,
                snapshot: &crate::track::Snapshot,
            ) -> crate::error::DbResult<()>
            where
                T: crate::schema::Record + 'static,
            {
                crate::ops::update_tracked(self, record, snapshot).await
            }

            pub async fn query_all<T>(
                &self,
                sql: &str,
                params: &[crate::value::Param],
            ) -> crate::error::DbResult<Vec<T>>
            where
                T: crate::schema::Record + Default + 'static,
            {
                crate::ops::query_all(self, sql, params).await
            }

            pub async fn query_first<T>(
                &self,
                sql: &str,
                params: &[crate::value::Param],
            ) -> crate::error::DbResult<Option<T>>
            where
                T: crate::schema::Record + Default + 'static,
            {
                crate::ops::query_first(self, sql, params).await
            }

            pub async fn query_one<T>(
                &self,
                sql: &str,
                params: &[crate::value::Param],
            ) -> crate::error::DbResult<T>
            where
                T: crate::schema::Record + Default + 'static,
            {
                crate::ops::query_one(self, sql, params).await
            }

            pub async fn exec(
                &self,
                sql: &str,
                params: &[crate::value::Param],
            ) -> crate::error::DbResult<u64> {
                crate::ops::exec(self, sql, params).await
            }

            pub async fn query_row_map(
                &self,
                sql: &str,
                params: &[crate::value::Param],
            ) -> crate::error::DbResult<
                Option<std::collections::HashMap<String, crate::value::Value>>,
            > {
                crate::ops::query_row_map(self, sql, params).await
            }

            pub async fn query_do<F>(
                &self,
                sql: &str,
                params: &[crate::value::Param],
                f: F,
            ) -> crate::error::DbResult<()>
            where
                F: FnMut(&[String], &[crate::value::Value]) -> crate::error::DbResult<()> + Send,
            {
                crate::ops::query_do(self, sql, params, f).await
            }

            pub async fn get_into<T>(
                &self,
                sql: &str,
                params: &[crate::value::Param],
                dest: &mut T,
            ) -> crate::error::DbResult<()>
            where
                T: crate::schema::Record + 'static,
            {
                crate::ops::get_into(self, sql, params, dest).await
            }
        }
    };
}
pub(crate) use impl_session_ops;
