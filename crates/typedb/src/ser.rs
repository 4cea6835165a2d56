//! Record serialization: struct → ordered parameter list, plus the
//! log-facing masked representation.
//!
//! The masked representation is a separate rendering used only by the
//! logging interceptor; it is never substituted into the live parameter
//! list sent to the driver.

use crate::error::{DbError, DbResult};
use crate::registry::ModelDescriptor;
use crate::schema::{ColumnDef, Record};
use crate::value::{Param, Value};

/// Sentinel replacing redacted values in logged parameter lists.
pub const REDACTED: &str = "[REDACTED]";

/// One rendered parameter set: the columns involved, the driver-facing
/// values, and whether each position is redaction-flagged.
pub(crate) struct ParamSet {
    pub columns: Vec<&'static ColumnDef>,
    pub values: Vec<Value>,
}

impl ParamSet {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Log rendering with `nolog` columns masked.
    pub fn masked(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(col, value)| {
                if col.nolog {
                    REDACTED.to_string()
                } else {
                    value.display_for_log()
                }
            })
            .collect()
    }
}

/// Columns and values for an INSERT.
///
/// Auto-timestamp columns are never sent (the database default applies), and
/// a zero-valued primary key is omitted so the backend assigns one.
pub(crate) fn insert_set<T: Record>(desc: &ModelDescriptor, record: &T) -> ParamSet {
    let values = record.values();
    let mut set = ParamSet {
        columns: Vec::with_capacity(desc.columns.len()),
        values: Vec::with_capacity(desc.columns.len()),
    };
    for (col, value) in desc.columns.iter().zip(values) {
        if col.auto_timestamp {
            continue;
        }
        if col.primary && value.is_zero() {
            continue;
        }
        set.columns.push(col);
        set.values.push(value);
    }
    set
}

/// Columns and values for an UPDATE without change tracking.
///
/// Zero-valued columns are excluded, which makes "explicitly set back to
/// zero" indistinguishable from "never set" on this path. Partial-update
/// types avoid the ambiguity via the change tracker.
pub(crate) fn update_set_full<T: Record>(desc: &ModelDescriptor, record: &T) -> ParamSet {
    let values = record.values();
    let mut set = ParamSet {
        columns: Vec::new(),
        values: Vec::new(),
    };
    for (col, value) in desc.columns.iter().zip(values) {
        if col.primary || col.auto_timestamp || value.is_zero() {
            continue;
        }
        set.columns.push(col);
        set.values.push(value);
    }
    set
}

/// Columns and values for an UPDATE restricted to a tracked field set.
///
/// Fields in the set are included regardless of value; a `None` option
/// field explicitly encodes SQL NULL.
pub(crate) fn update_set_from_fields<T: Record>(
    desc: &ModelDescriptor,
    record: &T,
    fields: &[&'static str],
) -> ParamSet {
    let values = record.values();
    let mut set = ParamSet {
        columns: Vec::new(),
        values: Vec::new(),
    };
    for (col, value) in desc.columns.iter().zip(values) {
        if col.primary || col.auto_timestamp {
            continue;
        }
        if fields.contains(&col.column) {
            set.columns.push(col);
            set.values.push(value);
        }
    }
    set
}

/// The record's primary key value, required by single-row operations.
pub(crate) fn pk_value<T: Record>(desc: &ModelDescriptor, record: &T) -> DbResult<Value> {
    let idx = desc.pk.ok_or_else(|| {
        DbError::validation(format!("{} has no primary key field", desc.type_name))
    })?;
    let values = record.values();
    Ok(values[idx].clone())
}

/// Log rendering for a raw parameter list; sensitive bindings are masked.
pub(crate) fn masked_params(params: &[Param]) -> Vec<String> {
    params
        .iter()
        .map(|p| {
            if p.sensitive {
                REDACTED.to_string()
            } else {
                p.value.display_for_log()
            }
        })
        .collect()
}

/// Strip the redaction flags off a raw parameter list for the driver call.
pub(crate) fn raw_values(params: &[Param]) -> Vec<Value> {
    params.iter().map(|p| p.value.clone()).collect()
}
