//! Change tracking for partial updates.
//!
//! A [`Snapshot`] is captured from a loaded record and held by the caller;
//! diffing it against the mutated record yields the minimal set of changed
//! columns for the UPDATE statement.

use crate::error::{DbError, DbResult};
use crate::schema::Record;
use crate::value::Value;

/// A prior-state capture of a loaded record.
///
/// Valid only against the same record type and primary key it was captured
/// from; a mismatched diff is rejected rather than producing garbage.
#[derive(Debug, Clone)]
pub struct Snapshot {
    type_name: &'static str,
    pk: Option<Value>,
    values: Vec<Value>,
}

impl Snapshot {
    /// Capture the current state of a record.
    pub fn capture<T: Record + 'static>(record: &T) -> Self {
        let values = record.values();
        let pk = T::columns()
            .iter()
            .position(|c| c.primary)
            .map(|idx| values[idx].clone());
        Self {
            type_name: std::any::type_name::<T>(),
            pk,
            values,
        }
    }

    /// Compute the set of columns whose value changed since capture.
    ///
    /// Values compare by equality, including explicit comparison against
    /// zero: a field intentionally set back to its zero value is still
    /// reported. An `Option` field going from `Some` to `None` is reported
    /// as changed (it becomes SQL NULL in the update).
    pub fn diff<T: Record + 'static>(&self, current: &T) -> DbResult<Vec<&'static str>> {
        if self.type_name != std::any::type_name::<T>() {
            return Err(DbError::validation(format!(
                "snapshot of {} diffed against {}",
                self.type_name,
                std::any::type_name::<T>()
            )));
        }
        let columns = T::columns();
        let values = current.values();
        if let (Some(snap_pk), Some(idx)) = (&self.pk, columns.iter().position(|c| c.primary)) {
            if snap_pk != &values[idx] {
                return Err(DbError::validation(format!(
                    "snapshot primary key {} does not match record primary key {}",
                    snap_pk.display_for_log(),
                    values[idx].display_for_log()
                )));
            }
        }

        let mut changed = Vec::new();
        for ((col, old), new) in columns.iter().zip(&self.values).zip(&values) {
            if col.primary || col.auto_timestamp {
                continue;
            }
            if old != new {
                changed.push(col.column);
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, Kind};
    use crate::value::{ToValue, decode_column};

    #[derive(Default, Clone)]
    struct Gauge {
        id: i64,
        reading: f64,
        label: String,
        comment: Option<String>,
    }

    static GAUGE_COLUMNS: &[ColumnDef] = &[
        ColumnDef {
            field: "id",
            pascal: "Id",
            column: "id",
            kind: Kind::Int,
            nullable: false,
            primary: true,
            unique: false,
            composite: None,
            auto_timestamp: false,
            nolog: false,
        },
        ColumnDef {
            field: "reading",
            pascal: "Reading",
            column: "reading",
            kind: Kind::Float,
            nullable: false,
            primary: false,
            unique: false,
            composite: None,
            auto_timestamp: false,
            nolog: false,
        },
        ColumnDef {
            field: "label",
            pascal: "Label",
            column: "label",
            kind: Kind::Text,
            nullable: false,
            primary: false,
            unique: false,
            composite: None,
            auto_timestamp: false,
            nolog: false,
        },
        ColumnDef {
            field: "comment",
            pascal: "Comment",
            column: "comment",
            kind: Kind::Text,
            nullable: true,
            primary: false,
            unique: false,
            composite: None,
            auto_timestamp: false,
            nolog: false,
        },
    ];

    impl Record for Gauge {
        fn table_name() -> &'static str {
            "gauges"
        }

        fn columns() -> &'static [ColumnDef] {
            GAUGE_COLUMNS
        }

        fn values(&self) -> Vec<Value> {
            vec![
                self.id.to_value(),
                self.reading.to_value(),
                self.label.to_value(),
                self.comment.to_value(),
            ]
        }

        fn put(&mut self, column: &str, value: Value) -> DbResult<()> {
            match column {
                "id" => self.id = decode_column(column, value)?,
                "reading" => self.reading = decode_column(column, value)?,
                "label" => self.label = decode_column(column, value)?,
                "comment" => self.comment = decode_column(column, value)?,
                _ => {}
            }
            Ok(())
        }
    }

    fn loaded() -> Gauge {
        Gauge {
            id: 3,
            reading: 1.5,
            label: "boiler".into(),
            comment: Some("ok".into()),
        }
    }

    #[test]
    fn unchanged_record_diffs_empty() {
        let record = loaded();
        let snapshot = Snapshot::capture(&record);
        assert!(snapshot.diff(&record).unwrap().is_empty());
    }

    #[test]
    fn single_mutation_yields_single_column() {
        let record = loaded();
        let snapshot = Snapshot::capture(&record);
        let mut mutated = record.clone();
        mutated.reading = 2.5;
        assert_eq!(snapshot.diff(&mutated).unwrap(), ["reading"]);
    }

    #[test]
    fn set_back_to_zero_is_still_reported() {
        let record = loaded();
        let snapshot = Snapshot::capture(&record);
        let mut mutated = record.clone();
        mutated.label = String::new();
        assert_eq!(snapshot.diff(&mutated).unwrap(), ["label"]);
    }

    #[test]
    fn some_to_none_is_changed_to_null() {
        let record = loaded();
        let snapshot = Snapshot::capture(&record);
        let mut mutated = record.clone();
        mutated.comment = None;
        assert_eq!(snapshot.diff(&mutated).unwrap(), ["comment"]);
    }

    #[test]
    fn primary_key_mismatch_rejected() {
        let record = loaded();
        let snapshot = Snapshot::capture(&record);
        let mut other = record.clone();
        other.id = 99;
        let err = snapshot.diff(&other).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }
}
