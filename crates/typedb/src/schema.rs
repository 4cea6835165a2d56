//! The record contract: column descriptions and the traits a mapped type
//! implements.
//!
//! `#[derive(Record)]` (from `typedb-derive`) generates the [`Record`] impl
//! from `#[db(...)]` field attributes; [`ModelQueries`] is written by hand,
//! one arm per lookup, mirroring the SQL the model's table actually needs.

use crate::error::DbResult;
use crate::value::Value;

/// Semantic kind of a mapped column, selecting its coercion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Signed integer family.
    Int,
    /// Unsigned integer family; drivers may return u64 as a decimal string.
    UInt,
    Float,
    Bool,
    /// Text, CLOB, and any opaque-as-string kind (arrays, geometry, ranges).
    Text,
    /// Binary/BLOB content; hex-encoded when the field type is `String`.
    Bytes,
    Timestamp,
    Json,
}

/// Description of one mapped field.
///
/// Column order in a model's descriptor list is stable and determines
/// parameter position; it need not match the physical table's column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Rust field identifier.
    pub field: &'static str,
    /// UpperCamelCase form of the field, used to build `QueryByX` names.
    pub pascal: &'static str,
    /// Database column name.
    pub column: &'static str,
    pub kind: Kind,
    /// Derived from the field type: `Option<T>` fields are nullable.
    pub nullable: bool,
    pub primary: bool,
    pub unique: bool,
    /// Composite key group this column belongs to, if any.
    pub composite: Option<&'static str>,
    /// Database-populated on insert/update; never sent as a parameter.
    pub auto_timestamp: bool,
    /// Redacted from all log output.
    pub nolog: bool,
}

impl ColumnDef {
    /// The `QueryBy` lookup name this column demands when unique or primary.
    pub fn lookup_name(&self) -> String {
        format!("QueryBy{}", self.pascal)
    }
}

/// A type mapped to a database table.
///
/// Implemented via `#[derive(Record)]`; the derive infers each field's
/// semantic kind and nullability from its Rust type.
pub trait Record: Send + Sync {
    /// Target table name.
    fn table_name() -> &'static str;

    /// Ordered column descriptors for this type.
    fn columns() -> &'static [ColumnDef];

    /// Current field values, in descriptor order.
    fn values(&self) -> Vec<Value>;

    /// Store one result value into the named column's field.
    ///
    /// Columns not mapped by this type are ignored (raw queries may select
    /// extra columns); a type mismatch fails the whole row with
    /// [`crate::DbError::Decode`].
    fn put(&mut self, column: &str, value: Value) -> DbResult<()>;
}

/// Hand-written lookup SQL for a record type.
///
/// Keys follow the `QueryBy` convention: `QueryBy` plus the UpperCamelCase
/// field name for the primary key and each unique field, or the
/// alphabetically-sorted concatenation of the group's field names for a
/// composite key. Registration verifies every required key answers `Some`.
///
/// ```ignore
/// impl ModelQueries for User {
///     fn query_by(name: &str) -> Option<&'static str> {
///         match name {
///             "QueryById" => Some("SELECT id, name, email FROM users WHERE id = $1"),
///             "QueryByEmail" => Some("SELECT id, name, email FROM users WHERE email = $1"),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait ModelQueries {
    fn query_by(name: &str) -> Option<&'static str>;
}

/// Find a column descriptor (and its index) by field name.
pub(crate) fn column_by_field<'a>(
    columns: &'a [ColumnDef],
    field: &str,
) -> Option<(usize, &'a ColumnDef)> {
    columns
        .iter()
        .enumerate()
        .find(|(_, c)| c.field == field || c.pascal == field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_name_from_pascal() {
        let col = ColumnDef {
            field: "email",
            pascal: "Email",
            column: "email",
            kind: Kind::Text,
            nullable: false,
            primary: false,
            unique: true,
            composite: None,
            auto_timestamp: false,
            nolog: false,
        };
        assert_eq!(col.lookup_name(), "QueryByEmail");
    }
}
