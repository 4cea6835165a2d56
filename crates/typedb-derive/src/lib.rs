//! Derive macros for typedb
//!
//! Provides the `#[derive(Record)]` macro.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive the `Record` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use typedb::Record;
///
/// #[derive(Record, Default)]
/// #[db(table = "users")]
/// struct User {
///     #[db(primary)]
///     id: i64,
///     #[db(unique)]
///     email: String,
///     name: String,
///     #[db(nolog)]
///     password_hash: String,
///     #[db(auto_timestamp)]
///     updated_at: chrono::NaiveDateTime,
/// }
/// ```
///
/// # Attributes
///
/// Struct level:
///
/// - `#[db(table = "name")]` - Table name (required)
///
/// Field level:
///
/// - `#[db(column = "name")]` - Map the field to a different column name
/// - `#[db(primary)]` - Primary key; loaded through `QueryBy<Field>`
/// - `#[db(unique)]` - Unique field, loadable with `load_by_field`
/// - `#[db(composite = "group")]` - Member of a named composite key group
/// - `#[db(auto_timestamp)]` - Database-maintained column, never written
/// - `#[db(nolog)]` - Value is replaced by `[REDACTED]` in logs
/// - `#[db(skip)]` - Field is not mapped at all
#[proc_macro_derive(Record, attributes(db))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
