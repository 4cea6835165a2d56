//! # typedb
//!
//! A thin, tag-driven data-mapping layer over SQL backends.
//!
//! ## Features
//!
//! - **SQL explicit**: models declare their lookup statements; nothing is
//!   generated behind your back beyond INSERT/UPDATE column lists
//! - **Type-safe mapping**: Row ↔ Struct via the [`Record`] trait, derived
//!   with `#[derive(Record)]`
//! - **Five dialects**: PostgreSQL, MySQL, Oracle, SQL Server and SQLite
//!   placeholders, quoting and RETURNING/OUTPUT handling
//! - **Startup validation**: a registered model missing a declared lookup
//!   fails at [`Db::open`], not on first use
//! - **Partial updates**: capture a [`Snapshot`], mutate, and
//!   `update_tracked` writes exactly the changed columns
//! - **Redacted logging**: `nolog` columns and [`Param::redacted`] bindings
//!   never reach a log sink
//!
//! ```ignore
//! use typedb::{Db, DbOptions, Record, Registry, params};
//!
//! #[derive(Record, Default)]
//! #[db(table = "users")]
//! struct User {
//!     #[db(primary)]
//!     id: i64,
//!     #[db(unique)]
//!     email: String,
//!     name: String,
//!     #[db(auto_timestamp)]
//!     updated_at: chrono::NaiveDateTime,
//! }
//!
//! let registry = Registry::new();
//! registry.register::<User>();
//! let db = Db::open("postgres", conn, DbOptions::new(registry))?;
//!
//! let mut user = User { email: "a@example.com".into(), ..Default::default() };
//! db.load_by_field(&mut user, "email").await?;
//! ```

pub mod db;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod log;
pub mod ops;
pub mod registry;
pub mod schema;
pub mod session;
pub mod track;
pub mod tx;
pub mod value;

mod ser;

pub use db::{Db, DbOptions};
pub use dialect::Dialect;
pub use driver::{Connection, ExecResult, Rows, TxHandle};
pub use error::{DbError, DbResult};
pub use log::{
    Event, LogFlags, Logger, MemoryLogger, TracingLogger, default_logger, set_default_logger,
};
pub use registry::{ModelDescriptor, ModelOptions, Registry};
pub use schema::{ColumnDef, Kind, ModelQueries, Record};
pub use ser::REDACTED;
pub use session::Session;
pub use track::Snapshot;
pub use tx::Tx;
pub use value::{FromValue, Param, ToValue, Value};

#[cfg(feature = "derive")]
pub use typedb_derive::Record;
