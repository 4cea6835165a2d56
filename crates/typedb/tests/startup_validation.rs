//! Registration-time and open-time model validation.

mod common;

use std::sync::Arc;

use common::User;
use typedb::driver::mock::MockConn;
use typedb::{Db, DbOptions, ModelOptions, ModelQueries, Record, Registry};

#[derive(Record, Default)]
#[db(table = "accounts")]
struct Account {
    #[db(primary)]
    id: i64,
    #[db(unique)]
    email: String,
}

// Deliberately missing QueryByEmail.
impl ModelQueries for Account {
    fn query_by(name: &str) -> Option<&'static str> {
        match name {
            "QueryById" => Some("SELECT id, email FROM accounts WHERE id = $1"),
            _ => None,
        }
    }
}

#[test]
fn registration_panics_naming_the_missing_method() {
    let registry = Registry::new();
    let panic = std::panic::catch_unwind(|| {
        registry.register::<Account>();
    })
    .unwrap_err();

    let message = panic
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(message.contains("validation failed"));
    assert!(message.contains("QueryByEmail"));
}

#[tokio::test]
async fn open_validates_unchecked_registrations() {
    let registry = Registry::new();
    registry.register_unchecked::<Account>(ModelOptions::default());

    let err = Db::open(
        "postgres",
        Arc::new(MockConn::new()),
        DbOptions::new(registry),
    )
    .unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("QueryByEmail"));
}

#[tokio::test]
async fn open_without_validation_defers_to_the_call_site() {
    let registry = Registry::new();
    registry.register_unchecked::<Account>(ModelOptions::default());

    let db = Db::open_without_validation(
        "postgres",
        Arc::new(MockConn::new()),
        DbOptions::new(registry),
    )
    .unwrap();

    let mut account = Account { id: 1, ..Account::default() };
    let err = db.load_by_field(&mut account, "email").await.unwrap_err();
    // ...but the missing unique lookup surfaces per call.
    assert!(err.to_string().contains("QueryByEmail"));
}

#[tokio::test]
async fn unregistered_type_is_an_explicit_error() {
    let db = Db::open(
        "postgres",
        Arc::new(MockConn::new()),
        DbOptions::new(Registry::new()),
    )
    .unwrap();

    let mut user = User::default();
    let err = db.load(&mut user).await.unwrap_err();
    assert!(err.to_string().contains("Unregistered model type"));
}

#[test]
fn unknown_driver_name_is_a_config_error() {
    let err = Db::open(
        "mongodb",
        Arc::new(MockConn::new()),
        DbOptions::new(Registry::new()),
    )
    .unwrap_err();
    assert!(err.is_config());
}

#[tokio::test]
async fn ping_and_close() {
    let conn = MockConn::new();
    let db = Db::open(
        "oracle",
        Arc::new(conn.clone()),
        DbOptions::new(Registry::new()),
    )
    .unwrap();

    db.ping().await.unwrap();
    db.close().await.unwrap();
    assert_eq!(conn.sql_log(), ["SELECT 1 FROM dual", "CLOSE"]);
}

#[tokio::test]
async fn ping_is_logged_like_any_other_query() {
    let conn = MockConn::new();
    let (db, logger) = common::open_logged("postgres", &conn);

    db.ping().await.unwrap();

    let debugs = logger.debugs();
    assert_eq!(debugs[0].msg, "Querying row");
    assert_eq!(debugs[0].field("query"), Some("SELECT 1"));

    conn.expect_error("gone away");
    let err = db.ping().await.unwrap_err();
    assert!(err.to_string().contains("gone away"));
    assert_eq!(logger.errors()[0].msg, "Query failed");
}
