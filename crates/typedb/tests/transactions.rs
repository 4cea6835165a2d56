//! Transaction scoping, commit/rollback, and the `with_tx` wrapper.

mod common;

use common::{User, open_db, open_logged};
use typedb::driver::mock::MockConn;
use typedb::value::Value;
use typedb::{DbError, params};

#[tokio::test]
async fn explicit_begin_commit() {
    let conn = MockConn::new();
    conn.expect_exec(1, None);
    let (db, logger) = open_logged("postgres", &conn);

    let tx = db.begin().await.unwrap();
    tx.exec("DELETE FROM posts WHERE id = $1", &params![1_i64])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(
        conn.sql_log(),
        ["BEGIN", "DELETE FROM posts WHERE id = $1", "COMMIT"]
    );
    assert_eq!(logger.debugs()[0].msg, "Beginning transaction");
    assert_eq!(logger.infos()[0].msg, "Transaction committed");
}

#[tokio::test]
async fn explicit_rollback() {
    let conn = MockConn::new();
    let (db, logger) = open_logged("postgres", &conn);

    let tx = db.begin().await.unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(conn.sql_log(), ["BEGIN", "ROLLBACK"]);
    assert_eq!(logger.infos()[0].msg, "Transaction rolled back");
}

#[tokio::test]
async fn with_tx_commits_on_ok() {
    let conn = MockConn::new();
    conn.expect_query(&["id"], vec![vec![Value::Int(5)]]);
    conn.expect_exec(1, None);
    let db = open_db("postgres", &conn);

    let id = db
        .with_tx(|tx| {
            Box::pin(async move {
                let mut user = User {
                    email: "a@example.com".into(),
                    name: "Alice".into(),
                    password_hash: "hash".into(),
                    ..User::default()
                };
                tx.insert(&mut user).await?;
                tx.exec(
                    "UPDATE counters SET users = users + 1",
                    &params![],
                )
                .await?;
                Ok(user.id)
            })
        })
        .await
        .unwrap();

    assert_eq!(id, 5);
    let log = conn.sql_log();
    assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
}

#[tokio::test]
async fn with_tx_rolls_back_on_err() {
    let conn = MockConn::new();
    conn.expect_error("unique violation");
    let db = open_db("postgres", &conn);

    let err = db
        .with_tx(|tx| {
            Box::pin(async move {
                let mut user = User {
                    email: "dup@example.com".into(),
                    name: "Dup".into(),
                    password_hash: "hash".into(),
                    ..User::default()
                };
                tx.insert(&mut user).await?;
                Ok(())
            })
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("unique violation"));
    assert_eq!(conn.sql_log().last().map(String::as_str), Some("ROLLBACK"));
}

#[tokio::test]
async fn with_tx_surfaces_a_rollback_failure() {
    let conn = MockConn::new();
    conn.expect_rollback_error("connection reset");
    let (db, logger) = open_logged("postgres", &conn);

    let err = db
        .with_tx::<(), _>(|_tx| Box::pin(async move { Err(DbError::Other("abort".into())) }))
        .await
        .unwrap_err();

    // The rollback failure wins, carrying the closure's error alongside it.
    assert!(matches!(err, DbError::Tx(_)));
    assert!(err.to_string().contains("connection reset"));
    assert!(err.to_string().contains("abort"));
    let errors = logger.errors();
    assert_eq!(errors[0].msg, "Transaction rollback failed");
}

#[tokio::test]
async fn with_tx_propagates_application_errors() {
    let conn = MockConn::new();
    let db = open_db("postgres", &conn);

    let err = db
        .with_tx::<(), _>(|_tx| Box::pin(async move { Err(DbError::Other("abort".into())) }))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("abort"));
    assert_eq!(conn.sql_log(), ["BEGIN", "ROLLBACK"]);
}

#[tokio::test]
async fn typed_operations_inside_a_transaction() {
    let conn = MockConn::new();
    conn.expect_query(
        &["id", "email", "name", "password_hash", "bio", "updated_at"],
        vec![vec![
            Value::Int(7),
            Value::Text("a@example.com".into()),
            Value::Text("Alice".into()),
            Value::Text("hash".into()),
            Value::Null,
            Value::Text("2024-05-01 12:30:00".into()),
        ]],
    );
    conn.expect_exec(1, None);
    let db = open_db("postgres", &conn);

    let tx = db.begin().await.unwrap();
    let mut user = User {
        id: 7,
        ..User::default()
    };
    tx.load(&mut user).await.unwrap();
    user.name = "Alexandra".into();
    tx.update(&user).await.unwrap();
    tx.commit().await.unwrap();

    let log = conn.sql_log();
    assert_eq!(log.len(), 4);
    assert!(log[2].starts_with("UPDATE \"users\""));
}
