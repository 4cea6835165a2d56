//! Shared model fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use typedb::driver::mock::MockConn;
use typedb::log::MemoryLogger;
use typedb::{Db, DbOptions, ModelOptions, ModelQueries, Record, Registry};

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[db(table = "users")]
pub struct User {
    #[db(primary)]
    pub id: i64,
    #[db(unique)]
    pub email: String,
    pub name: String,
    #[db(nolog)]
    pub password_hash: String,
    pub bio: Option<String>,
    #[db(auto_timestamp)]
    pub updated_at: chrono::NaiveDateTime,
}

impl ModelQueries for User {
    fn query_by(name: &str) -> Option<&'static str> {
        match name {
            "QueryById" => Some(
                "SELECT id, email, name, password_hash, bio, updated_at \
                 FROM users WHERE id = $1",
            ),
            "QueryByEmail" => Some(
                "SELECT id, email, name, password_hash, bio, updated_at \
                 FROM users WHERE email = $1",
            ),
            _ => None,
        }
    }
}

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[db(table = "profiles")]
pub struct Profile {
    #[db(primary)]
    pub id: i64,
    #[db(composite = "owner")]
    pub post_id: i64,
    #[db(composite = "owner")]
    pub user_id: i64,
    pub title: String,
}

impl ModelQueries for Profile {
    fn query_by(name: &str) -> Option<&'static str> {
        match name {
            "QueryById" => Some(
                "SELECT id, post_id, user_id, title FROM profiles WHERE id = $1",
            ),
            // Parameters bind in the group's alphabetical field order.
            "QueryByPostIdUserId" => Some(
                "SELECT id, post_id, user_id, title FROM profiles \
                 WHERE post_id = $1 AND user_id = $2",
            ),
            _ => None,
        }
    }
}

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[db(table = "events")]
pub struct Event {
    #[db(primary)]
    pub id: i64,
    pub name: String,
    pub occurred_at: chrono::NaiveDateTime,
}

impl ModelQueries for Event {
    fn query_by(name: &str) -> Option<&'static str> {
        match name {
            "QueryById" => Some(
                "SELECT id, name, occurred_at FROM events WHERE id = $1",
            ),
            _ => None,
        }
    }
}

pub fn registry() -> Registry {
    let registry = Registry::new();
    registry.register::<User>();
    registry.register::<Event>();
    registry.register_with_options::<Profile>(ModelOptions {
        partial_update: true,
    });
    registry
}

pub fn open_db(driver: &str, conn: &MockConn) -> Db {
    Db::open(driver, Arc::new(conn.clone()), DbOptions::new(registry()))
        .expect("open mock db")
}

pub fn open_logged(driver: &str, conn: &MockConn) -> (Db, Arc<MemoryLogger>) {
    let logger = MemoryLogger::new();
    let db = Db::open(
        driver,
        Arc::new(conn.clone()),
        DbOptions::new(registry()).with_logger(logger.clone()),
    )
    .expect("open mock db");
    (db, logger)
}
