//! Backend-specific SQL rendering rules.
//!
//! A [`Dialect`] is the full set of differences typedb has to care about
//! between the five supported backends: placeholder style, identifier
//! quoting, and how a generated id comes back from an INSERT. Lookups are
//! pure functions; a `Dialect` value is `Copy` and carries no state.

use crate::error::{DbError, DbResult};

/// The SQL dialect of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Mysql,
    Oracle,
    SqlServer,
    Sqlite,
}

impl Dialect {
    /// Resolve a dialect from a driver name as used by `Db::open`.
    ///
    /// Accepts the common driver aliases per backend. An unknown name is a
    /// configuration error at open time, never a deferred failure during the
    /// first query.
    pub fn from_driver_name(name: &str) -> DbResult<Self> {
        match name {
            "postgres" | "postgresql" | "pgx" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            "oracle" | "godror" => Ok(Self::Oracle),
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(DbError::config(format!("unknown driver name {other:?}"))),
        }
    }

    /// Render the parameter placeholder for a 1-based index.
    ///
    /// The index must be stable across a single statement's parameter list.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::Mysql | Self::Sqlite => "?".to_string(),
            Self::Oracle => format!(":{index}"),
            Self::SqlServer => format!("@p{index}"),
        }
    }

    /// Quote a table or column identifier.
    ///
    /// Names come from trusted struct attributes, not user input, but quoting
    /// is still applied to guard reserved words and embedded quote characters.
    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            Self::Postgres | Self::Oracle | Self::Sqlite => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
            Self::Mysql => format!("`{}`", name.replace('`', "``")),
            Self::SqlServer => format!("[{}]", name.replace(']', "]]")),
        }
    }

    /// Whether an INSERT can surface the generated id in its own result set.
    ///
    /// MySQL is the odd one out: the id is retrieved with a last-insert-id
    /// call after execution instead.
    pub fn supports_returning(&self) -> bool {
        !matches!(self, Self::Mysql)
    }

    /// Inject the backend's RETURNING/OUTPUT clause into an INSERT statement.
    ///
    /// Trailing `RETURNING <id>` for Postgres/SQLite/Oracle; `OUTPUT
    /// INSERTED.<id>` spliced in before `VALUES` for SQL Server. MySQL
    /// statements are returned unchanged.
    pub fn inject_returning(&self, sql: &str, id_column: &str) -> String {
        let quoted = self.quote_ident(id_column);
        match self {
            Self::Postgres | Self::Sqlite | Self::Oracle => {
                format!("{} RETURNING {}", sql.trim_end().trim_end_matches(';'), quoted)
            }
            Self::SqlServer => {
                // OUTPUT goes between the column list and VALUES.
                match find_values_keyword(sql) {
                    Some(pos) => {
                        let (head, tail) = sql.split_at(pos);
                        format!("{head}OUTPUT INSERTED.{quoted} {tail}")
                    }
                    None => format!("{} OUTPUT INSERTED.{}", sql.trim_end(), quoted),
                }
            }
            Self::Mysql => sql.to_string(),
        }
    }

    /// The cheapest liveness probe the backend accepts.
    pub fn ping_sql(&self) -> &'static str {
        match self {
            Self::Oracle => "SELECT 1 FROM dual",
            _ => "SELECT 1",
        }
    }

    /// Whether the statement already carries a RETURNING/OUTPUT clause.
    pub fn has_returning(&self, sql: &str) -> bool {
        match self {
            Self::Postgres | Self::Sqlite | Self::Oracle => contains_keyword(sql, "RETURNING"),
            Self::SqlServer => contains_keyword(sql, "OUTPUT"),
            Self::Mysql => false,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Oracle => "oracle",
            Self::SqlServer => "sqlserver",
            Self::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// Whether `sql` contains `keyword` as a standalone word.
///
/// A bare substring match would trip on identifiers like `output_total`.
fn contains_keyword(sql: &str, keyword: &str) -> bool {
    let upper = sql.to_uppercase();
    let bytes = upper.as_bytes();
    let mut search = 0;
    while let Some(rel) = upper[search..].find(keyword) {
        let pos = search + rel;
        let after = pos + keyword.len();
        let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
        let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
        if before_ok && after_ok {
            return true;
        }
        search = after;
    }
    false
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Find the byte offset of a top-level `VALUES` keyword.
fn find_values_keyword(sql: &str) -> Option<usize> {
    let upper = sql.to_uppercase();
    let bytes = upper.as_bytes();
    let mut search = 0;
    while let Some(rel) = upper[search..].find("VALUES") {
        let pos = search + rel;
        let before_ok = pos == 0 || bytes[pos - 1].is_ascii_whitespace() || bytes[pos - 1] == b')';
        let after = pos + "VALUES".len();
        let after_ok = after >= bytes.len()
            || bytes[after].is_ascii_whitespace()
            || bytes[after] == b'(';
        if before_ok && after_ok {
            return Some(pos);
        }
        search = after;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_name_resolution() {
        assert_eq!(
            Dialect::from_driver_name("postgres").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(
            Dialect::from_driver_name("sqlite3").unwrap(),
            Dialect::Sqlite
        );
        assert_eq!(
            Dialect::from_driver_name("sqlserver").unwrap(),
            Dialect::SqlServer
        );
        assert_eq!(Dialect::from_driver_name("godror").unwrap(), Dialect::Oracle);
    }

    #[test]
    fn unknown_driver_is_config_error() {
        let err = Dialect::from_driver_name("mongodb").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(1), "$1");
        assert_eq!(Dialect::Mysql.placeholder(3), "?");
        assert_eq!(Dialect::Sqlite.placeholder(2), "?");
        assert_eq!(Dialect::Oracle.placeholder(2), ":2");
        assert_eq!(Dialect::SqlServer.placeholder(4), "@p4");
    }

    #[test]
    fn identifier_quoting() {
        assert_eq!(Dialect::Postgres.quote_ident("id"), "\"id\"");
        assert_eq!(Dialect::Mysql.quote_ident("order"), "`order`");
        assert_eq!(Dialect::SqlServer.quote_ident("id"), "[id]");
        assert_eq!(
            Dialect::Postgres.quote_ident("we\"ird"),
            "\"we\"\"ird\""
        );
        assert_eq!(Dialect::SqlServer.quote_ident("a]b"), "[a]]b]");
    }

    #[test]
    fn returning_trailing() {
        let sql = "INSERT INTO users (name) VALUES ($1)";
        assert_eq!(
            Dialect::Postgres.inject_returning(sql, "id"),
            "INSERT INTO users (name) VALUES ($1) RETURNING \"id\""
        );
    }

    #[test]
    fn returning_strips_trailing_semicolon() {
        let sql = "INSERT INTO users (name) VALUES (?);";
        assert_eq!(
            Dialect::Sqlite.inject_returning(sql, "id"),
            "INSERT INTO users (name) VALUES (?) RETURNING \"id\""
        );
    }

    #[test]
    fn output_embedded_before_values() {
        let sql = "INSERT INTO users (name) VALUES (@p1)";
        assert_eq!(
            Dialect::SqlServer.inject_returning(sql, "id"),
            "INSERT INTO users (name) OUTPUT INSERTED.[id] VALUES (@p1)"
        );
    }

    #[test]
    fn mysql_insert_unchanged() {
        let sql = "INSERT INTO users (name) VALUES (?)";
        assert_eq!(Dialect::Mysql.inject_returning(sql, "id"), sql);
        assert!(!Dialect::Mysql.supports_returning());
    }

    #[test]
    fn returning_detection() {
        assert!(Dialect::Postgres.has_returning("INSERT INTO t (a) VALUES ($1) RETURNING id"));
        assert!(!Dialect::Postgres.has_returning("INSERT INTO t (a) VALUES ($1)"));
        assert!(Dialect::SqlServer.has_returning(
            "INSERT INTO t (a) OUTPUT INSERTED.id VALUES (@p1)"
        ));
    }

    #[test]
    fn returning_not_matched_inside_identifiers() {
        assert!(!Dialect::Postgres.has_returning(
            "INSERT INTO t (returning_count) VALUES ($1)"
        ));
        assert!(!Dialect::SqlServer.has_returning(
            "INSERT INTO t (output_total) VALUES (@p1)"
        ));
        assert!(Dialect::Postgres.has_returning(
            "insert into t (a) values ($1) returning id"
        ));
    }

    #[test]
    fn values_keyword_not_matched_inside_identifier() {
        let sql = "INSERT INTO t (list_values_col) VALUES (@p1)";
        assert_eq!(
            Dialect::SqlServer.inject_returning(sql, "id"),
            "INSERT INTO t (list_values_col) OUTPUT INSERTED.[id] VALUES (@p1)"
        );
    }
}
