//! Error types for typedb

use thiserror::Error;

/// Result type alias for typedb operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Configuration error (unknown driver name, bad options)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Type used before registration
    #[error("Unregistered model type: {0}")]
    Unregistered(String),

    /// Model or argument validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single-row query matched more than one row
    #[error("Expected {expected} row, got {got}")]
    MultipleRows { expected: usize, got: usize },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Error surfaced by the underlying driver, wrapped with operation context
    #[error("{op}: {message}")]
    Driver { op: &'static str, message: String },

    /// A RETURNING/OUTPUT clause executed but produced no usable id column
    #[error("typedb: InsertAndGetID RETURNING/OUTPUT clause did not return 'id' column")]
    MissingIdColumn,

    /// Transaction begin/commit/rollback failure
    #[error("Transaction error: {0}")]
    Tx(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap a driver error with the operation that produced it
    pub fn driver(op: &'static str, message: impl Into<String>) -> Self {
        Self::Driver {
            op,
            message: message.into(),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a multiple-rows cardinality error
    pub fn is_multiple_rows(&self) -> bool {
        matches!(self, Self::MultipleRows { .. })
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_id_column_literal_message() {
        assert_eq!(
            DbError::MissingIdColumn.to_string(),
            "typedb: InsertAndGetID RETURNING/OUTPUT clause did not return 'id' column"
        );
    }

    #[test]
    fn driver_error_carries_operation_context() {
        let err = DbError::driver("Exec", "syntax error near VALUES");
        assert_eq!(err.to_string(), "Exec: syntax error near VALUES");
    }

    #[test]
    fn predicates() {
        assert!(DbError::not_found("users id=3").is_not_found());
        assert!(
            DbError::MultipleRows {
                expected: 1,
                got: 2
            }
            .is_multiple_rows()
        );
        assert!(DbError::config("unknown driver").is_config());
    }
}
