//! Database error types.

use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected the write. Carries the constraint name.
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Query failed: {0}")]
    Query(sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists(what.into())
    }

    /// True if a uniqueness constraint fired.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::AlreadyExists(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound("row".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::AlreadyExists(db.constraint().unwrap_or("unique").to_string())
            }
            _ => DbError::Query(err),
        }
    }
}
