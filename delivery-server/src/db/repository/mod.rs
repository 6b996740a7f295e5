//! Repository Module
//!
//! Free async functions over SQLite, one module per table group. Functions
//! that must run inside a caller's transaction take
//! `impl sqlx::Executor<'_, Database = Sqlite>` so they accept either the
//! pool or `&mut *tx`. Functions returning hydrated entities say so in their
//! name or doc; none performs hidden joins.

pub mod client;
pub mod generation;
pub mod order;
pub mod payment;
pub mod shipment;

use thiserror::Error;

/// SQLite extended result codes we care about
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_BUSY_SNAPSHOT: i32 = 517;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// A read snapshot went stale before the write; retry from a fresh read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage timed out or is locked; retryable
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepoError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return RepoError::Duplicate(db_err.message().to_string());
                }
                let code = db_err
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .unwrap_or_default();
                match code {
                    SQLITE_BUSY_SNAPSHOT => RepoError::Conflict(db_err.message().to_string()),
                    c if c & 0xff == SQLITE_BUSY || c & 0xff == SQLITE_LOCKED => {
                        RepoError::Unavailable(db_err.message().to_string())
                    }
                    _ => RepoError::Database(db_err.message().to_string()),
                }
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Database(format!("Corrupt JSON column: {err}"))
    }
}

impl From<crate::money::MoneyError> for RepoError {
    fn from(err: crate::money::MoneyError) -> Self {
        RepoError::Validation(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            RepoError::from(sqlx::Error::PoolTimedOut),
            RepoError::Unavailable(_)
        ));
        assert!(matches!(
            RepoError::from(sqlx::Error::PoolClosed),
            RepoError::Unavailable(_)
        ));
        assert!(matches!(
            RepoError::from(sqlx::Error::RowNotFound),
            RepoError::NotFound(_)
        ));
    }
}
