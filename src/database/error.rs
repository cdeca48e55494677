//! Database error types and sqlx error mapping.

use thiserror::Error;

use crate::error::{AppError, AppErrorKind, InfrastructureError};

/// Classified database failure.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct DatabaseError {
    kind: DatabaseErrorKind,
}

#[derive(Debug, Clone, Error)]
pub enum DatabaseErrorKind {
    #[error("row not found")]
    NotFound,

    /// A unique index rejected the write. Used as the idempotency signal
    /// for webhook replays (tx_hash / external_transfer_id indexes).
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("{message}")]
    Unknown { message: String },
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &DatabaseErrorKind {
        &self.kind
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::NotFound)
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::UniqueViolation { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::Connection { .. })
    }

    /// Map a raw sqlx error into a classified `DatabaseError`.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::RowNotFound => DatabaseErrorKind::NotFound,
            sqlx::Error::Database(db_err) => {
                // 23505 = unique_violation
                if db_err.code().as_deref() == Some("23505") {
                    DatabaseErrorKind::UniqueViolation {
                        constraint: db_err
                            .constraint()
                            .unwrap_or("<unnamed constraint>")
                            .to_string(),
                    }
                } else {
                    DatabaseErrorKind::Unknown {
                        message: db_err.to_string(),
                    }
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseErrorKind::Connection {
                    message: err.to_string(),
                }
            }
            _ => DatabaseErrorKind::Unknown {
                message: err.to_string(),
            },
        };

        DatabaseError::new(kind)
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from_sqlx(err)
    }
}

// Implemented here rather than in error.rs to keep the dependency pointing
// one way (database -> error).
impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        let is_retryable = err.is_retryable();
        AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
            message: err.to_string(),
            is_retryable,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = DatabaseError::from_sqlx(sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
        assert!(!err.is_unique_violation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn pool_timeout_is_retryable() {
        let err = DatabaseError::from_sqlx(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
    }
}
