// bmk/src/infrastructure/repositories/sqlite/error.rs

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::domain::error::DomainError;

#[derive(Error, Debug)]
pub enum SqliteRepositoryError {
    #[error("database error: {0}")]
    DatabaseError(DieselError),

    #[error("diesel connection error: {0}")]
    ConnectionError(#[from] diesel::ConnectionError),

    #[error("connection pool error: {0}")]
    ConnectionPoolError(String),

    #[error("failed to commit transaction: {0}")]
    CommitFailed(String),

    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("database already exists: {0}")]
    DatabaseExists(String),

    #[error("integrity check failed: {0}")]
    Corrupted(String),

    #[error("failed to convert entity: {0}")]
    ConversionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("repository operation failed: {0}")]
    OperationFailed(String),

    #[error(transparent)]
    Domain(DomainError),
}

pub type SqliteResult<T> = Result<T, SqliteRepositoryError>;

impl From<DieselError> for SqliteRepositoryError {
    fn from(err: DieselError) -> Self {
        match err {
            // Commit failures must stay distinguishable from query errors.
            DieselError::RollbackErrorOnCommit { commit_error, .. } => {
                SqliteRepositoryError::CommitFailed(commit_error.to_string())
            }
            err => SqliteRepositoryError::DatabaseError(err),
        }
    }
}

impl From<DomainError> for SqliteRepositoryError {
    fn from(err: DomainError) -> Self {
        SqliteRepositoryError::Domain(err)
    }
}

impl From<SqliteRepositoryError> for DomainError {
    fn from(err: SqliteRepositoryError) -> Self {
        match err {
            SqliteRepositoryError::Domain(e) => e,
            SqliteRepositoryError::DatabaseNotFound(p) => DomainError::DbNotFound(p),
            SqliteRepositoryError::DatabaseExists(p) => DomainError::DbExists(p),
            SqliteRepositoryError::Corrupted(msg) => DomainError::DbCorrupted(msg),
            SqliteRepositoryError::CommitFailed(msg) => DomainError::Commit(msg),
            SqliteRepositoryError::ConversionError(msg) => DomainError::RecordScan(msg),
            SqliteRepositoryError::IoError(e) => DomainError::Io(e),
            SqliteRepositoryError::DatabaseError(diesel_err) => match diesel_err {
                DieselError::NotFound => {
                    DomainError::RecordNotFound("resource not found".to_string())
                }
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                    DomainError::RecordDuplicate(info.message().to_string())
                }
                err => DomainError::Other(format!("database error: {}", err)),
            },
            err => DomainError::Other(err.to_string()),
        }
    }
}
