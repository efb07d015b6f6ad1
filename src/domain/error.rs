// bmk/src/domain/error.rs
use crate::domain::bookmark::BookmarkBuilderError;
use thiserror::Error;

/// Stable error kinds surfaced to collaborators. Callers match on the
/// variant; the rendered message is informational only.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("URL cannot be empty")]
    UrlEmpty,

    #[error("record has no tags")]
    TagsEmpty,

    #[error("checksum has not been set")]
    ChecksumEmpty,

    #[error("invalid sort column or direction: {0}")]
    InvalidSortBy(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("record already exists: {0}")]
    RecordDuplicate(String),

    #[error("failed to scan record: {0}")]
    RecordScan(String),

    #[error("no records match: {0}")]
    RecordNoMatch(String),

    #[error("no record IDs provided")]
    RecordIdNotProvided,

    #[error("database not found: {0}")]
    DbNotFound(String),

    #[error("database already exists: {0}")]
    DbExists(String),

    #[error("database is corrupted: {0}")]
    DbCorrupted(String),

    #[error("failed to commit transaction: {0}")]
    Commit(String),

    #[error("backup already exists: {0}")]
    BackupExists(String),

    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Prefix the message of wrap-style variants with context. Typed kinds
    /// pass through untouched so callers can still match on them.
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        match self {
            DomainError::Other(msg) => DomainError::Other(format!("{}: {}", context.into(), msg)),
            DomainError::RecordScan(msg) => {
                DomainError::RecordScan(format!("{}: {}", context.into(), msg))
            }
            err => err,
        }
    }
}

impl From<BookmarkBuilderError> for DomainError {
    fn from(e: BookmarkBuilderError) -> Self {
        DomainError::Other(e.to_string())
    }
}
