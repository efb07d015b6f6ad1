// bmk/src/application/error.rs
use thiserror::Error;

use crate::domain::error::DomainError;
use crate::infrastructure::locker::LockerError;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Locker(#[from] LockerError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Other(String),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

impl ApplicationError {
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        match self {
            ApplicationError::Other(msg) => {
                ApplicationError::Other(format!("{}: {}", context.into(), msg))
            }
            ApplicationError::Domain(err) => ApplicationError::Domain(err.context(context)),
            ApplicationError::Validation(msg) => {
                ApplicationError::Validation(format!("{}: {}", context.into(), msg))
            }
            err => ApplicationError::Other(format!("{}: {}", context.into(), err)),
        }
    }
}
