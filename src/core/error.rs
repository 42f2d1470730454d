//! Error taxonomy shared by the store, the service layer and the CLI

use miette::Diagnostic;
use thiserror::Error;

use crate::core::validation::ValidationErrors;
use crate::notify::NotifyError;

/// Errors returned by every library operation
#[derive(Debug, Error, Diagnostic)]
pub enum BmsError {
    /// Bad input; recoverable by fixing the listed fields
    #[error("Invalid {kind}: {errors}")]
    #[diagnostic(
        code(bms::validation),
        help("fix the listed fields and try again")
    )]
    Validation {
        kind: &'static str,
        errors: ValidationErrors,
    },

    /// The id does not (or no longer) exist in the store
    #[error("No {kind} with id {id}")]
    #[diagnostic(code(bms::not_found), help("list the records to see valid ids"))]
    NotFound { kind: &'static str, id: i64 },

    /// Underlying SQLite failure (disk full, lock contention, ...)
    #[error("Storage error: {0}")]
    #[diagnostic(code(bms::storage))]
    Storage(#[from] rusqlite::Error),

    /// Store-level failure that did not originate in SQLite itself
    #[error("Storage error: {0}")]
    #[diagnostic(code(bms::storage))]
    Store(String),

    /// A list filter referenced a column the record type does not have
    #[error("Unknown {kind} field '{column}'")]
    #[diagnostic(code(bms::filter))]
    UnknownColumn { kind: &'static str, column: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(bms::io))]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    #[diagnostic(code(bms::csv))]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(bms::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(bms::notify))]
    Notify(#[from] NotifyError),
}

impl BmsError {
    /// Wrap a list of field failures for the given record kind
    pub fn validation(kind: &'static str, errors: impl Into<ValidationErrors>) -> Self {
        BmsError::Validation {
            kind,
            errors: errors.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BmsError::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BmsError::Validation { .. })
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, BmsError>;
