//! Engine-level error kinds returned by every registry operation.
//!
//! Store errors are classified on the way up: uniqueness collisions become
//! `Conflict`, broken references and unreadable rows become `DataIntegrity`.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl ClinicError {
    pub(crate) fn not_found(entity: &str, key: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    /// Stable machine-readable code for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::DataIntegrity(_) => "DATA_INTEGRITY",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Database(_) => "DATABASE",
        }
    }
}

impl From<DatabaseError> for ClinicError {
    fn from(err: DatabaseError) -> Self {
        if err.is_unique_violation() {
            return Self::Conflict(err.to_string());
        }
        if err.is_foreign_key_violation() {
            return Self::DataIntegrity(err.to_string());
        }
        match err {
            DatabaseError::NotFound { entity_type, id } => Self::NotFound {
                entity: entity_type,
                key: id,
            },
            DatabaseError::InvalidEnum { .. }
            | DatabaseError::Sqlite(rusqlite::Error::FromSqlConversionFailure(..)) => {
                Self::DataIntegrity(err.to_string())
            }
            other => Self::Database(other),
        }
    }
}

impl From<rusqlite::Error> for ClinicError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

/// Run `op` inside one transaction. Commits on `Ok`; any `Err` drops the
/// transaction, which rolls every write back.
///
/// The write lock is taken up front (`BEGIN IMMEDIATE`), so a competing
/// connection waits out the busy timeout and then reads committed state
/// instead of failing its lock upgrade mid-operation.
pub(crate) fn in_transaction<T>(
    conn: &Connection,
    op: impl FnOnce(&Connection) -> Result<T, ClinicError>,
) -> Result<T, ClinicError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let out = op(&tx)?;
    tx.commit()?;
    Ok(out)
}

/// Trimmed, non-empty text or `InvalidInput`.
pub(crate) fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str, ClinicError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClinicError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}
