//! Storage errors.

use super::error_code::{self, DiagnoseErrorCode};

/// Errors raised by the local event store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Migration to v{version} failed: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("Corrupt row: {details}")]
    CorruptRow { details: String },
}

impl DiagnoseErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SqliteError { .. } => error_code::STORAGE_ERROR,
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            Self::CorruptRow { .. } => error_code::DB_CORRUPT,
        }
    }
}
