//! SQLite persistence for the diagnose agent.
//!
//! One serialized write connection, a small read pool for file-backed
//! databases, `PRAGMA user_version` migrations, and the [`EventStore`] that
//! implements the append / drain / clear / unmark flush protocol.

pub mod config_cache;
pub mod connection;
pub mod event_store;
pub mod migrations;
pub mod queries;

pub use connection::DatabaseManager;
pub use event_store::{ClearReport, EventStore};

use diagnose_core::errors::StorageError;

pub(crate) fn to_storage_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}
