//! Schema migrations using PRAGMA user_version.

pub mod v001_events;
pub mod v002_vendors;

use diagnose_core::errors::StorageError;
use rusqlite::Connection;

use crate::to_storage_err;

const MIGRATIONS: &[(&str, u32)] = &[
    (v001_events::MIGRATION_SQL, 1),
    (v002_vendors::MIGRATION_SQL, 2),
];

/// Run all pending migrations. Each migration and its version bump commit
/// together.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current_version = current_version(conn)?;

    for (sql, version) in MIGRATIONS {
        if current_version >= *version {
            continue;
        }
        let apply = || -> rusqlite::Result<()> {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()
        };
        apply().map_err(|e| StorageError::MigrationFailed {
            version: *version,
            message: e.to_string(),
        })?;
        tracing::info!(version = version, "applied migration");
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(to_storage_err)
}

/// Schema version this build expects.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(_, v)| *v)
}
