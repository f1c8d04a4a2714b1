//! Queries for the config history table. Append-only; latest row wins.

use diagnose_core::errors::StorageError;
use rusqlite::{params, Connection, OptionalExtension};

use crate::to_storage_err;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRow {
    pub id: i64,
    pub config_time: i64,
    pub value: String,
}

pub fn insert_config(
    conn: &Connection,
    config_time: i64,
    config_version: &str,
    value: &str,
) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO config (config_time, config_version, value) VALUES (?1, ?2, ?3)",
        params![config_time, config_version, value],
    )
    .map_err(to_storage_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn latest_config(
    conn: &Connection,
    config_version: &str,
) -> Result<Option<ConfigRow>, StorageError> {
    conn.prepare_cached(
        "SELECT id, config_time, value FROM config
         WHERE config_version = ?1
         ORDER BY config_time DESC, id DESC LIMIT 1",
    )
    .and_then(|mut stmt| {
        stmt.query_row(params![config_version], |row| {
            Ok(ConfigRow {
                id: row.get(0)?,
                config_time: row.get(1)?,
                value: row.get(2)?,
            })
        })
        .optional()
    })
    .map_err(to_storage_err)
}

/// Timestamp of the newest row, used to validate cached copies.
pub fn latest_config_time(
    conn: &Connection,
    config_version: &str,
) -> Result<Option<i64>, StorageError> {
    conn.prepare_cached(
        "SELECT config_time FROM config
         WHERE config_version = ?1
         ORDER BY config_time DESC, id DESC LIMIT 1",
    )
    .and_then(|mut stmt| stmt.query_row(params![config_version], |row| row.get(0)).optional())
    .map_err(to_storage_err)
}

/// Drop every row of `config_version` other than `keep_id`.
pub fn prune_history(
    conn: &Connection,
    config_version: &str,
    keep_id: i64,
) -> Result<usize, StorageError> {
    conn.execute(
        "DELETE FROM config WHERE config_version = ?1 AND id <> ?2",
        params![config_version, keep_id],
    )
    .map_err(to_storage_err)
}

pub fn count_history(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM config", [], |row| row.get(0))
        .map_err(to_storage_err)
}
