//! Content-deduplicated payload tables referenced by events.
//!
//! State lists are stored as a JSON array so members may contain any
//! character, commas included.

use std::collections::HashMap;

use diagnose_core::errors::StorageError;
use rusqlite::{params, Connection};

use crate::to_storage_err;

pub fn encode_state(state: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(state).map_err(|e| StorageError::CorruptRow {
        details: format!("unencodable state list: {e}"),
    })
}

pub fn decode_state(value: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(value).map_err(|e| StorageError::CorruptRow {
        details: format!("state string {value:?}: {e}"),
    })
}

/// Id of the row holding `state`, inserting it if new.
pub fn upsert_state_string(conn: &Connection, state: &[String]) -> Result<i64, StorageError> {
    let value = encode_state(state)?;
    upsert(conn, "state_strings", &value)
}

/// Id of the row holding `consent_string`, inserting it if new.
pub fn upsert_consent_string(conn: &Connection, consent_string: &str) -> Result<i64, StorageError> {
    upsert(conn, "consent_strings", consent_string)
}

fn upsert(conn: &Connection, table: &str, value: &str) -> Result<i64, StorageError> {
    conn.prepare_cached(&format!(
        "INSERT INTO {table} (value) VALUES (?1) ON CONFLICT(value) DO NOTHING"
    ))
    .and_then(|mut stmt| stmt.execute(params![value]))
    .map_err(to_storage_err)?;

    conn.prepare_cached(&format!("SELECT id FROM {table} WHERE value = ?1"))
        .and_then(|mut stmt| stmt.query_row(params![value], |row| row.get(0)))
        .map_err(to_storage_err)
}

/// Every state list referenced by at least one event, by id.
pub fn referenced_state_strings(conn: &Connection) -> Result<HashMap<i64, Vec<String>>, StorageError> {
    let raw = referenced(conn, "state_strings", "state_string_id")?;
    raw.into_iter()
        .map(|(id, value)| decode_state(&value).map(|state| (id, state)))
        .collect()
}

/// Every consent string referenced by at least one event, by id.
pub fn referenced_consent_strings(conn: &Connection) -> Result<HashMap<i64, String>, StorageError> {
    referenced(conn, "consent_strings", "consent_string_id")
}

fn referenced(
    conn: &Connection,
    table: &str,
    column: &str,
) -> Result<HashMap<i64, String>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT id, value FROM {table}
             WHERE id IN (SELECT {column} FROM events WHERE {column} IS NOT NULL)"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(to_storage_err)?;
    rows.collect::<Result<HashMap<_, _>, _>>()
        .map_err(to_storage_err)
}

/// Remove rows no event references. Returns (state, consent) rows deleted.
pub fn delete_orphans(conn: &Connection) -> Result<(usize, usize), StorageError> {
    let states = conn
        .execute(
            "DELETE FROM state_strings WHERE id NOT IN
             (SELECT state_string_id FROM events WHERE state_string_id IS NOT NULL)",
            [],
        )
        .map_err(to_storage_err)?;
    let consents = conn
        .execute(
            "DELETE FROM consent_strings WHERE id NOT IN
             (SELECT consent_string_id FROM events WHERE consent_string_id IS NOT NULL)",
            [],
        )
        .map_err(to_storage_err)?;
    Ok((states, consents))
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64, StorageError> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .map_err(to_storage_err)
}
