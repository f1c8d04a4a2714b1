//! Queries for the events table.

use diagnose_core::errors::StorageError;
use diagnose_core::models::EventType;
use rusqlite::{params, Connection, OptionalExtension};

use crate::to_storage_err;

/// Column values for a new event row.
#[derive(Debug, Clone, Default)]
pub struct NewEventRow<'a> {
    pub event_time: i64,
    pub flags: i64,
    pub vendor_id: Option<&'a str>,
    pub domain: Option<&'a str>,
    pub consent_string_id: Option<i64>,
    pub state_string_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub id: i64,
    pub event_time: i64,
    pub flags: i64,
    pub vendor_id: Option<String>,
    pub domain: Option<String>,
    pub consent_string_id: Option<i64>,
    pub state_string_id: Option<i64>,
}

pub fn insert_event(conn: &Connection, row: &NewEventRow<'_>) -> Result<i64, StorageError> {
    conn.prepare_cached(
        "INSERT INTO events (event_time, flags, vendor_id, domain, consent_string_id, state_string_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .and_then(|mut stmt| {
        stmt.execute(params![
            row.event_time,
            row.flags,
            row.vendor_id,
            row.domain,
            row.consent_string_id,
            row.state_string_id
        ])
    })
    .map_err(to_storage_err)?;
    Ok(conn.last_insert_rowid())
}

/// All events in replay order.
pub fn query_all_ordered(conn: &Connection) -> Result<Vec<EventRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, event_time, flags, vendor_id, domain, consent_string_id, state_string_id
             FROM events ORDER BY event_time ASC, id ASC",
        )
        .map_err(to_storage_err)?;

    let rows = stmt
        .query_map([], |row| {
            Ok(EventRow {
                id: row.get(0)?,
                event_time: row.get(1)?,
                flags: row.get(2)?,
                vendor_id: row.get(3)?,
                domain: row.get(4)?,
                consent_string_id: row.get(5)?,
                state_string_id: row.get(6)?,
            })
        })
        .map_err(to_storage_err)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)
}

/// Id of the newest event of `event_type` at or before `marker`.
pub fn newest_of_type_at_or_before(
    conn: &Connection,
    event_type: EventType,
    marker: i64,
) -> Result<Option<i64>, StorageError> {
    conn.query_row(
        "SELECT id FROM events
         WHERE (flags & 255) = ?1 AND event_time <= ?2
         ORDER BY event_time DESC, id DESC LIMIT 1",
        params![event_type.ordinal(), marker],
        |row| row.get(0),
    )
    .optional()
    .map_err(to_storage_err)
}

/// Delete every event at or before `marker` except the listed ids.
pub fn delete_through_marker(
    conn: &Connection,
    marker: i64,
    keep_state: Option<i64>,
    keep_consent: Option<i64>,
) -> Result<usize, StorageError> {
    // NOT IN with a NULL member matches nothing, so absent ids become -1.
    conn.execute(
        "DELETE FROM events
         WHERE event_time <= ?1 AND id NOT IN (COALESCE(?2, -1), COALESCE(?3, -1))",
        params![marker, keep_state, keep_consent],
    )
    .map_err(to_storage_err)
}

pub fn count_events(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
        .map_err(to_storage_err)
}

/// Newest timestamp this store has written, across events and config rows.
pub fn high_water_mark(conn: &Connection) -> Result<Option<i64>, StorageError> {
    conn.query_row(
        "SELECT MAX(t) FROM (
            SELECT MAX(event_time) AS t FROM events
            UNION ALL
            SELECT MAX(config_time) FROM config
         )",
        [],
        |row| row.get(0),
    )
    .map_err(to_storage_err)
}
