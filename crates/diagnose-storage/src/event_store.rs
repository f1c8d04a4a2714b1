//! Durable event queue with a mark-and-sweep flush protocol.
//!
//! Marker states:
//! - `None`: nothing in flight.
//! - `Some(t)`: a drain covered every event with `event_time <= t` and the
//!   batch has not been acknowledged yet.
//!
//! `drain` sets the marker, `clear_old_events` deletes what it covered and
//! resets it, `unmark_send_events` resets it without deleting. Appends never
//! touch it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use diagnose_core::clock::MonotonicClock;
use diagnose_core::config::StorageConfig;
use diagnose_core::constants::CONFIG_VERSION;
use diagnose_core::errors::StorageError;
use diagnose_core::models::{Event, EventFlags, EventType, SendEvent, StoredConfig, VendorDatabase};
use diagnose_core::traits::VendorDatabaseLoader;
use rusqlite::Connection;

use crate::config_cache::ConfigCache;
use crate::connection::writer::with_immediate_transaction;
use crate::connection::DatabaseManager;
use crate::queries::events::{EventRow, NewEventRow};
use crate::queries::{config as config_q, dimensions, events as events_q, vendors as vendors_q};

/// Outcome of a `clear_old_events` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Marker that was cleared; `None` when there was nothing to clear.
    pub marker: Option<i64>,
    pub events_deleted: usize,
    pub state_strings_deleted: usize,
    pub consent_strings_deleted: usize,
}

pub struct EventStore {
    db: DatabaseManager,
    clock: Arc<dyn MonotonicClock>,
    config_cache: ConfigCache,
}

impl EventStore {
    /// Advances `clock` past every timestamp already in `db`, so events stamped
    /// by this process sort after anything an earlier process drained.
    pub fn new(db: DatabaseManager, clock: Arc<dyn MonotonicClock>) -> Self {
        if let Some(high_water) = db.high_water_mark() {
            clock.advance_to(high_water);
        }
        tracing::debug!(path = ?db.path(), high_water = ?db.high_water_mark(), "opened event store");
        Self {
            db,
            clock,
            config_cache: ConfigCache::new(),
        }
    }

    pub fn open(
        path: &Path,
        read_pool_size: usize,
        clock: Arc<dyn MonotonicClock>,
    ) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::SqliteError {
                message: format!("create {}: {e}", parent.display()),
            })?;
        }
        Ok(Self::new(DatabaseManager::open(path, read_pool_size)?, clock))
    }

    pub fn open_in_memory(clock: Arc<dyn MonotonicClock>) -> Result<Self, StorageError> {
        Ok(Self::new(DatabaseManager::open_in_memory()?, clock))
    }

    /// File-backed when `db_path` is set, in-memory otherwise.
    pub fn from_config(
        config: &StorageConfig,
        clock: Arc<dyn MonotonicClock>,
    ) -> Result<Self, StorageError> {
        match config.effective_db_path() {
            Some(path) => Self::open(&path, config.effective_read_pool_size(), clock),
            None => Self::open_in_memory(clock),
        }
    }

    pub fn clock(&self) -> &Arc<dyn MonotonicClock> {
        &self.clock
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    // ---- events ----

    /// Persist an already-stamped event.
    pub async fn append(&self, event: &Event) -> Result<i64, StorageError> {
        self.db
            .with_writer(|conn| with_immediate_transaction(conn, |tx| insert_event(tx, event)))
            .await
    }

    /// Stamp and persist an event while holding the write lock, so no drain
    /// can slip between taking the timestamp and committing the row.
    pub async fn record<F>(&self, make: F) -> Result<Event, StorageError>
    where
        F: FnOnce(i64) -> Event + Send,
    {
        self.db
            .with_writer(|conn| {
                let event = make(self.clock.now_nanos());
                with_immediate_transaction(conn, |tx| insert_event(tx, &event))?;
                Ok(event)
            })
            .await
    }

    /// Read every event, set the marker to the newest event time, and return
    /// one `SendEvent` per URL event with the state and consent string in
    /// effect at that point. Leaves the marker alone when the store is empty.
    pub async fn drain(&self) -> Result<Vec<SendEvent>, StorageError> {
        self.db
            .with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    let rows = events_q::query_all_ordered(tx)?;
                    let Some(marker) = rows.last().map(|r| r.event_time) else {
                        return Ok(Vec::new());
                    };
                    let states = dimensions::referenced_state_strings(tx)?;
                    let consents = dimensions::referenced_consent_strings(tx)?;

                    let events = rows.into_iter().filter_map(|row| {
                        let id = row.id;
                        match row_to_event(row, &states, &consents) {
                            Ok(event) => Some(event),
                            Err(e) => {
                                tracing::warn!(event_id = id, error = %e, "skipping unreadable event");
                                None
                            }
                        }
                    });
                    let batch = SendEvent::replay(events);

                    let config = read_config(tx)?.with_marker(Some(marker));
                    self.write_config(tx, &config)?;

                    tracing::debug!(events = batch.len(), marker, "drained event batch");
                    Ok(batch)
                })
            })
            .await
    }

    /// Delete everything the last drain covered except the newest state and
    /// consent string events, drop orphaned payload rows, reset the marker.
    /// A second call is a no-op.
    pub async fn clear_old_events(&self) -> Result<ClearReport, StorageError> {
        self.db
            .with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    let config = read_config(tx)?;
                    let Some(marker) = config.event_marker else {
                        return Ok(ClearReport::default());
                    };

                    let keep_state =
                        events_q::newest_of_type_at_or_before(tx, EventType::State, marker)?;
                    let keep_consent =
                        events_q::newest_of_type_at_or_before(tx, EventType::ConsentString, marker)?;
                    let events_deleted =
                        events_q::delete_through_marker(tx, marker, keep_state, keep_consent)?;
                    let (state_strings_deleted, consent_strings_deleted) =
                        dimensions::delete_orphans(tx)?;

                    self.write_config(tx, &config.with_marker(None))?;

                    let report = ClearReport {
                        marker: Some(marker),
                        events_deleted,
                        state_strings_deleted,
                        consent_strings_deleted,
                    };
                    tracing::debug!(?report, "cleared uploaded events");
                    Ok(report)
                })
            })
            .await
    }

    /// Forget the in-flight marker so the same events are drained again.
    /// Returns whether a marker was set.
    pub async fn unmark_send_events(&self) -> Result<bool, StorageError> {
        self.db
            .with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    let config = read_config(tx)?;
                    if config.event_marker.is_none() {
                        return Ok(false);
                    }
                    self.write_config(tx, &config.with_marker(None))?;
                    Ok(true)
                })
            })
            .await
    }

    pub async fn pending_event_count(&self) -> Result<i64, StorageError> {
        self.db.with_reader(events_q::count_events).await
    }

    // ---- config ----

    pub async fn get_latest_config(&self) -> Result<StoredConfig, StorageError> {
        self.db
            .with_reader(|conn| {
                let Some(latest) = config_q::latest_config_time(conn, CONFIG_VERSION)? else {
                    return Ok(StoredConfig::default());
                };
                if let Some(cached) = self.config_cache.get(latest) {
                    return Ok(cached);
                }
                match config_q::latest_config(conn, CONFIG_VERSION)? {
                    Some(row) => {
                        let config = decode_config(&row.value);
                        self.config_cache.put(row.config_time, config.clone());
                        Ok(config)
                    }
                    None => Ok(StoredConfig::default()),
                }
            })
            .await
    }

    /// Append a new latest config row.
    pub async fn add_config(&self, config: &StoredConfig) -> Result<(), StorageError> {
        self.db
            .with_writer(|conn| {
                with_immediate_transaction(conn, |tx| self.write_config(tx, config).map(|_| ()))
            })
            .await
    }

    /// Read-modify-write of the latest config in one transaction.
    pub async fn update_config<F>(&self, f: F) -> Result<StoredConfig, StorageError>
    where
        F: FnOnce(&mut StoredConfig) + Send,
    {
        self.db
            .with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    let mut config = read_config(tx)?;
                    f(&mut config);
                    self.write_config(tx, &config)?;
                    Ok(config)
                })
            })
            .await
    }

    /// Insert `config` as the newest row and drop older history.
    fn write_config(&self, conn: &Connection, config: &StoredConfig) -> Result<i64, StorageError> {
        let value = serde_json::to_string(config).map_err(|e| StorageError::CorruptRow {
            details: format!("unencodable config: {e}"),
        })?;
        let config_time = self.clock.now_nanos();
        let id = config_q::insert_config(conn, config_time, CONFIG_VERSION, &value)?;
        config_q::prune_history(conn, CONFIG_VERSION, id)?;
        // A rolled-back row never becomes the latest, so this entry just misses.
        self.config_cache.put(config_time, config.clone());
        Ok(config_time)
    }
}

impl VendorDatabaseLoader for EventStore {
    async fn load_local_database(&self) -> Result<Option<VendorDatabase>, StorageError> {
        self.db.with_reader(vendors_q::load).await
    }

    async fn store_local_database(&self, db: &VendorDatabase) -> Result<(), StorageError> {
        let stored = self
            .db
            .with_writer(|conn| {
                with_immediate_transaction(conn, |tx| {
                    vendors_q::replace_all(tx, db, self.clock.now_nanos())
                })
            })
            .await?;
        tracing::info!(version = db.version(), vendors = stored, "stored vendor database");
        Ok(())
    }
}

fn read_config(conn: &Connection) -> Result<StoredConfig, StorageError> {
    Ok(config_q::latest_config(conn, CONFIG_VERSION)?
        .map(|row| decode_config(&row.value))
        .unwrap_or_default())
}

/// An unreadable row is treated as an empty config rather than wedging the store.
fn decode_config(value: &str) -> StoredConfig {
    serde_json::from_str(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "discarding unreadable config row");
        StoredConfig::default()
    })
}

fn insert_event(conn: &Connection, event: &Event) -> Result<i64, StorageError> {
    let flags = event.flags().encode();
    let row = match event {
        Event::Url {
            time_nanos,
            vendor_id,
            domain,
            ..
        } => NewEventRow {
            event_time: *time_nanos,
            flags,
            vendor_id: Some(vendor_id),
            domain: Some(domain),
            ..Default::default()
        },
        Event::State { time_nanos, state } => NewEventRow {
            event_time: *time_nanos,
            flags,
            state_string_id: Some(dimensions::upsert_state_string(conn, state)?),
            ..Default::default()
        },
        Event::ConsentString {
            time_nanos,
            consent_string,
        } => NewEventRow {
            event_time: *time_nanos,
            flags,
            consent_string_id: Some(dimensions::upsert_consent_string(conn, consent_string)?),
            ..Default::default()
        },
    };
    events_q::insert_event(conn, &row)
}

fn row_to_event(
    row: EventRow,
    states: &HashMap<i64, Vec<String>>,
    consents: &HashMap<i64, String>,
) -> Result<Event, StorageError> {
    let flags = EventFlags::decode(row.flags)?;
    let missing = |what: &str| StorageError::CorruptRow {
        details: format!("event {} has no {what}", row.id),
    };
    match flags.event_type {
        EventType::Url => {
            let vendor_id = row.vendor_id.ok_or_else(|| missing("vendor id"))?;
            let domain = row.domain.ok_or_else(|| missing("domain"))?;
            Ok(Event::Url {
                time_nanos: row.event_time,
                vendor_id,
                domain,
                valid: flags.valid,
                rejected: flags.rejected,
            })
        }
        EventType::State => {
            let state = row
                .state_string_id
                .and_then(|id| states.get(&id))
                .ok_or_else(|| missing("state string"))?;
            Ok(Event::State {
                time_nanos: row.event_time,
                state: state.clone(),
            })
        }
        EventType::ConsentString => {
            let consent_string = row
                .consent_string_id
                .and_then(|id| consents.get(&id))
                .ok_or_else(|| missing("consent string"))?;
            Ok(Event::ConsentString {
                time_nanos: row.event_time,
                consent_string: consent_string.clone(),
            })
        }
    }
}
