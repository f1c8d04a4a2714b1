//! EventStore flush protocol against the real migrated schema.

use std::sync::Arc;

use diagnose_core::models::{Event, StoredConfig};
use diagnose_core::{MonotonicClock, SystemMonotonicClock};
use diagnose_storage::queries::{config as config_q, dimensions};
use diagnose_storage::{ClearReport, EventStore};
use tempfile::TempDir;

fn clock() -> Arc<dyn MonotonicClock> {
    Arc::new(SystemMonotonicClock::new())
}

fn store() -> EventStore {
    EventStore::open_in_memory(clock()).unwrap()
}

fn url(t: i64, vendor: &str, domain: &str) -> Event {
    Event::Url {
        time_nanos: t,
        vendor_id: vendor.to_string(),
        domain: domain.to_string(),
        valid: true,
        rejected: false,
    }
}

fn state(t: i64, items: &[&str]) -> Event {
    Event::State {
        time_nanos: t,
        state: items.iter().map(|s| s.to_string()).collect(),
    }
}

fn consent(t: i64, s: &str) -> Event {
    Event::ConsentString {
        time_nanos: t,
        consent_string: s.to_string(),
    }
}

async fn append_all(store: &EventStore, events: &[Event]) {
    for e in events {
        store.append(e).await.unwrap();
    }
}

async fn marker(store: &EventStore) -> Option<i64> {
    store.get_latest_config().await.unwrap().event_marker
}

// ═══════════════════════════════════════════════════════════════════════════
// DRAIN
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn drain_on_empty_store_leaves_marker_unset() {
    let store = store();
    assert!(store.drain().await.unwrap().is_empty());
    assert_eq!(marker(&store).await, None);
}

#[tokio::test]
async fn drain_replays_state_in_time_order() {
    let store = store();
    // Inserted out of order; replay must follow event time.
    append_all(
        &store,
        &[
            url(4_000_000, "v2", "b.com"),
            state(1_000_000, &["a"]),
            state(3_000_000, &["b"]),
            url(2_000_000, "v1", "a.com"),
        ],
    )
    .await;

    let batch = store.drain().await.unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].vendor_id, "v1");
    assert_eq!(batch[0].state, vec!["a".to_string()]);
    assert_eq!(batch[0].time_ms, 2);
    assert_eq!(batch[1].vendor_id, "v2");
    assert_eq!(batch[1].domain, "b.com");
    assert_eq!(batch[1].state, vec!["b".to_string()]);
    assert_eq!(marker(&store).await, Some(4_000_000));
}

#[tokio::test]
async fn drain_carries_consent_string_and_flags() {
    let store = store();
    append_all(
        &store,
        &[
            consent(1, "CPabc"),
            Event::Url {
                time_nanos: 2,
                vendor_id: "v".into(),
                domain: "ads.test".into(),
                valid: false,
                rejected: true,
            },
        ],
    )
    .await;

    let batch = store.drain().await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].consent_string.as_deref(), Some("CPabc"));
    assert!(!batch[0].valid);
    assert!(batch[0].rejected);
}

#[tokio::test]
async fn state_members_with_commas_survive() {
    let store = store();
    append_all(&store, &[state(1, &["a,b", " c "]), url(2, "v", "d.com")]).await;
    let batch = store.drain().await.unwrap();
    assert_eq!(batch[0].state, vec!["a,b".to_string(), " c ".to_string()]);
}

// ═══════════════════════════════════════════════════════════════════════════
// AT-LEAST-ONCE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn unmark_makes_same_events_drain_again() {
    let store = store();
    append_all(&store, &[state(1, &["s"]), url(2, "v1", "a.com"), url(3, "v2", "b.com")]).await;

    let first = store.drain().await.unwrap();
    assert!(store.unmark_send_events().await.unwrap());
    assert_eq!(marker(&store).await, None);

    let second = store.drain().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn unmark_without_marker_is_noop() {
    let store = store();
    assert!(!store.unmark_send_events().await.unwrap());
}

#[tokio::test]
async fn cleared_events_never_come_back() {
    let store = store();
    append_all(&store, &[url(1, "v1", "a.com"), url(2, "v2", "b.com")]).await;

    assert_eq!(store.drain().await.unwrap().len(), 2);
    let report = store.clear_old_events().await.unwrap();
    assert_eq!(report.marker, Some(2));
    assert_eq!(report.events_deleted, 2);
    assert_eq!(marker(&store).await, None);

    assert!(store.drain().await.unwrap().is_empty());
    assert_eq!(store.pending_event_count().await.unwrap(), 0);
}

#[tokio::test]
async fn events_after_marker_survive_clear() {
    let store = store();
    append_all(&store, &[url(1, "v1", "a.com")]).await;
    store.drain().await.unwrap();

    // Arrives while the batch is in flight.
    append_all(&store, &[url(5, "v2", "b.com")]).await;
    store.clear_old_events().await.unwrap();

    let batch = store.drain().await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].vendor_id, "v2");
}

// ═══════════════════════════════════════════════════════════════════════════
// CLEAR
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn clear_keeps_newest_context_events() {
    let store = store();
    append_all(
        &store,
        &[
            state(1, &["old"]),
            consent(2, "C-old"),
            state(3, &["new"]),
            consent(4, "C-new"),
            url(5, "v1", "a.com"),
        ],
    )
    .await;
    store.drain().await.unwrap();
    let report = store.clear_old_events().await.unwrap();
    assert_eq!(report.events_deleted, 3);
    assert_eq!(report.state_strings_deleted, 1);
    assert_eq!(report.consent_strings_deleted, 1);
    assert_eq!(store.pending_event_count().await.unwrap(), 2);

    // The next URL still sees the retained context.
    append_all(&store, &[url(6, "v2", "b.com")]).await;
    let batch = store.drain().await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].state, vec!["new".to_string()]);
    assert_eq!(batch[0].consent_string.as_deref(), Some("C-new"));
}

#[tokio::test]
async fn clear_is_idempotent() {
    let store = store();
    append_all(&store, &[state(1, &["s"]), url(2, "v", "a.com")]).await;
    store.drain().await.unwrap();

    let first = store.clear_old_events().await.unwrap();
    assert_eq!(first.events_deleted, 1);
    let remaining = store.pending_event_count().await.unwrap();

    let second = store.clear_old_events().await.unwrap();
    assert_eq!(second, ClearReport::default());
    assert_eq!(store.pending_event_count().await.unwrap(), remaining);
}

#[tokio::test]
async fn clear_without_drain_deletes_nothing() {
    let store = store();
    append_all(&store, &[url(1, "v", "a.com")]).await;
    assert_eq!(store.clear_old_events().await.unwrap(), ClearReport::default());
    assert_eq!(store.pending_event_count().await.unwrap(), 1);
}

#[tokio::test]
async fn identical_payloads_share_one_row() {
    let store = store();
    append_all(
        &store,
        &[
            state(1, &["x", "y"]),
            state(2, &["x", "y"]),
            consent(3, "C"),
            consent(4, "C"),
        ],
    )
    .await;

    let (states, consents) = store
        .database()
        .with_reader(|conn| {
            Ok((
                dimensions::count_rows(conn, "state_strings")?,
                dimensions::count_rows(conn, "consent_strings")?,
            ))
        })
        .await
        .unwrap();
    assert_eq!(states, 1);
    assert_eq!(consents, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// RECORD
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn record_stamps_strictly_increasing_times() {
    let store = store();
    let mut prev = i64::MIN;
    for i in 0..20 {
        let event = store
            .record(|t| url(t, "v", &format!("d{i}.com")))
            .await
            .unwrap();
        assert!(event.time_nanos() > prev);
        prev = event.time_nanos();
    }
    assert_eq!(store.drain().await.unwrap().len(), 20);
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG HISTORY
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn missing_config_reads_as_default() {
    let store = store();
    assert_eq!(store.get_latest_config().await.unwrap(), StoredConfig::default());
}

#[tokio::test]
async fn latest_config_wins_and_history_is_pruned() {
    let store = store();
    let mut cfg = StoredConfig::default();
    cfg.domain_black_list.insert("ads.test".into());
    store.add_config(&cfg).await.unwrap();

    cfg.consent_string = Some("C1".into());
    store.add_config(&cfg).await.unwrap();

    let latest = store.get_latest_config().await.unwrap();
    assert_eq!(latest, cfg);

    let rows = store
        .database()
        .with_reader(config_q::count_history)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn update_config_is_read_modify_write() {
    let store = store();
    store
        .update_config(|c| c.client_state = vec!["home".into()])
        .await
        .unwrap();
    let updated = store
        .update_config(|c| c.consent_string = Some("C".into()))
        .await
        .unwrap();
    assert_eq!(updated.client_state, vec!["home".to_string()]);
    assert_eq!(store.get_latest_config().await.unwrap(), updated);
}

// ═══════════════════════════════════════════════════════════════════════════
// DURABILITY
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn events_and_marker_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("diagnose.db");

    {
        let store = EventStore::open(&path, 2, clock()).unwrap();
        append_all(&store, &[state(1, &["s"]), url(2, "v", "a.com")]).await;
        store.drain().await.unwrap();
    }

    let store = EventStore::open(&path, 2, clock()).unwrap();
    assert_eq!(marker(&store).await, Some(2));
    // The upload never completed; the batch is still there.
    store.unmark_send_events().await.unwrap();
    let batch = store.drain().await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].state, vec!["s".to_string()]);
}

/// Deterministic clock that can be started at any point.
struct StepClock {
    next: std::sync::Mutex<i64>,
}

impl StepClock {
    fn starting_at(nanos: i64) -> Arc<dyn MonotonicClock> {
        Arc::new(Self {
            next: std::sync::Mutex::new(nanos),
        })
    }
}

impl MonotonicClock for StepClock {
    fn now_nanos(&self) -> i64 {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next += 1_000;
        now
    }

    fn advance_to(&self, floor_nanos: i64) {
        let mut next = self.next.lock().unwrap();
        if floor_nanos >= *next {
            *next = floor_nanos + 1;
        }
    }
}

#[tokio::test]
async fn clock_behind_previous_process_does_not_lose_events() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("diagnose.db");

    {
        let store = EventStore::open(&path, 2, StepClock::starting_at(1_000_000)).unwrap();
        store.record(|t| url(t, "v-old", "old.com")).await.unwrap();
    }

    // Wall clock stepped back between runs.
    let store = EventStore::open(&path, 2, StepClock::starting_at(500_000)).unwrap();
    let first = store.drain().await.unwrap();
    assert_eq!(first.len(), 1);

    // Recorded while the first batch is being uploaded.
    let late = store.record(|t| url(t, "v-new", "new.com")).await.unwrap();
    assert!(late.time_nanos() > marker(&store).await.unwrap());
    store.clear_old_events().await.unwrap();

    let second = store.drain().await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].domain, "new.com");
}

// ═══════════════════════════════════════════════════════════════════════════
// CONCURRENCY
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_are_drained_exactly_once() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(EventStore::open(&dir.path().join("diagnose.db"), 2, clock()).unwrap());
    let writers_done = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let flusher = {
        let store = Arc::clone(&store);
        let writers_done = Arc::clone(&writers_done);
        tokio::spawn(async move {
            let mut seen = Vec::new();
            loop {
                let finished = writers_done.load(std::sync::atomic::Ordering::SeqCst);
                let batch = store.drain().await.unwrap();
                let empty = batch.is_empty();
                seen.extend(batch.into_iter().map(|e| e.domain));
                store.clear_old_events().await.unwrap();
                if finished && empty {
                    return seen;
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..100 {
                    let domain = format!("w{w}-{i}.test");
                    store.record(move |t| url(t, "v", &domain)).await.unwrap();
                }
            })
        })
        .collect();
    for w in writers {
        w.await.unwrap();
    }
    writers_done.store(true, std::sync::atomic::Ordering::SeqCst);

    let seen = flusher.await.unwrap();
    let unique: std::collections::HashSet<_> = seen.iter().collect();
    assert_eq!(seen.len(), 400);
    assert_eq!(unique.len(), 400);
    assert!(store.drain().await.unwrap().is_empty());
    assert_eq!(store.pending_event_count().await.unwrap(), 0);
}
