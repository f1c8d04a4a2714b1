//! In-memory backend and loader shared by the agent integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use diagnose_agent::EventHandler;
use diagnose_core::errors::{CloudError, StorageError};
use diagnose_core::models::{ConsentAction, RemoteConfig, SendEvent, VendorData, VendorDatabase};
use diagnose_core::traits::{ConsentManager, DiagnoseClient, NullConsentManager, VendorDatabaseLoader};
use diagnose_core::{MonotonicClock, SystemMonotonicClock};
use diagnose_storage::EventStore;

#[derive(Default)]
pub struct FakeClient {
    pub config: Mutex<Option<RemoteConfig>>,
    pub vendors: Mutex<Option<VendorDatabase>>,
    pub fail_uploads: AtomicBool,
    pub uploads: Mutex<Vec<Vec<SendEvent>>>,
    pub consent_actions: Mutex<Vec<(ConsentAction, i64)>>,
    pub vendor_fetches: AtomicUsize,
    pub reported_rates: Mutex<Vec<u8>>,
}

fn unavailable() -> CloudError {
    CloudError::NetworkError {
        reason: "offline".to_string(),
    }
}

impl FakeClient {
    pub fn with_config(self, config: RemoteConfig) -> Self {
        *self.config.lock().unwrap() = Some(config);
        self
    }

    pub fn with_vendors(self, db: VendorDatabase) -> Self {
        *self.vendors.lock().unwrap() = Some(db);
        self
    }

    pub fn uploaded(&self) -> Vec<Vec<SendEvent>> {
        self.uploads.lock().unwrap().clone()
    }
}

impl DiagnoseClient for FakeClient {
    async fn get_config(&self) -> Result<RemoteConfig, CloudError> {
        self.config.lock().unwrap().clone().ok_or_else(unavailable)
    }

    async fn get_vendor_database(&self) -> Result<VendorDatabase, CloudError> {
        self.vendor_fetches.fetch_add(1, Ordering::SeqCst);
        self.vendors.lock().unwrap().clone().ok_or_else(unavailable)
    }

    async fn send_events(&self, events: &[SendEvent]) -> Result<(), CloudError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(CloudError::BadStatus {
                status: 503,
                body: String::new(),
            });
        }
        self.uploads.lock().unwrap().push(events.to_vec());
        Ok(())
    }

    async fn send_consent_action(&self, action: ConsentAction, ts_ms: i64) -> Result<(), CloudError> {
        self.consent_actions.lock().unwrap().push((action, ts_ms));
        Ok(())
    }

    fn set_sample_rate(&self, rate: u8) {
        self.reported_rates.lock().unwrap().push(rate);
    }
}

#[derive(Default)]
pub struct FakeLoader {
    pub stored: Mutex<Option<VendorDatabase>>,
    pub fail_store: bool,
}

impl VendorDatabaseLoader for FakeLoader {
    async fn load_local_database(&self) -> Result<Option<VendorDatabase>, StorageError> {
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn store_local_database(&self, db: &VendorDatabase) -> Result<(), StorageError> {
        if self.fail_store {
            return Err(StorageError::SqliteError {
                message: "disk full".to_string(),
            });
        }
        *self.stored.lock().unwrap() = Some(db.clone());
        Ok(())
    }
}

/// Consents to an explicit set of IAB ids.
pub struct AllowList(pub Vec<i32>);

impl ConsentManager for AllowList {
    fn is_iab_consented(&self, iab_id: i32, _consent_string: &str) -> bool {
        self.0.contains(&iab_id)
    }
}

pub fn vendor(id: &str, domain: &str, iab_id: Option<i32>) -> VendorData {
    VendorData {
        vendor_id: id.to_string(),
        domain: domain.to_string(),
        iab_id,
    }
}

/// ads.example.com (IAB 7), cdn.tracker.io (no IAB id), api.metrics.net (IAB 12).
pub fn vendor_db(version: &str) -> VendorDatabase {
    VendorDatabase::new(
        version,
        vec![
            vendor("v-ads", "ads.example.com", Some(7)),
            vendor("v-cdn", "cdn.tracker.io", None),
            vendor("v-metrics", "api.metrics.net", Some(12)),
        ],
    )
    .unwrap()
}

pub fn remote_config(rate: f64, black_list: &[&str], database_version: &str) -> RemoteConfig {
    RemoteConfig {
        version: "1".to_string(),
        sample_percentage: rate,
        domain_black_list: black_list.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        database_version: database_version.to_string(),
        expiry: None,
    }
}

pub fn clock() -> Arc<dyn MonotonicClock> {
    Arc::new(SystemMonotonicClock::new())
}

pub fn memory_store() -> Arc<EventStore> {
    Arc::new(EventStore::open_in_memory(clock()).unwrap())
}

pub type TestHandler<M = NullConsentManager> = EventHandler<FakeClient, M>;

/// Handler over an in-memory store with the test vendor table loaded.
pub fn handler(client: FakeClient) -> TestHandler {
    EventHandler::new(memory_store(), client, NullConsentManager, vendor_db("v1"))
}

/// Same as [`handler`] with sampling switched on and `black_list` applied.
pub async fn sampled_handler(black_list: &[&str]) -> TestHandler {
    let h = handler(FakeClient::default());
    h.apply_remote_config(&remote_config(100.0, black_list, "v1"))
        .await
        .unwrap();
    h
}
