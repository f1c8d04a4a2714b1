//! The event handler: sampling gate, vendor resolution, blacklist, durable
//! recording and batch upload.
//!
//! Nothing here returns an error to the host. Failures are logged and the
//! operation degrades to a no-op (or `false` for `url_received`).

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use diagnose_core::constants::NANOS_PER_MILLI;
use diagnose_core::errors::{DiagnoseError, DiagnoseErrorCode};
use diagnose_core::models::{
    normalize_domain, ConsentAction, Event, RemoteConfig, StoredConfig, VendorDatabase,
};
use diagnose_core::traits::{ConsentManager, DiagnoseClient};
use diagnose_storage::{ClearReport, EventStore};

use crate::vendor_sync::load_database;

/// Result of one `dump_state` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Sampling is off; nothing was read.
    Inactive,
    /// Another flush is running.
    InProgress,
    /// No events were pending.
    Empty,
    /// Only state/consent events were pending; superseded ones were compacted.
    Compacted(ClearReport),
    Uploaded { events: usize, report: ClearReport },
    /// Upload or storage failed. Pending events are kept for the next flush.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub config_applied: bool,
    pub vendor_version: String,
}

pub struct EventHandler<C, M> {
    store: Arc<EventStore>,
    client: C,
    consent: M,
    vendors: RwLock<Arc<VendorDatabase>>,
    ignore_domains: HashSet<String>,
    consent_gating: bool,
    config_expiry: Mutex<Option<DateTime<Utc>>>,
    flush_guard: tokio::sync::Mutex<()>,
}

impl<C, M> EventHandler<C, M>
where
    C: DiagnoseClient,
    M: ConsentManager,
{
    pub fn new(store: Arc<EventStore>, client: C, consent: M, vendors: VendorDatabase) -> Self {
        Self {
            store,
            client,
            consent,
            vendors: RwLock::new(Arc::new(vendors)),
            ignore_domains: HashSet::new(),
            consent_gating: false,
            config_expiry: Mutex::new(None),
            flush_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Hosts whose requests are never recorded. Matched case-insensitively.
    pub fn with_ignore_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignore_domains
            .extend(domains.into_iter().map(|d| normalize_domain(d.as_ref())));
        self
    }

    pub fn with_consent_gating(mut self, enabled: bool) -> Self {
        self.consent_gating = enabled;
        self
    }

    pub fn consent_gating(&self) -> bool {
        self.consent_gating
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn vendor_database(&self) -> Arc<VendorDatabase> {
        match self.vendors.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in a new snapshot. Lookups already in progress keep the old one.
    pub fn replace_vendor_database(&self, db: VendorDatabase) {
        let db = Arc::new(db);
        match self.vendors.write() {
            Ok(mut guard) => *guard = db,
            Err(poisoned) => *poisoned.into_inner() = db,
        }
    }

    // ---- host operations ----

    /// Record the host's current screen/state list.
    pub async fn set_state(&self, state: Vec<String>) {
        if !self.sampling_active().await {
            return;
        }
        let result = async {
            let recorded = state.clone();
            self.store
                .record(move |time_nanos| Event::State {
                    time_nanos,
                    state: recorded,
                })
                .await?;
            self.store
                .update_config(move |c| c.client_state = state)
                .await?;
            Ok::<_, DiagnoseError>(())
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, code = e.error_code(), "failed to record state");
        }
    }

    /// Record a new consent string.
    pub async fn set_consent_string(&self, consent_string: String) {
        if !self.sampling_active().await {
            return;
        }
        let result = async {
            let recorded = consent_string.clone();
            self.store
                .record(move |time_nanos| Event::ConsentString {
                    time_nanos,
                    consent_string: recorded,
                })
                .await?;
            self.store
                .update_config(move |c| c.consent_string = Some(consent_string))
                .await?;
            Ok::<_, DiagnoseError>(())
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, code = e.error_code(), "failed to record consent string");
        }
    }

    /// Inspect an outgoing request. Returns `true` when the request targets a
    /// blacklisted vendor domain and the host should block it. Requests to
    /// hosts without a known vendor are neither recorded nor blocked. Consent
    /// gating only decides whether the request is recorded.
    pub async fn url_received(&self, url: &str, method: &str, _headers: &[(String, String)]) -> bool {
        let config = match self.store.get_latest_config().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "config unreadable; ignoring request");
                return false;
            }
        };
        if !config.sampling().is_active() {
            return false;
        }

        let domain = match parse_host(url) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "ignoring request");
                return false;
            }
        };
        if self.ignore_domains.contains(&domain) {
            return false;
        }

        let vendors = self.vendor_database();
        let Some(vendor) = vendors.get_vendor_data(&domain) else {
            tracing::trace!(%domain, "no vendor for domain");
            return false;
        };

        let rejected = config.is_blacklisted(&domain);
        if self.consent_gating && !self.is_consented(vendor.iab_id, &config) {
            tracing::debug!(%domain, vendor_id = %vendor.vendor_id, rejected, "vendor not consented; not recorded");
            return rejected;
        }

        let vendor_id = vendor.vendor_id.clone();
        let recorded_domain = domain.clone();
        let result = self
            .store
            .record(move |time_nanos| Event::Url {
                time_nanos,
                vendor_id,
                domain: recorded_domain,
                valid: !rejected,
                rejected,
            })
            .await;
        match result {
            Ok(_) => tracing::trace!(method, %domain, rejected, "recorded request"),
            // The verdict still stands; only the record is lost.
            Err(e) => tracing::warn!(error = %e, %domain, "failed to record request"),
        }
        rejected
    }

    /// Upload everything pending. On success the uploaded events are cleared;
    /// on failure they stay queued for the next call.
    pub async fn dump_state(&self) -> FlushOutcome {
        let Ok(_guard) = self.flush_guard.try_lock() else {
            return FlushOutcome::InProgress;
        };
        match self.try_dump_state().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "flush failed");
                FlushOutcome::Failed
            }
        }
    }

    async fn try_dump_state(&self) -> Result<FlushOutcome, DiagnoseError> {
        if !self.sampling_active().await {
            return Ok(FlushOutcome::Inactive);
        }

        let batch = self.store.drain().await?;
        if batch.is_empty() {
            let report = self.store.clear_old_events().await?;
            return Ok(match report.marker {
                Some(_) => FlushOutcome::Compacted(report),
                None => FlushOutcome::Empty,
            });
        }

        match self.client.send_events(&batch).await {
            Ok(()) => {
                let report = self.store.clear_old_events().await?;
                tracing::info!(events = batch.len(), deleted = report.events_deleted, "uploaded events");
                Ok(FlushOutcome::Uploaded {
                    events: batch.len(),
                    report,
                })
            }
            Err(e) => {
                let err = DiagnoseError::UploadFailed(e);
                tracing::warn!(error = %err, events = batch.len(), "upload failed; events kept");
                self.store.unmark_send_events().await?;
                Ok(FlushOutcome::Failed)
            }
        }
    }

    /// Report an accept-all / reject-all action. Sent directly, not queued.
    pub async fn consent_event(&self, action: ConsentAction) -> bool {
        if !self.sampling_active().await {
            return false;
        }
        let ts_ms = self.store.clock().now_nanos() / NANOS_PER_MILLI;
        match self.client.send_consent_action(action, ts_ms).await {
            Ok(()) => true,
            Err(e) => {
                let err = DiagnoseError::UploadFailed(e);
                tracing::warn!(error = %err, ?action, "consent action not sent");
                false
            }
        }
    }

    /// Last state list passed to `set_state`, across restarts.
    pub async fn current_state(&self) -> Vec<String> {
        self.store
            .get_latest_config()
            .await
            .map(|c| c.client_state)
            .unwrap_or_default()
    }

    // ---- configuration ----

    /// Fold a remote config into the stored one. The sampling decision is
    /// re-drawn only when the rate changed.
    pub async fn apply_remote_config(
        &self,
        remote: &RemoteConfig,
    ) -> Result<StoredConfig, DiagnoseError> {
        let rate = remote.sample_rate();
        let black_list: BTreeSet<String> = remote
            .domain_black_list
            .iter()
            .map(|d| normalize_domain(d))
            .collect();
        let database_version = remote.database_version.clone();
        let updated = self
            .store
            .update_config(move |config| {
                let mut sampling = config.sampling();
                sampling.update_and_sample(rate);
                config.set_sampling(sampling);
                config.domain_black_list = black_list;
                config.database_version = Some(database_version);
            })
            .await?;

        self.client.set_sample_rate(rate);
        self.set_config_expiry(remote.expiry);
        tracing::info!(
            version = %remote.version,
            rate,
            hit = ?updated.sample_hit,
            blacklisted = updated.domain_black_list.len(),
            "applied remote config"
        );
        Ok(updated)
    }

    /// Fetch the remote config and bring the vendor table up to date. When
    /// the config is unavailable the stored config is kept and only the
    /// local vendor snapshot is loaded.
    pub async fn refresh(&self) -> RefreshReport {
        let remote = match self.client.get_config().await {
            Ok(remote) => Some(remote),
            Err(e) => {
                let err = DiagnoseError::ConfigUnavailable(e);
                tracing::warn!(error = %err, code = err.error_code(), "using stored config");
                None
            }
        };

        let mut config_applied = false;
        if let Some(ref remote) = remote {
            match self.apply_remote_config(remote).await {
                Ok(_) => config_applied = true,
                Err(e) => tracing::warn!(error = %e, "failed to store remote config"),
            }
        }

        let fallback = RemoteConfig::unset();
        let remote = remote.as_ref().unwrap_or(&fallback);
        let db = load_database(&remote.database_version, &self.client, self.store.as_ref()).await;
        let vendor_version = db.version().to_string();
        self.replace_vendor_database(db);

        RefreshReport {
            config_applied,
            vendor_version,
        }
    }

    /// True when the last applied remote config carried an expiry at or before `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        let expiry = match self.config_expiry.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        expiry.is_some_and(|e| e <= now)
    }

    fn set_config_expiry(&self, expiry: Option<DateTime<Utc>>) {
        match self.config_expiry.lock() {
            Ok(mut guard) => *guard = expiry,
            Err(poisoned) => *poisoned.into_inner() = expiry,
        }
    }

    async fn sampling_active(&self) -> bool {
        match self.store.get_latest_config().await {
            Ok(config) => config.sampling().is_active(),
            Err(e) => {
                tracing::warn!(error = %e, "config unreadable; treating sampling as off");
                false
            }
        }
    }

    /// Vendors outside the IAB framework and configs without a consent
    /// string are not gated.
    fn is_consented(&self, iab_id: Option<i32>, config: &StoredConfig) -> bool {
        match (iab_id, config.consent_string.as_deref()) {
            (Some(iab_id), Some(consent_string)) => {
                self.consent.is_iab_consented(iab_id, consent_string)
            }
            _ => true,
        }
    }
}

/// Lowercased host of `url`.
fn parse_host(url: &str) -> Result<String, DiagnoseError> {
    let malformed = |reason: String| DiagnoseError::MalformedInput {
        input: url.to_string(),
        reason,
    };
    let parsed = url::Url::parse(url).map_err(|e| malformed(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| malformed("no host".to_string()))?;
    Ok(normalize_domain(host))
}
