//! Read-through cache for the latest config row.
//!
//! A cached copy is served only while its timestamp still equals the newest
//! row's timestamp, so writers never have to notify the cache.

use std::sync::RwLock;

use diagnose_core::models::StoredConfig;

#[derive(Debug, Clone)]
struct CachedConfig {
    config_time: i64,
    config: StoredConfig,
}

#[derive(Debug, Default)]
pub struct ConfigCache {
    slot: RwLock<Option<CachedConfig>>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached config if it was written at `latest_time`.
    pub fn get(&self, latest_time: i64) -> Option<StoredConfig> {
        let slot = match self.slot.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.as_ref()
            .filter(|c| c.config_time == latest_time)
            .map(|c| c.config.clone())
    }

    pub fn put(&self, config_time: i64, config: StoredConfig) {
        let mut slot = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(CachedConfig {
            config_time,
            config,
        });
    }

    pub fn invalidate(&self) {
        let mut slot = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
    }
}
