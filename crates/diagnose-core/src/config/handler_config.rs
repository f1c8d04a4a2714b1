//! Event handler configuration.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct HandlerConfig {
    /// Hosts never recorded, in addition to the backend's own host.
    pub ignore_domains: Vec<String>,
    pub flush_interval_secs: Option<u64>,
    /// Skip recording IAB vendors the consent manager reports as not consented.
    pub consent_gating: Option<bool>,
}

impl HandlerConfig {
    pub fn effective_flush_interval_secs(&self) -> u64 {
        self.flush_interval_secs
            .unwrap_or(defaults::DEFAULT_FLUSH_INTERVAL_SECS)
    }

    pub fn effective_consent_gating(&self) -> bool {
        self.consent_gating.unwrap_or(defaults::DEFAULT_CONSENT_GATING)
    }
}
