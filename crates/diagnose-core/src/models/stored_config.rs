//! The locally persisted configuration snapshot.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::sampling::Sampling;

/// Latest-wins configuration row. Every change is written as a new row in the
/// config history; readers only ever see the newest one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredConfig {
    pub sample_percentage: Option<f64>,
    pub sample_hit: Option<bool>,
    pub domain_black_list: BTreeSet<String>,
    /// High-water mark of the last drain. `Some` while a batch is in flight.
    pub event_marker: Option<i64>,
    pub consent_string: Option<String>,
    pub client_state: Vec<String>,
    pub database_version: Option<String>,
}

impl StoredConfig {
    pub fn sampling(&self) -> Sampling {
        let rate = self
            .sample_percentage
            .filter(|p| !p.is_nan())
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);
        Sampling::new(rate, self.sample_hit)
    }

    pub fn set_sampling(&mut self, sampling: Sampling) {
        self.sample_percentage = Some(f64::from(sampling.rate));
        self.sample_hit = sampling.hit;
    }

    pub fn is_blacklisted(&self, domain: &str) -> bool {
        self.domain_black_list.contains(domain)
    }

    pub fn with_marker(mut self, marker: Option<i64>) -> Self {
        self.event_marker = marker;
        self
    }
}
