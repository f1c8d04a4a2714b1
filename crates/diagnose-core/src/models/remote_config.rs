//! Configuration served by the remote config endpoint.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::UNSET_VERSION;

fn unset_version() -> String {
    UNSET_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub version: String,
    /// Percentage of installations that record, 0–100.
    #[serde(default, alias = "rate")]
    pub sample_percentage: f64,
    #[serde(default)]
    pub domain_black_list: BTreeSet<String>,
    /// Version of the vendor table the backend currently serves.
    #[serde(default = "unset_version")]
    pub database_version: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl RemoteConfig {
    /// The fallback used when the remote config cannot be fetched. Recording
    /// stays disabled and no vendor table download is attempted.
    pub fn unset() -> Self {
        Self {
            version: unset_version(),
            sample_percentage: 0.0,
            domain_black_list: BTreeSet::new(),
            database_version: unset_version(),
            expiry: None,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.version == UNSET_VERSION
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|e| e <= now)
    }

    /// Sample percentage as a whole-number rate clamped to 0..=100.
    pub fn sample_rate(&self) -> u8 {
        if self.sample_percentage.is_nan() {
            return 0;
        }
        self.sample_percentage.round().clamp(0.0, 100.0) as u8
    }
}
