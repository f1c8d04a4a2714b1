//! Versioned, immutable domain → vendor table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::UNSET_VERSION;
use crate::errors::CloudError;

/// Canonical form of a host name for lookups: trimmed, lowercase, without a
/// trailing root dot.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// `kind` value the backend uses for rows it could not classify.
pub const UNKNOWN_VENDOR_KIND: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorData {
    pub vendor_id: String,
    pub domain: String,
    pub iab_id: Option<i32>,
}

/// One row of the remote vendor table as served on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRow {
    pub id: String,
    pub domain: String,
    pub kind: i32,
    #[serde(default)]
    pub iab_id: Option<i32>,
}

impl VendorRow {
    fn is_importable(&self) -> bool {
        !self.id.is_empty() && !self.domain.is_empty() && self.kind != UNKNOWN_VENDOR_KIND
    }
}

/// Snapshot keyed by domain. Never mutated after construction; refreshes
/// build a new snapshot and swap the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorDatabase {
    version: String,
    entries: HashMap<String, VendorData>,
}

impl VendorDatabase {
    /// Build a snapshot. The version is trimmed and must not be empty. Domains
    /// are normalized; when two entries share a domain the later one wins.
    pub fn new<I>(version: &str, entries: I) -> Result<Self, CloudError>
    where
        I: IntoIterator<Item = VendorData>,
    {
        let version = version.trim();
        if version.is_empty() {
            return Err(CloudError::InvalidVendorDatabase {
                reason: "empty version".to_string(),
            });
        }
        let entries = entries
            .into_iter()
            .map(|mut v| {
                v.domain = normalize_domain(&v.domain);
                (v.domain.clone(), v)
            })
            .collect();
        Ok(Self {
            version: version.to_string(),
            entries,
        })
    }

    /// Empty table at the sentinel version. Every lookup misses.
    pub fn unset() -> Self {
        Self {
            version: UNSET_VERSION.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Convert wire rows, skipping rows with an empty id, an empty domain or an
    /// unknown kind.
    pub fn import(version: &str, rows: Vec<VendorRow>) -> Result<Self, CloudError> {
        let total = rows.len();
        let entries: Vec<VendorData> = rows
            .into_iter()
            .filter(VendorRow::is_importable)
            .map(|row| VendorData {
                vendor_id: row.id,
                domain: row.domain,
                iab_id: row.iab_id,
            })
            .collect();
        let skipped = total - entries.len();
        if skipped > 0 {
            tracing::debug!(skipped, total, "dropped unusable vendor rows");
        }
        Self::new(version, entries)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_unset(&self) -> bool {
        self.version == UNSET_VERSION
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_vendor_data(&self, domain: &str) -> Option<&VendorData> {
        self.entries.get(domain)
    }

    pub fn get_vendor_id(&self, domain: &str) -> Option<&str> {
        self.entries.get(domain).map(|v| v.vendor_id.as_str())
    }

    /// Visit every entry as `(domain, vendor_id, iab_id)`.
    pub fn export<F>(&self, mut consumer: F)
    where
        F: FnMut(&str, &str, Option<i32>),
    {
        for (domain, data) in &self.entries {
            consumer(domain, &data.vendor_id, data.iab_id);
        }
    }
}
