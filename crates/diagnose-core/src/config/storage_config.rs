//! Local storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file. Unset keeps events in memory only.
    pub db_path: Option<String>,
    pub read_pool_size: Option<usize>,
}

impl StorageConfig {
    pub fn effective_db_path(&self) -> Option<PathBuf> {
        self.db_path.as_ref().map(PathBuf::from)
    }

    pub fn effective_read_pool_size(&self) -> usize {
        self.read_pool_size.unwrap_or(defaults::DEFAULT_READ_POOL_SIZE)
    }
}
