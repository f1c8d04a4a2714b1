//! Top-level agent configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ApiConfig, HandlerConfig, StorageConfig};
use crate::constants::CONFIG_FILE_NAME;
use crate::errors::ConfigError;

/// Resolution order (highest priority first):
/// 1. Host overrides (applied via `apply_host_overrides`)
/// 2. Environment variables (`DIAGNOSE_*`)
/// 3. Project config (`diagnose.toml` in the given root)
/// 4. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub handler: HandlerConfig,
}

/// Values the embedding application passes in code.
#[derive(Debug, Clone, Default)]
pub struct HostOverrides {
    pub base_url: Option<String>,
    pub db_path: Option<String>,
    pub account_id: Option<String>,
    pub property_id: Option<String>,
    pub region: Option<String>,
}

impl AgentConfig {
    pub fn load(root: &Path, overrides: Option<&HostOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join(CONFIG_FILE_NAME);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        if let Some(host) = overrides {
            Self::apply_host_overrides(&mut config, host);
        }

        Self::validate(&config)?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn validate(config: &AgentConfig) -> Result<(), ConfigError> {
        if let Some(ref base_url) = config.api.base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| ConfigError::ValidationFailed {
                field: "api.base_url".to_string(),
                message: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::ValidationFailed {
                    field: "api.base_url".to_string(),
                    message: format!("unsupported scheme {:?}", parsed.scheme()),
                });
            }
            for (field, value) in [
                ("api.account_id", &config.api.account_id),
                ("api.property_id", &config.api.property_id),
            ] {
                if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                    return Err(ConfigError::ValidationFailed {
                        field: field.to_string(),
                        message: "required when api.base_url is set".to_string(),
                    });
                }
            }
        }
        if config.api.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "api.timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.handler.flush_interval_secs == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "handler.flush_interval_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Unknown keys are ignored.
    fn merge_toml_file(config: &mut AgentConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: AgentConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// `other` wins wherever it has a value.
    fn merge(base: &mut AgentConfig, other: &AgentConfig) {
        let api = &other.api;
        if api.base_url.is_some() {
            base.api.base_url = api.base_url.clone();
        }
        if api.account_id.is_some() {
            base.api.account_id = api.account_id.clone();
        }
        if api.property_id.is_some() {
            base.api.property_id = api.property_id.clone();
        }
        if api.app_name.is_some() {
            base.api.app_name = api.app_name.clone();
        }
        if api.region.is_some() {
            base.api.region = api.region.clone();
        }
        if api.api_key.is_some() {
            base.api.api_key = api.api_key.clone();
        }
        if api.timeout_secs.is_some() {
            base.api.timeout_secs = api.timeout_secs;
        }
        if api.max_retries.is_some() {
            base.api.max_retries = api.max_retries;
        }

        if other.storage.db_path.is_some() {
            base.storage.db_path = other.storage.db_path.clone();
        }
        if other.storage.read_pool_size.is_some() {
            base.storage.read_pool_size = other.storage.read_pool_size;
        }

        if !other.handler.ignore_domains.is_empty() {
            base.handler.ignore_domains = other.handler.ignore_domains.clone();
        }
        if other.handler.flush_interval_secs.is_some() {
            base.handler.flush_interval_secs = other.handler.flush_interval_secs;
        }
        if other.handler.consent_gating.is_some() {
            base.handler.consent_gating = other.handler.consent_gating;
        }
    }

    /// Pattern: `DIAGNOSE_API_BASE_URL`, `DIAGNOSE_STORAGE_DB_PATH`, etc.
    fn apply_env_overrides(config: &mut AgentConfig) {
        if let Ok(val) = std::env::var("DIAGNOSE_API_BASE_URL") {
            config.api.base_url = Some(val);
        }
        if let Ok(val) = std::env::var("DIAGNOSE_API_ACCOUNT_ID") {
            config.api.account_id = Some(val);
        }
        if let Ok(val) = std::env::var("DIAGNOSE_API_PROPERTY_ID") {
            config.api.property_id = Some(val);
        }
        if let Ok(val) = std::env::var("DIAGNOSE_API_REGION") {
            config.api.region = Some(val);
        }
        if let Ok(val) = std::env::var("DIAGNOSE_API_KEY") {
            config.api.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("DIAGNOSE_API_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.api.timeout_secs = Some(v);
            }
        }
        if let Ok(val) = std::env::var("DIAGNOSE_STORAGE_DB_PATH") {
            config.storage.db_path = Some(val);
        }
        if let Ok(val) = std::env::var("DIAGNOSE_HANDLER_FLUSH_INTERVAL_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.handler.flush_interval_secs = Some(v);
            }
        }
        if let Ok(val) = std::env::var("DIAGNOSE_HANDLER_CONSENT_GATING") {
            if let Ok(v) = val.parse::<bool>() {
                config.handler.consent_gating = Some(v);
            }
        }
    }

    fn apply_host_overrides(config: &mut AgentConfig, host: &HostOverrides) {
        if let Some(ref v) = host.base_url {
            config.api.base_url = Some(v.clone());
        }
        if let Some(ref v) = host.db_path {
            config.storage.db_path = Some(v.clone());
        }
        if let Some(ref v) = host.account_id {
            config.api.account_id = Some(v.clone());
        }
        if let Some(ref v) = host.property_id {
            config.api.property_id = Some(v.clone());
        }
        if let Some(ref v) = host.region {
            config.api.region = Some(v.clone());
        }
    }
}
