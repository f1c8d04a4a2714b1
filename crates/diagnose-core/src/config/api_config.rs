//! Backend API configuration.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend root URL. Unset disables the agent.
    pub base_url: Option<String>,
    pub account_id: Option<String>,
    pub property_id: Option<String>,
    pub app_name: Option<String>,
    pub region: Option<String>,
    /// Bearer token sent with every request.
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

impl ApiConfig {
    /// Request timeout in seconds, defaulting to 30.
    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(defaults::DEFAULT_API_TIMEOUT_SECS)
    }

    /// Retry attempts after the first failure, defaulting to 3.
    pub fn effective_max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(defaults::DEFAULT_API_MAX_RETRIES)
    }

    /// Host part of the base URL, if it parses.
    pub fn host(&self) -> Option<String> {
        let base = self.base_url.as_deref()?;
        let parsed = url::Url::parse(base).ok()?;
        parsed.host_str().map(str::to_string)
    }
}
