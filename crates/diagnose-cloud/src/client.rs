//! `DiagnoseClient` over the backend HTTP API.

use std::sync::atomic::{AtomicI16, Ordering};

use diagnose_core::config::ApiConfig;
use diagnose_core::errors::{CloudError, ConfigError, DiagnoseError};
use diagnose_core::models::{ConsentAction, RemoteConfig, SendEvent, VendorDatabase};
use diagnose_core::traits::DiagnoseClient;

use crate::transport::http_client::{HttpClient, HttpClientConfig};
use crate::transport::protocol::{
    EventWire, RecordEventsRequest, RecordEventsResponse, VendorDatabaseResponse, CONFIG_PATH,
    RECORD_EVENTS_PATH, VENDOR_DB_PATH,
};

const NO_SAMPLE_RATE: i16 = -1;

#[derive(Debug)]
pub struct DiagnoseApiClient {
    http: HttpClient,
    account_id: String,
    property_id: String,
    app_name: Option<String>,
    region: Option<String>,
    sample_rate: AtomicI16,
}

impl DiagnoseApiClient {
    pub fn new(
        http: HttpClient,
        account_id: impl Into<String>,
        property_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            account_id: account_id.into(),
            property_id: property_id.into(),
            app_name: None,
            region: None,
            sample_rate: AtomicI16::new(NO_SAMPLE_RATE),
        }
    }

    pub fn with_app_name(mut self, app_name: Option<String>) -> Self {
        self.app_name = app_name;
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Build from the `[api]` config section. Requires a base URL and both ids.
    pub fn from_config(api: &ApiConfig) -> Result<Self, DiagnoseError> {
        let missing = |field: &str| ConfigError::ValidationFailed {
            field: field.to_string(),
            message: "required to reach the backend".to_string(),
        };
        let base_url = api.base_url.as_deref().ok_or_else(|| missing("api.base_url"))?;
        let account_id = api.account_id.clone().ok_or_else(|| missing("api.account_id"))?;
        let property_id = api
            .property_id
            .clone()
            .ok_or_else(|| missing("api.property_id"))?;

        let mut http = HttpClient::new(HttpClientConfig::from_api_config(base_url, api))
            .map_err(DiagnoseError::ConfigUnavailable)?;
        if let Some(ref key) = api.api_key {
            http.set_bearer_token(key.clone());
        }

        Ok(Self::new(http, account_id, property_id)
            .with_app_name(api.app_name.clone())
            .with_region(api.region.clone()))
    }

    /// Rate reported on uploaded network events.
    pub fn report_sample_rate(&self, rate: Option<u8>) {
        let raw = rate.map_or(NO_SAMPLE_RATE, i16::from);
        self.sample_rate.store(raw, Ordering::Relaxed);
    }

    fn sample_rate(&self) -> Option<f64> {
        let raw = self.sample_rate.load(Ordering::Relaxed);
        (raw >= 0).then(|| f64::from(raw))
    }

    fn request(&self, events: Vec<EventWire>) -> RecordEventsRequest {
        RecordEventsRequest {
            account_id: self.account_id.clone(),
            property_id: self.property_id.clone(),
            app_name: self.app_name.clone(),
            events,
        }
    }
}

impl DiagnoseClient for DiagnoseApiClient {
    async fn get_config(&self) -> Result<RemoteConfig, CloudError> {
        let mut query = vec![
            ("accountId", self.account_id.as_str()),
            ("propertyId", self.property_id.as_str()),
        ];
        if let Some(ref region) = self.region {
            query.push(("region", region.as_str()));
        }
        self.http.get(CONFIG_PATH, &query).await
    }

    async fn get_vendor_database(&self) -> Result<VendorDatabase, CloudError> {
        let resp: VendorDatabaseResponse = self.http.get(VENDOR_DB_PATH, &[]).await?;
        VendorDatabase::import(&resp.version, resp.rows)
    }

    async fn send_events(&self, events: &[SendEvent]) -> Result<(), CloudError> {
        if events.is_empty() {
            return Ok(());
        }
        let rate = self.sample_rate();
        let wire = events.iter().map(|e| EventWire::network(e, rate)).collect();
        // One attempt: a failed batch stays queued for the next flush.
        let _: RecordEventsResponse = self
            .http
            .put_once(RECORD_EVENTS_PATH, &self.request(wire))
            .await?;
        tracing::debug!(events = events.len(), "uploaded events");
        Ok(())
    }

    async fn send_consent_action(&self, action: ConsentAction, ts_ms: i64) -> Result<(), CloudError> {
        let wire = vec![EventWire::consent(action, ts_ms)];
        let _: RecordEventsResponse = self.http.put(RECORD_EVENTS_PATH, &self.request(wire)).await?;
        Ok(())
    }

    fn set_sample_rate(&self, rate: u8) {
        self.report_sample_rate(Some(rate));
    }
}
