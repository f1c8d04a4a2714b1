//! Wire types for the backend API.

use diagnose_core::models::{ConsentAction, SendEvent, VendorRow};
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH: &str = "/config";
pub const VENDOR_DB_PATH: &str = "/vendor-db";
pub const RECORD_EVENTS_PATH: &str = "/recordEvents";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventsRequest {
    pub account_id: String,
    pub property_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub events: Vec<EventWire>,
}

/// Acknowledgement body. Empty or `{}`; extra fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEventsResponse {}

/// One uploaded event, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventWire {
    Network { ts: i64, data: NetworkEventData },
    Consent { ts: i64, data: ConsentEventData },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEventData {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<f64>,
    pub vendor_id: String,
    pub valid: bool,
    pub rejected: bool,
    pub state: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentEventData {
    pub consent_action: ConsentAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorDatabaseResponse {
    pub version: String,
    #[serde(default)]
    pub rows: Vec<VendorRow>,
}

impl EventWire {
    pub fn network(event: &SendEvent, sample_rate: Option<f64>) -> Self {
        Self::Network {
            ts: event.time_ms,
            data: NetworkEventData {
                domain: event.domain.clone(),
                consent_string: event.consent_string.clone(),
                sample_rate,
                vendor_id: event.vendor_id.clone(),
                valid: event.valid,
                rejected: event.rejected,
                state: event.state.clone(),
            },
        }
    }

    pub fn consent(action: ConsentAction, ts: i64) -> Self {
        Self::Consent {
            ts,
            data: ConsentEventData {
                consent_action: action,
            },
        }
    }
}
