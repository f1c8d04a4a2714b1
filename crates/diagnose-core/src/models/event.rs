//! Persisted events and the upload-side projection.

use serde::{Deserialize, Serialize};

use super::flags::{EventFlags, EventType};
use crate::constants::NANOS_PER_MILLI;

/// A recorded event. Timestamps come from the monotonic clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Url {
        time_nanos: i64,
        vendor_id: String,
        domain: String,
        valid: bool,
        rejected: bool,
    },
    State {
        time_nanos: i64,
        state: Vec<String>,
    },
    ConsentString {
        time_nanos: i64,
        consent_string: String,
    },
}

impl Event {
    pub fn time_nanos(&self) -> i64 {
        match self {
            Self::Url { time_nanos, .. }
            | Self::State { time_nanos, .. }
            | Self::ConsentString { time_nanos, .. } => *time_nanos,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Url { .. } => EventType::Url,
            Self::State { .. } => EventType::State,
            Self::ConsentString { .. } => EventType::ConsentString,
        }
    }

    pub fn flags(&self) -> EventFlags {
        match self {
            Self::Url {
                valid, rejected, ..
            } => EventFlags::new(EventType::Url, *valid, *rejected),
            other => EventFlags::context(other.event_type()),
        }
    }
}

/// A URL event enriched with the state and consent string in effect when it
/// was recorded. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEvent {
    pub state: Vec<String>,
    pub consent_string: Option<String>,
    pub time_ms: i64,
    pub vendor_id: String,
    pub domain: String,
    pub valid: bool,
    pub rejected: bool,
}

impl SendEvent {
    /// Replay events in the given order, tracking the latest state and consent
    /// string, and emit one `SendEvent` per URL event.
    ///
    /// Callers pass events sorted by ascending time.
    pub fn replay<I>(events: I) -> Vec<SendEvent>
    where
        I: IntoIterator<Item = Event>,
    {
        let mut state: Vec<String> = Vec::new();
        let mut consent_string: Option<String> = None;
        let mut out = Vec::new();

        for event in events {
            match event {
                Event::State { state: s, .. } => state = s,
                Event::ConsentString {
                    consent_string: c, ..
                } => consent_string = Some(c),
                Event::Url {
                    time_nanos,
                    vendor_id,
                    domain,
                    valid,
                    rejected,
                } => out.push(SendEvent {
                    state: state.clone(),
                    consent_string: consent_string.clone(),
                    time_ms: time_nanos / NANOS_PER_MILLI,
                    vendor_id,
                    domain,
                    valid,
                    rejected,
                }),
            }
        }
        out
    }
}
