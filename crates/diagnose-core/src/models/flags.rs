//! Bit-packed event flags.
//!
//! Layout of the persisted integer:
//! - bits 0..8: event type ordinal
//! - bit 8: valid
//! - bit 9: rejected
//!
//! Type ordinals are persisted. Never reorder or reuse them.

use crate::errors::StorageError;

const TYPE_MASK: i64 = 0xFF;
const VALID_BIT: i64 = 1 << 8;
const REJECTED_BIT: i64 = 1 << 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Url,
    ConsentString,
    State,
}

impl EventType {
    pub const ALL: [EventType; 3] = [EventType::Url, EventType::ConsentString, EventType::State];

    pub fn ordinal(self) -> i64 {
        match self {
            Self::Url => 0,
            Self::ConsentString => 1,
            Self::State => 2,
        }
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Url),
            1 => Some(Self::ConsentString),
            2 => Some(Self::State),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFlags {
    pub event_type: EventType,
    pub valid: bool,
    pub rejected: bool,
}

impl EventFlags {
    pub fn new(event_type: EventType, valid: bool, rejected: bool) -> Self {
        Self {
            event_type,
            valid,
            rejected,
        }
    }

    /// Flags for a context event (state or consent string).
    pub fn context(event_type: EventType) -> Self {
        Self::new(event_type, false, false)
    }

    pub fn encode(&self) -> i64 {
        let mut raw = self.event_type.ordinal();
        if self.valid {
            raw |= VALID_BIT;
        }
        if self.rejected {
            raw |= REJECTED_BIT;
        }
        raw
    }

    pub fn decode(raw: i64) -> Result<Self, StorageError> {
        let event_type =
            EventType::from_ordinal(raw & TYPE_MASK).ok_or_else(|| StorageError::CorruptRow {
                details: format!("unknown event type in flags {raw:#x}"),
            })?;
        Ok(Self {
            event_type,
            valid: raw & VALID_BIT != 0,
            rejected: raw & REJECTED_BIT != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_persisted_format() {
        assert_eq!(EventFlags::context(EventType::Url).encode(), 0);
        assert_eq!(EventFlags::context(EventType::State).encode(), 2);
        assert_eq!(EventFlags::new(EventType::Url, true, false).encode(), 0x100);
        assert_eq!(EventFlags::new(EventType::Url, false, true).encode(), 0x200);
        assert_eq!(EventFlags::new(EventType::ConsentString, true, true).encode(), 0x301);
    }

    #[test]
    fn unknown_type_is_corrupt() {
        let err = EventFlags::decode(0x107).unwrap_err();
        assert!(matches!(err, StorageError::CorruptRow { .. }));
    }
}
