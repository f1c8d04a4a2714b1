//! Event flag packing.

use diagnose_core::models::{EventFlags, EventType};
use proptest::prelude::*;

fn event_type() -> impl Strategy<Value = EventType> {
    prop::sample::select(EventType::ALL.to_vec())
}

proptest! {
    #[test]
    fn decode_inverts_encode(t in event_type(), valid in any::<bool>(), rejected in any::<bool>()) {
        let flags = EventFlags::new(t, valid, rejected);
        prop_assert_eq!(EventFlags::decode(flags.encode()).unwrap(), flags);
    }

    #[test]
    fn type_ordinal_stays_in_low_byte(t in event_type(), valid in any::<bool>(), rejected in any::<bool>()) {
        let raw = EventFlags::new(t, valid, rejected).encode();
        prop_assert_eq!(raw & 0xFF, t.ordinal());
        prop_assert_eq!(raw >> 10, 0);
    }
}

#[test]
fn ordinals_are_fixed() {
    assert_eq!(EventType::Url.ordinal(), 0);
    assert_eq!(EventType::ConsentString.ordinal(), 1);
    assert_eq!(EventType::State.ordinal(), 2);
    assert_eq!(EventType::from_ordinal(3), None);
}
