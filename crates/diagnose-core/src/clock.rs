//! Process-wide strictly increasing nanosecond clock.
//!
//! Values are anchored to the wall clock once at construction and advanced by
//! `Instant`, so later wall-clock adjustments never move them backwards.

use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub trait MonotonicClock: Send + Sync {
    /// Nanoseconds since the Unix epoch, strictly greater than any value
    /// previously returned by this clock.
    fn now_nanos(&self) -> i64;

    /// Every later `now_nanos` returns a value greater than `floor_nanos`.
    /// Used to continue past timestamps persisted by an earlier process, whose
    /// wall clock may have been ahead of this one.
    fn advance_to(&self, floor_nanos: i64);
}

#[derive(Debug)]
pub struct SystemMonotonicClock {
    anchor_nanos: i64,
    anchor: Instant,
    last: Mutex<i64>,
}

impl SystemMonotonicClock {
    pub fn new() -> Self {
        let anchor_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self {
            anchor_nanos,
            anchor: Instant::now(),
            last: Mutex::new(i64::MIN),
        }
    }

    fn raw_nanos(&self) -> i64 {
        let elapsed = i64::try_from(self.anchor.elapsed().as_nanos()).unwrap_or(i64::MAX);
        self.anchor_nanos.saturating_add(elapsed)
    }
}

impl Default for SystemMonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemMonotonicClock {
    fn now_nanos(&self) -> i64 {
        let raw = self.raw_nanos();
        // A poisoned lock still holds a valid i64.
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = if raw <= *last { *last + 1 } else { raw };
        *last = next;
        next
    }

    fn advance_to(&self, floor_nanos: i64) {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if floor_nanos > *last {
            *last = floor_nanos;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_to_wall_clock() {
        let clock = SystemMonotonicClock::new();
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as i64;
        let diff = (clock.now_nanos() - wall).abs();
        assert!(diff < 5_000_000_000, "skew too large: {diff}ns");
    }

    #[test]
    fn advance_to_lifts_later_readings() {
        let clock = SystemMonotonicClock::new();
        let ahead = clock.now_nanos() + 3_600_000_000_000;
        clock.advance_to(ahead);
        let first = clock.now_nanos();
        assert!(first > ahead);
        assert!(clock.now_nanos() > first);

        // A lower floor never moves the clock back.
        clock.advance_to(0);
        assert!(clock.now_nanos() > first);
    }
}
