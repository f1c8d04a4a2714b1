//! Installation-level sampling decision.
//!
//! The decision is drawn once per rate and reused until the remote rate
//! changes, so an installation is consistently in or out of the sample.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Highest meaningful rate.
pub const MAX_RATE: u8 = 100;

/// Draw `n` uniformly from `0..=100`; hit iff `n <= rate`.
pub fn sample_it(rate: u8) -> bool {
    sample_with(&mut rand::thread_rng(), rate)
}

pub fn sample_with<R: Rng + ?Sized>(rng: &mut R, rate: u8) -> bool {
    rng.gen_range(0..=MAX_RATE) <= rate.min(MAX_RATE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sampling {
    pub rate: u8,
    pub hit: Option<bool>,
}

impl Sampling {
    pub fn new(rate: u8, hit: Option<bool>) -> Self {
        Self {
            rate: rate.min(MAX_RATE),
            hit,
        }
    }

    /// Only a confirmed hit enables recording.
    pub fn is_active(&self) -> bool {
        self.hit == Some(true)
    }

    /// Re-roll only when the rate changes. Returns true when a new draw was made.
    pub fn update_and_sample(&mut self, new_rate: u8) -> bool {
        self.update_and_sample_with(&mut rand::thread_rng(), new_rate)
    }

    pub fn update_and_sample_with<R: Rng + ?Sized>(&mut self, rng: &mut R, new_rate: u8) -> bool {
        let new_rate = new_rate.min(MAX_RATE);
        if new_rate == self.rate {
            return false;
        }
        self.rate = new_rate;
        self.hit = Some(sample_with(rng, new_rate));
        true
    }
}
