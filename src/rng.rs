//! Randomness capability.
//!
//! The node core never calls `rand::random_range` directly — per the design
//! notes, randomness (HELLO jitter, synthetic sensor readings) is exposed as
//! a capability so tests can seed determinism instead of fighting real
//! entropy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the two random quantities the control plane needs.
pub trait NodeRng {
    /// Uniform jitter in `[0, bound)`, used for the initial HELLO offset.
    fn jitter(&mut self, bound_ms: u64) -> u64;

    /// Uniform synthetic sensor reading in `[0, 100)`.
    fn sensor_reading(&mut self) -> f64;
}

/// `StdRng`-backed implementation. Seed it for reproducible tests; build it
/// from OS entropy (`StdRng::from_os_rng`) for the live runner.
pub struct SeededRng(StdRng);

impl SeededRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }
}

impl NodeRng for SeededRng {
    fn jitter(&mut self, bound_ms: u64) -> u64 {
        if bound_ms == 0 {
            0
        } else {
            self.0.random_range(0..bound_ms)
        }
    }

    fn sensor_reading(&mut self) -> f64 {
        self.0.random_range(0.0..100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = SeededRng::from_seed(42);
        let mut b = SeededRng::from_seed(42);
        for _ in 0..8 {
            assert_eq!(a.jitter(15_000), b.jitter(15_000));
            assert_eq!(a.sensor_reading(), b.sensor_reading());
        }
    }

    #[test]
    fn jitter_respects_bound() {
        let mut rng = SeededRng::from_seed(7);
        for _ in 0..256 {
            assert!(rng.jitter(15_000) < 15_000);
        }
    }
}
