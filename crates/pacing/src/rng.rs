//! Deterministic seeded random source.
//!
//! A linear-congruential generator with fully serializable state. The engine
//! needs a generator whose exact position can ride on the job's checkpoint,
//! so delay sequences replay identically after a process restart; `rand`'s
//! standard generators do not expose stable serializable state.

use serde::{Deserialize, Serialize};

// Knuth MMIX constants.
const MULTIPLIER: u64 = 6364136223846793005;
const INCREMENT: u64 = 1442695040888963407;

/// Seeded LCG. Same seed, same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    seed: u64,
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, state: seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        self.state
    }

    /// Uniform draw in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        // Top 53 bits; enough for a full f64 mantissa.
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform draw in [min, max).
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Uniform integer draw in [min, max], inclusive.
    pub fn range_u64(&mut self, min: u64, max: u64) -> u64 {
        debug_assert!(min <= max);
        min + (self.next_f64() * (max - min + 1) as f64) as u64
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}
