//! Skewed per-character jitter.
//!
//! A uniform distribution reads as mechanical. Delays here cluster around a
//! mode with an occasional longer outlier: a Box–Muller normal variate is
//! exponentiated into log-normal space and clamped to 50–150% of the input.

use std::f64::consts::TAU;

use crate::rng::SeededRng;

/// Shape of the log-normal factor; median stays at 1.0.
const JITTER_SIGMA: f64 = 0.25;

const FACTOR_FLOOR: f64 = 0.5;
const FACTOR_CEIL: f64 = 1.5;

/// Apply skewed jitter to a delay.
pub fn skewed_jitter_ms(delay_ms: f64, rng: &mut SeededRng) -> f64 {
    let u1 = rng.next_f64().max(1e-12);
    let u2 = rng.next_f64();
    let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
    let factor = (z * JITTER_SIGMA).exp().clamp(FACTOR_FLOOR, FACTOR_CEIL);
    delay_ms * factor
}
