//! Rate-limit backoff.
//!
//! Classic exponential backoff with a cap. The delay itself lives on the Job
//! record, so it survives process restarts; this controller only computes
//! the next value.

use ghostwriter_core::config::{MAX_BACKOFF_MS, MIN_INTERVAL_MS};

/// Doubles the advisory delay on rate limits, resets it on success.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleController {
    min_interval_ms: u64,
    max_backoff_ms: u64,
}

impl ThrottleController {
    pub fn new(min_interval_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            min_interval_ms,
            max_backoff_ms,
        }
    }

    /// Next delay after a rate-limit response: double, capped.
    pub fn after_rate_limit(&self, current_ms: u64) -> u64 {
        (current_ms.max(self.min_interval_ms))
            .saturating_mul(2)
            .min(self.max_backoff_ms)
    }

    /// Delay after any successful delivery.
    pub fn reset(&self) -> u64 {
        self.min_interval_ms
    }
}

impl Default for ThrottleController {
    fn default() -> Self {
        Self::new(MIN_INTERVAL_MS, MAX_BACKOFF_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_the_cap() {
        let throttle = ThrottleController::default();
        let mut delay = 500;
        let mut observed = Vec::new();
        for _ in 0..6 {
            delay = throttle.after_rate_limit(delay);
            observed.push(delay);
        }
        assert_eq!(observed, vec![1_000, 2_000, 4_000, 8_000, 10_000, 10_000]);
    }

    #[test]
    fn success_resets_to_min_interval() {
        let throttle = ThrottleController::default();
        let delay = throttle.after_rate_limit(8_000);
        assert_eq!(delay, 10_000);
        assert_eq!(throttle.reset(), 500);
    }

    #[test]
    fn zero_delay_is_floored_before_doubling() {
        let throttle = ThrottleController::default();
        assert_eq!(throttle.after_rate_limit(0), 1_000);
    }
}
