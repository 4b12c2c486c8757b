//! Slow-moving pacing state carried across batches.
//!
//! Two EMA-based trackers: [`TemporalState`] drifts the overall pace across a
//! long job, and [`WpmState`] nudges the WPM-matching profile back toward its
//! target speed. Both update once per successfully delivered batch.

use serde::{Deserialize, Serialize};

/// EMA smoothing for the observed average delay.
const TEMPORAL_ALPHA: f64 = 0.15;
/// Drift only engages once enough batches have been observed.
const TEMPORAL_WARMUP_BATCHES: u64 = 5;
/// Drift never pushes pacing more than 10% either way.
const DRIFT_MIN: f64 = 0.9;
const DRIFT_MAX: f64 = 1.1;

/// EMA smoothing for WPM drift.
const WPM_ALPHA: f64 = 0.1;
/// Batches before the speed controller engages.
const WPM_ENGAGE_BATCHES: u64 = 10;
/// Sustained relative drift below this is left alone.
const WPM_DRIFT_TOLERANCE: f64 = 0.05;
/// Correction per batch is bounded to ±2%.
const WPM_MAX_CORRECTION: f64 = 0.02;

/// Low-frequency pacing drift across a job.
///
/// Produces slow warm-up/fatigue-like wander rather than per-batch noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalState {
    pub delay_ema_ms: f64,
    pub drift_factor: f64,
    pub batch_count: u64,
}

impl TemporalState {
    pub fn new() -> Self {
        Self {
            delay_ema_ms: 0.0,
            drift_factor: 1.0,
            batch_count: 0,
        }
    }

    /// Fold one delivered batch's mean char delay into the EMA.
    pub fn observe(&mut self, mean_char_delay_ms: f64, base_char_delay_ms: f64) {
        self.batch_count += 1;
        self.delay_ema_ms = if self.batch_count == 1 {
            mean_char_delay_ms
        } else {
            TEMPORAL_ALPHA * mean_char_delay_ms + (1.0 - TEMPORAL_ALPHA) * self.delay_ema_ms
        };

        if self.batch_count >= TEMPORAL_WARMUP_BATCHES && base_char_delay_ms > 0.0 {
            self.drift_factor = (self.delay_ema_ms / base_char_delay_ms).clamp(DRIFT_MIN, DRIFT_MAX);
        }
    }

    /// Multiplicative factor for the next plan; 1.0 until warmed up.
    pub fn factor(&self) -> f64 {
        if self.batch_count >= TEMPORAL_WARMUP_BATCHES {
            self.drift_factor
        } else {
            1.0
        }
    }
}

impl Default for TemporalState {
    fn default() -> Self {
        Self::new()
    }
}

/// Negative-feedback speed controller for the WPM-matching profile.
///
/// Tracks cumulative chars/delay to compute a running actual WPM; when the
/// EMA of relative drift stays beyond 5% past the warm-up window, a bounded
/// correction (±2%) is applied to subsequent blends. Corrections relax back
/// toward neutral instead of resetting, so batch-to-batch change stays
/// imperceptible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WpmState {
    pub cumulative_delay_ms: f64,
    pub cumulative_chars: u64,
    pub wpm_drift_ema: f64,
    pub correction_factor: f64,
    pub batch_count: u64,
}

impl WpmState {
    pub fn new() -> Self {
        Self {
            cumulative_delay_ms: 0.0,
            cumulative_chars: 0,
            wpm_drift_ema: 0.0,
            correction_factor: 1.0,
            batch_count: 0,
        }
    }

    /// Running actual WPM over everything delivered so far.
    pub fn actual_wpm(&self) -> Option<f64> {
        if self.cumulative_delay_ms <= 0.0 || self.cumulative_chars == 0 {
            return None;
        }
        let words = self.cumulative_chars as f64 / 5.0;
        let minutes = self.cumulative_delay_ms / 60_000.0;
        Some(words / minutes)
    }

    /// Fold one delivered batch into the controller.
    pub fn observe(&mut self, batch_total_delay_ms: f64, batch_chars: u64, target_wpm: f64) {
        self.cumulative_delay_ms += batch_total_delay_ms;
        self.cumulative_chars += batch_chars;
        self.batch_count += 1;

        let Some(actual) = self.actual_wpm() else {
            return;
        };
        let drift = (actual - target_wpm) / target_wpm;
        self.wpm_drift_ema = if self.batch_count == 1 {
            drift
        } else {
            WPM_ALPHA * drift + (1.0 - WPM_ALPHA) * self.wpm_drift_ema
        };

        if self.batch_count > WPM_ENGAGE_BATCHES && self.wpm_drift_ema.abs() > WPM_DRIFT_TOLERANCE {
            // Typing too fast (positive drift) stretches delays; too slow shrinks them.
            self.correction_factor = (1.0 + 0.5 * self.wpm_drift_ema)
                .clamp(1.0 - WPM_MAX_CORRECTION, 1.0 + WPM_MAX_CORRECTION);
        } else {
            // Relax toward neutral; never a hard reset.
            self.correction_factor = 1.0 + (self.correction_factor - 1.0) * 0.5;
        }
    }

    pub fn factor(&self) -> f64 {
        self.correction_factor
    }
}

impl Default for WpmState {
    fn default() -> Self {
        Self::new()
    }
}
