//! Per-profile pacing parameters.
//!
//! Each profile is a distinct personality: a `[min, max]` draw range, a blend
//! weight against the job's base delay, a multiplier, and an optional
//! per-batch hesitation. All draws come from the job's seeded rng.

use ghostwriter_core::{DomainError, DomainResult, TypingProfile};

use crate::rng::SeededRng;

/// Blend weight of the range draw for most profiles (base gets the rest).
const RANGE_WEIGHT: f64 = 0.7;
/// The WPM-matching profile trusts its measured-WPM range more.
const RANGE_WEIGHT_WPM: f64 = 0.8;

/// Fatigue slowdown: 5% floor plus up to 10% more as progress accumulates.
const FATIGUE_BASE_SLOWDOWN: f64 = 0.05;
const FATIGUE_PROGRESS_SLOWDOWN: f64 = 0.10;
const FATIGUE_EXPONENT: f64 = 1.1;

/// Variance band around the WPM-derived delay, tightened for extreme inputs.
const WPM_BAND: f64 = 0.15;
const WPM_BAND_TIGHT: f64 = 0.08;
const WPM_FAST_CUTOFF: u16 = 100;
const WPM_SLOW_CUTOFF: u16 = 20;

/// Draw range and blend weight for one profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileParams {
    pub range_ms: (f64, f64),
    pub range_weight: f64,
}

/// Per-character delay implied by a measured WPM (5 chars per word).
pub fn wpm_char_delay_ms(wpm: u16) -> f64 {
    60_000.0 / (f64::from(wpm) * 5.0)
}

fn wpm_band(wpm: u16) -> f64 {
    if wpm >= WPM_FAST_CUTOFF || wpm <= WPM_SLOW_CUTOFF {
        WPM_BAND_TIGHT
    } else {
        WPM_BAND
    }
}

/// Resolve the draw range for a profile.
///
/// `test_wpm` is required for the WPM-matching profile; this re-checks it so
/// the engine fails fast even when handed a job that bypassed construction
/// validation.
pub fn params(
    profile: TypingProfile,
    base_char_delay_ms: f64,
    test_wpm: Option<u16>,
) -> DomainResult<ProfileParams> {
    let params = match profile {
        TypingProfile::Steady => ProfileParams {
            range_ms: (base_char_delay_ms * 0.85, base_char_delay_ms * 1.15),
            range_weight: RANGE_WEIGHT,
        },
        TypingProfile::Fatigue => ProfileParams {
            range_ms: (base_char_delay_ms * 0.80, base_char_delay_ms * 1.30),
            range_weight: RANGE_WEIGHT,
        },
        TypingProfile::Burst => ProfileParams {
            range_ms: (base_char_delay_ms * 0.60, base_char_delay_ms * 1.00),
            range_weight: RANGE_WEIGHT,
        },
        TypingProfile::Micropause => ProfileParams {
            range_ms: (base_char_delay_ms * 0.80, base_char_delay_ms * 1.20),
            range_weight: RANGE_WEIGHT,
        },
        TypingProfile::TypingTest => {
            let wpm = test_wpm.ok_or_else(|| {
                DomainError::validation("typing-test profile requires a measured WPM")
            })?;
            let center = wpm_char_delay_ms(wpm);
            let band = wpm_band(wpm);
            ProfileParams {
                range_ms: (center * (1.0 - band), center * (1.0 + band)),
                range_weight: RANGE_WEIGHT_WPM,
            }
        }
    };
    Ok(params)
}

/// Profile multiplier for one character.
pub fn multiplier(
    profile: TypingProfile,
    progress: f64,
    test_wpm: Option<u16>,
    rng: &mut SeededRng,
) -> f64 {
    match profile {
        TypingProfile::Steady => rng.range_f64(0.98, 1.02),
        TypingProfile::Fatigue => {
            1.0 + FATIGUE_BASE_SLOWDOWN
                + FATIGUE_PROGRESS_SLOWDOWN * progress.powf(FATIGUE_EXPONENT)
        }
        TypingProfile::Burst => rng.range_f64(0.80, 0.90),
        TypingProfile::Micropause => rng.range_f64(1.00, 1.10),
        TypingProfile::TypingTest => {
            let band = test_wpm.map(wpm_band).unwrap_or(WPM_BAND);
            rng.range_f64(1.0 - band, 1.0 + band)
        }
    }
}

/// Per-batch extra pause: bursty typists stop to think, hesitant ones stall.
pub fn batch_hesitation_ms(profile: TypingProfile, rng: &mut SeededRng) -> u64 {
    match profile {
        TypingProfile::Burst if rng.chance(0.25) => rng.range_u64(600, 1200),
        TypingProfile::Micropause if rng.chance(0.40) => rng.range_u64(100, 350),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_range_brackets_base() {
        let p = params(TypingProfile::Steady, 200.0, None).unwrap();
        assert_eq!(p.range_ms, (170.0, 230.0));
        assert_eq!(p.range_weight, RANGE_WEIGHT);
    }

    #[test]
    fn burst_range_sits_below_base() {
        let p = params(TypingProfile::Burst, 200.0, None).unwrap();
        assert!(p.range_ms.1 <= 200.0);
    }

    #[test]
    fn typing_test_without_wpm_is_an_error() {
        assert!(params(TypingProfile::TypingTest, 200.0, None).is_err());
    }

    #[test]
    fn wpm_delay_math() {
        // 60 WPM = 300 chars/min = 200ms per char.
        assert!((wpm_char_delay_ms(60) - 200.0).abs() < 1e-9);
        // 40 WPM = 300ms per char.
        assert!((wpm_char_delay_ms(40) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn extreme_wpm_gets_tighter_band() {
        let fast = params(TypingProfile::TypingTest, 200.0, Some(120)).unwrap();
        let slow = params(TypingProfile::TypingTest, 200.0, Some(15)).unwrap();
        let mid = params(TypingProfile::TypingTest, 200.0, Some(60)).unwrap();

        let width = |p: ProfileParams| (p.range_ms.1 - p.range_ms.0) / (p.range_ms.1 + p.range_ms.0);
        assert!(width(fast) < width(mid));
        assert!(width(slow) < width(mid));
    }

    #[test]
    fn fatigue_multiplier_grows_with_progress() {
        let mut rng = SeededRng::new(1);
        let start = multiplier(TypingProfile::Fatigue, 0.0, None, &mut rng);
        let end = multiplier(TypingProfile::Fatigue, 1.0, None, &mut rng);
        assert!((start - 1.05).abs() < 1e-9);
        assert!((end - 1.15).abs() < 1e-9);
    }

    #[test]
    fn burst_multiplier_is_sub_unity() {
        let mut rng = SeededRng::new(2);
        for _ in 0..100 {
            assert!(multiplier(TypingProfile::Burst, 0.5, None, &mut rng) < 1.0);
        }
    }

    #[test]
    fn hesitation_frequencies_match_profiles() {
        let mut rng = SeededRng::new(3);
        let bursts = (0..10_000)
            .filter(|_| batch_hesitation_ms(TypingProfile::Burst, &mut rng) > 0)
            .count();
        let rate = bursts as f64 / 10_000.0;
        assert!((rate - 0.25).abs() < 0.02, "burst hesitation rate {rate}");

        let steady = (0..10_000)
            .filter(|_| batch_hesitation_ms(TypingProfile::Steady, &mut rng) > 0)
            .count();
        assert_eq!(steady, 0);
    }

    #[test]
    fn hesitation_durations_are_in_range() {
        let mut rng = SeededRng::new(4);
        for _ in 0..1_000 {
            let ms = batch_hesitation_ms(TypingProfile::Micropause, &mut rng);
            assert!(ms == 0 || (100..=350).contains(&ms));
        }
    }
}
