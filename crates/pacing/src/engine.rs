//! Delay plan synthesis.

use serde::{Deserialize, Serialize};

use ghostwriter_core::{DomainResult, RunnerConfig, TypingProfile};

use crate::check::check_plan;
use crate::jitter::skewed_jitter_ms;
use crate::mistakes::MistakePlanner;
use crate::profile;
use crate::rng::SeededRng;
use crate::state::EngineState;

/// Floor for any single per-character delay.
pub const MIN_CHAR_DELAY_MS: u64 = 50;

/// Timing for one batch: one delay per character plus a single aggregate
/// post-batch pause.
///
/// Punctuation/boundary pauses are a property of the transition between
/// tokens, not of a glyph, so they accumulate into `batch_pause_ms` instead
/// of being attached per character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayPlan {
    pub char_delays_ms: Vec<u64>,
    pub batch_pause_ms: u64,
}

impl DelayPlan {
    /// Total advisory wait for the batch.
    pub fn total_ms(&self) -> u64 {
        self.char_delays_ms.iter().sum::<u64>() + self.batch_pause_ms
    }

    pub fn mean_char_delay_ms(&self) -> Option<f64> {
        if self.char_delays_ms.is_empty() {
            return None;
        }
        let sum: u64 = self.char_delays_ms.iter().sum();
        Some(sum as f64 / self.char_delays_ms.len() as f64)
    }
}

/// Synthesizes per-batch delay plans.
///
/// Stateless apart from configuration; all evolving state lives in the
/// job-owned [`EngineState`].
#[derive(Debug, Clone)]
pub struct DelayEngine {
    min_total_ms: u64,
    mistakes: Option<MistakePlanner>,
}

impl DelayEngine {
    pub fn new(min_total_ms: u64) -> Self {
        Self {
            min_total_ms,
            mistakes: Some(MistakePlanner::default()),
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            min_total_ms: config.min_interval_ms,
            mistakes: config.simulate_mistakes.then(MistakePlanner::default),
        }
    }

    pub fn without_mistakes(mut self) -> Self {
        self.mistakes = None;
        self
    }

    /// Plan delays for one batch.
    ///
    /// `global_progress` is the job-level fraction delivered so far (clamped
    /// to [0, 1]); `base_char_delay_ms` comes from the job's duration target.
    /// Only the rng inside `state` advances here; the slow trackers update
    /// via [`EngineState::record_batch`] once the batch actually delivers.
    pub fn plan(
        &self,
        text: &str,
        base_char_delay_ms: u64,
        profile_kind: TypingProfile,
        global_progress: f64,
        test_wpm: Option<u16>,
        state: &mut EngineState,
    ) -> DomainResult<DelayPlan> {
        let progress = global_progress.clamp(0.0, 1.0);
        let base = base_char_delay_ms as f64;
        let params = profile::params(profile_kind, base, test_wpm)?;

        let drift = state.temporal.factor();
        let wpm_correction = state.wpm.as_ref().map(|w| w.factor()).unwrap_or(1.0);

        let char_count = text.chars().count();
        let mut char_delays_ms = Vec::with_capacity(char_count);
        for _ in 0..char_count {
            let draw = state.rng.range_f64(params.range_ms.0, params.range_ms.1);
            let blended = params.range_weight * draw + (1.0 - params.range_weight) * base;
            let adjusted = blended * drift * wpm_correction;
            let jittered = skewed_jitter_ms(adjusted, &mut state.rng);
            let mult = profile::multiplier(profile_kind, progress, test_wpm, &mut state.rng);
            char_delays_ms.push(((jittered * mult).round() as u64).max(MIN_CHAR_DELAY_MS));
        }

        let mut batch_pause_ms = context_pause_ms(text, &mut state.rng);
        batch_pause_ms += profile::batch_hesitation_ms(profile_kind, &mut state.rng);

        if let Some(planner) = &self.mistakes {
            if let Some(mistake) = planner.plan(text, &mut state.rng) {
                char_delays_ms[mistake.char_index] += mistake.total_extra_ms();
            }
        }

        let mut plan = DelayPlan {
            char_delays_ms,
            batch_pause_ms,
        };

        // Even a trivially short batch must not hammer the external API.
        let total = plan.total_ms();
        if total < self.min_total_ms {
            plan.batch_pause_ms += self.min_total_ms - total;
        }

        debug_assert!(check_plan(&plan, self.min_total_ms).is_ok());
        Ok(plan)
    }
}

impl Default for DelayEngine {
    fn default() -> Self {
        Self::new(ghostwriter_core::config::MIN_INTERVAL_MS)
    }
}

/// Scan the batch once and accumulate transition pauses.
///
/// Sentence enders pause longest, then paragraph breaks on top; a word
/// longer than 8 chars costs a little extra recognition time.
fn context_pause_ms(text: &str, rng: &mut SeededRng) -> u64 {
    const LONG_WORD_CHARS: usize = 8;

    let mut pause: u64 = 0;
    let mut word_len: usize = 0;
    let mut prev: Option<char> = None;

    for c in text.chars() {
        match c {
            '.' | '!' | '?' => pause += rng.range_u64(500, 1200),
            ',' => pause += rng.range_u64(150, 400),
            ' ' => pause += rng.range_u64(50, 150),
            '\n' => {
                pause += rng.range_u64(300, 600);
                if prev == Some('\n') {
                    // Paragraph break: the long stare at the screen.
                    pause += rng.range_u64(1000, 2500);
                }
            }
            _ => {}
        }

        if c.is_alphanumeric() {
            word_len += 1;
        } else {
            if word_len > LONG_WORD_CHARS {
                pause += rng.range_u64(100, 300);
            }
            word_len = 0;
        }
        prev = Some(c);
    }
    if word_len > LONG_WORD_CHARS {
        pause += rng.range_u64(100, 300);
    }

    pause
}
