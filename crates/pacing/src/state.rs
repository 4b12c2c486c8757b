//! Engine state carried across batches within one job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ghostwriter_core::{JobId, TypingProfile};

use crate::engine::DelayPlan;
use crate::rng::SeededRng;
use crate::temporal::{TemporalState, WpmState};

/// Everything the delay engine remembers between batches.
///
/// An explicit value owned by the job, never a module singleton: resuming
/// after a process restart is a matter of reloading a checkpoint (or
/// reseeding deterministically), not recovering hidden state. Created once
/// per job start, updated once per successfully delivered batch, discarded
/// at terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub rng: SeededRng,
    pub temporal: TemporalState,
    /// Present only for the WPM-matching profile.
    pub wpm: Option<WpmState>,
}

impl EngineState {
    /// Deterministic state for a job: the seed folds the job id with its
    /// start time, so the same job always reproduces the same sequence.
    pub fn for_job(job_id: JobId, created_at: DateTime<Utc>, profile: TypingProfile) -> Self {
        let seed = derive_seed(job_id, created_at);
        Self {
            rng: SeededRng::new(seed),
            temporal: TemporalState::new(),
            wpm: profile.is_wpm_matched().then(WpmState::new),
        }
    }

    /// Fold one successfully delivered batch into the slow-moving trackers.
    pub fn record_batch(
        &mut self,
        plan: &DelayPlan,
        base_char_delay_ms: u64,
        target_wpm: Option<u16>,
    ) {
        if let Some(mean) = plan.mean_char_delay_ms() {
            self.temporal.observe(mean, base_char_delay_ms as f64);
        }
        if let (Some(wpm_state), Some(target)) = (self.wpm.as_mut(), target_wpm) {
            wpm_state.observe(
                plan.total_ms() as f64,
                plan.char_delays_ms.len() as u64,
                f64::from(target),
            );
        }
    }
}

fn derive_seed(job_id: JobId, created_at: DateTime<Utc>) -> u64 {
    let bits = job_id.as_uuid().as_u128();
    ((bits >> 64) as u64) ^ (bits as u64) ^ (created_at.timestamp_millis() as u64)
}
