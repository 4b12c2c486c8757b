//! Plan self-check utilities.
//!
//! Cheap structural checks a caller (or a debug assertion) can run against a
//! freshly planned batch, plus a summary for logging and distribution tests.

use ghostwriter_core::{DomainError, DomainResult};

use crate::engine::{DelayPlan, MIN_CHAR_DELAY_MS};
use crate::stats::{mean, std_dev};

/// Verify the post-conditions every plan must satisfy.
pub fn check_plan(plan: &DelayPlan, min_total_ms: u64) -> DomainResult<()> {
    if plan.char_delays_ms.is_empty() {
        return Err(DomainError::invariant("plan has no character delays"));
    }
    if let Some(&below) = plan.char_delays_ms.iter().find(|&&d| d < MIN_CHAR_DELAY_MS) {
        return Err(DomainError::invariant(format!(
            "char delay {below}ms below floor {MIN_CHAR_DELAY_MS}ms"
        )));
    }
    if plan.total_ms() < min_total_ms {
        return Err(DomainError::invariant(format!(
            "batch total {}ms below minimum interval {min_total_ms}ms",
            plan.total_ms()
        )));
    }
    Ok(())
}

/// Distribution summary of one plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanSummary {
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub total_ms: u64,
}

impl PlanSummary {
    pub fn of(plan: &DelayPlan) -> Option<Self> {
        let delays: Vec<f64> = plan.char_delays_ms.iter().map(|&d| d as f64).collect();
        Some(Self {
            mean_ms: mean(&delays)?,
            std_dev_ms: std_dev(&delays)?,
            total_ms: plan.total_ms(),
        })
    }
}
