//! `ghostwriter-pacing` — delay synthesis for human-like typing.
//!
//! Everything here is deterministic given an [`state::EngineState`]: the same
//! seed reproduces the same delay sequence, which is what makes job resumption
//! and testing tractable.

pub mod check;
pub mod engine;
pub mod jitter;
pub mod mistakes;
pub mod profile;
pub mod rng;
pub mod state;
pub mod stats;
pub mod temporal;

pub use check::{PlanSummary, check_plan};
pub use engine::{DelayEngine, DelayPlan, MIN_CHAR_DELAY_MS};
pub use mistakes::{MistakePlan, MistakePlanner};
pub use rng::SeededRng;
pub use state::EngineState;
pub use temporal::{TemporalState, WpmState};
