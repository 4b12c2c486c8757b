//! `ghostwriter-events` — append-only job audit events.
//!
//! Events are facts: written once per occurrence, never mutated. Every
//! terminal transition and every delivery attempt outcome leaves one here.

pub mod event;
pub mod log;

pub use event::{JobEvent, JobEventKind};
pub use log::{EventLog, EventLogError, InMemoryEventLog};
