//! `ghostwriter-core` — domain foundation for the typing delivery engine.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the job record and its status machine, batch
//! derivation with idempotency hashing, and runner configuration.

pub mod batch;
pub mod config;
pub mod error;
pub mod id;
pub mod job;

pub use batch::{BatchBuilder, TypingBatch, batch_hash};
pub use config::RunnerConfig;
pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, JobId, UserId};
pub use job::{Job, JobErrorCode, JobStatus, TypingProfile};
