//! Job event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use ghostwriter_core::JobId;

/// What happened during a runner iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    /// A batch was delivered and the cursor advanced.
    BatchSuccess,
    /// Delivery failed transiently; the cursor did not move.
    BatchError,
    /// The external service rate-limited the job; backoff increased.
    Throttled,
    /// The job delivered its full text.
    Completed,
    /// The job reached a terminal failure state.
    Failed,
}

impl JobEventKind {
    /// Stable event name identifier.
    pub fn event_type(&self) -> &'static str {
        match self {
            JobEventKind::BatchSuccess => "job.batch_success",
            JobEventKind::BatchError => "job.batch_error",
            JobEventKind::Throttled => "job.throttled",
            JobEventKind::Completed => "job.completed",
            JobEventKind::Failed => "job.failed",
        }
    }
}

/// One audit record. Write-once; never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: Uuid,
    pub job_id: JobId,
    pub kind: JobEventKind,
    /// Free-form details (batch hash, error message, backoff delay, ...).
    pub details: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(job_id: JobId, kind: JobEventKind, details: JsonValue) -> Self {
        Self {
            id: Uuid::now_v7(),
            job_id,
            kind,
            details,
            occurred_at: Utc::now(),
        }
    }
}
