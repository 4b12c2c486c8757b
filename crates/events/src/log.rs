//! Event log abstraction and in-memory implementation.

use std::sync::{Arc, RwLock};

use ghostwriter_core::JobId;

use crate::event::JobEvent;

/// Append-only event log.
pub trait EventLog: Send + Sync {
    /// Append one event. Events are never updated or deleted.
    fn append(&self, event: JobEvent) -> Result<(), EventLogError>;

    /// All events for a job, in append order.
    fn for_job(&self, job_id: JobId) -> Result<Vec<JobEvent>, EventLogError>;
}

/// Event log error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventLogError {
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory event log for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<JobEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, event: JobEvent) -> Result<(), EventLogError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| EventLogError::Storage("lock poisoned".to_string()))?;
        events.push(event);
        Ok(())
    }

    fn for_job(&self, job_id: JobId) -> Result<Vec<JobEvent>, EventLogError> {
        let events = self
            .events
            .read()
            .map_err(|_| EventLogError::Storage("lock poisoned".to_string()))?;
        Ok(events
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect())
    }
}

impl EventLog for Arc<InMemoryEventLog> {
    fn append(&self, event: JobEvent) -> Result<(), EventLogError> {
        (**self).append(event)
    }

    fn for_job(&self, job_id: JobId) -> Result<Vec<JobEvent>, EventLogError> {
        (**self).for_job(job_id)
    }
}
