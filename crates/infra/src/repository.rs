//! Job persistence abstraction and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use ghostwriter_core::{Job, JobErrorCode, JobId, JobStatus};
use ghostwriter_events::{EventLog, EventLogError, InMemoryEventLog, JobEvent};
use ghostwriter_pacing::EngineState;

/// Repository operation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<EventLogError> for RepositoryError {
    fn from(e: EventLogError) -> Self {
        RepositoryError::Storage(e.to_string())
    }
}

/// Only-the-changed-fields update for one job row.
///
/// The runner writes all of an iteration's mutations through a single patch,
/// relying on the storage layer applying it atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub current_index: Option<usize>,
    pub last_batch_hash: Option<String>,
    pub throttle_delay_ms: Option<u64>,
    pub status: Option<JobStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_code: Option<JobErrorCode>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_index(mut self, index: usize) -> Self {
        self.current_index = Some(index);
        self
    }

    pub fn last_batch_hash(mut self, hash: impl Into<String>) -> Self {
        self.last_batch_hash = Some(hash.into());
        self
    }

    pub fn throttle_delay_ms(mut self, ms: u64) -> Self {
        self.throttle_delay_ms = Some(ms);
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn error_code(mut self, code: JobErrorCode) -> Self {
        self.error_code = Some(code);
        self
    }

    /// Apply onto a job, enforcing the storage-level cursor invariants.
    fn apply(self, job: &mut Job) -> Result<(), RepositoryError> {
        if let Some(index) = self.current_index {
            if index < job.current_index {
                return Err(RepositoryError::Storage(format!(
                    "cursor would regress from {} to {index}",
                    job.current_index
                )));
            }
            if index > job.total_chars {
                return Err(RepositoryError::Storage(format!(
                    "cursor {index} past end of text ({})",
                    job.total_chars
                )));
            }
            job.current_index = index;
        }
        if let Some(hash) = self.last_batch_hash {
            job.last_batch_hash = Some(hash);
        }
        if let Some(ms) = self.throttle_delay_ms {
            job.throttle_delay_ms = ms;
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(at) = self.completed_at {
            job.completed_at = Some(at);
        }
        if let Some(code) = self.error_code {
            job.error_code = Some(code);
        }
        Ok(())
    }
}

/// Persistence contract for jobs, their audit events and engine checkpoints.
///
/// `update` must be atomic per call (single-row update); events are
/// append-only and never mutated.
pub trait JobRepository: Send + Sync {
    fn create(&self, job: Job) -> Result<JobId, RepositoryError>;

    fn load(&self, job_id: JobId) -> Result<Option<Job>, RepositoryError>;

    /// Apply a partial update and return the resulting job.
    fn update(&self, job_id: JobId, patch: JobPatch) -> Result<Job, RepositoryError>;

    fn append_event(&self, event: JobEvent) -> Result<(), RepositoryError>;

    fn events_for(&self, job_id: JobId) -> Result<Vec<JobEvent>, RepositoryError>;

    /// Persist the engine state as of the last successfully delivered batch.
    fn checkpoint_engine_state(
        &self,
        job_id: JobId,
        state: &EngineState,
    ) -> Result<(), RepositoryError>;

    fn load_engine_state(&self, job_id: JobId) -> Result<Option<EngineState>, RepositoryError>;
}

/// In-memory job repository for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<JobId, Job>>,
    events: InMemoryEventLog,
    engine_states: RwLock<HashMap<JobId, EngineState>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl JobRepository for InMemoryJobRepository {
    fn create(&self, job: Job) -> Result<JobId, RepositoryError> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(RepositoryError::AlreadyExists(job.id));
        }
        let id = job.id;
        jobs.insert(id, job);
        Ok(id)
    }

    fn load(&self, job_id: JobId) -> Result<Option<Job>, RepositoryError> {
        let jobs = self.jobs.read().unwrap();
        Ok(jobs.get(&job_id).cloned())
    }

    fn update(&self, job_id: JobId, patch: JobPatch) -> Result<Job, RepositoryError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or(RepositoryError::NotFound(job_id))?;
        patch.apply(job)?;
        Ok(job.clone())
    }

    fn append_event(&self, event: JobEvent) -> Result<(), RepositoryError> {
        self.events.append(event)?;
        Ok(())
    }

    fn events_for(&self, job_id: JobId) -> Result<Vec<JobEvent>, RepositoryError> {
        Ok(self.events.for_job(job_id)?)
    }

    fn checkpoint_engine_state(
        &self,
        job_id: JobId,
        state: &EngineState,
    ) -> Result<(), RepositoryError> {
        self.engine_states
            .write()
            .unwrap()
            .insert(job_id, state.clone());
        Ok(())
    }

    fn load_engine_state(&self, job_id: JobId) -> Result<Option<EngineState>, RepositoryError> {
        Ok(self.engine_states.read().unwrap().get(&job_id).cloned())
    }
}

impl JobRepository for Arc<InMemoryJobRepository> {
    fn create(&self, job: Job) -> Result<JobId, RepositoryError> {
        (**self).create(job)
    }

    fn load(&self, job_id: JobId) -> Result<Option<Job>, RepositoryError> {
        (**self).load(job_id)
    }

    fn update(&self, job_id: JobId, patch: JobPatch) -> Result<Job, RepositoryError> {
        (**self).update(job_id, patch)
    }

    fn append_event(&self, event: JobEvent) -> Result<(), RepositoryError> {
        (**self).append_event(event)
    }

    fn events_for(&self, job_id: JobId) -> Result<Vec<JobEvent>, RepositoryError> {
        (**self).events_for(job_id)
    }

    fn checkpoint_engine_state(
        &self,
        job_id: JobId,
        state: &EngineState,
    ) -> Result<(), RepositoryError> {
        (**self).checkpoint_engine_state(job_id, state)
    }

    fn load_engine_state(&self, job_id: JobId) -> Result<Option<EngineState>, RepositoryError> {
        (**self).load_engine_state(job_id)
    }
}
