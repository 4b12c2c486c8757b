//! The job runner: one safely repeatable iteration at a time.
//!
//! An external scheduler invokes [`JobRunner::run_iteration`] once per job
//! per tick and waits the advisory delay it returns. The runner never sleeps
//! and never retries internally; it only classifies what happened and
//! persists the resulting state in a single update.

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use ghostwriter_core::{
    BatchBuilder, DomainError, Job, JobErrorCode, JobId, JobStatus, RunnerConfig, TypingBatch,
};
use ghostwriter_delivery::{
    DeliveryAdapter, DeliveryOutcome, DocumentService, ThrottleController,
};
use ghostwriter_events::{JobEvent, JobEventKind};
use ghostwriter_pacing::{DelayEngine, EngineState};

use crate::progress::{ProgressObserver, ProgressSnapshot};
use crate::repository::{JobPatch, JobRepository, RepositoryError};

/// Why an iteration asked the caller to come back later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    RateLimited,
    DeliveryFailed(String),
}

/// Outcome of one runner iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Iteration {
    /// The job is not `running`; nothing was done. Not an error.
    Idle(JobStatus),
    /// A batch was delivered; wait `advisory_delay_ms` before the next tick.
    Advanced {
        progress: ProgressSnapshot,
        advisory_delay_ms: u64,
    },
    /// The batch at the cursor was already delivered by a prior (possibly
    /// crashed) attempt; the cursor advanced without touching the service.
    Replayed { progress: ProgressSnapshot },
    /// The full text has been delivered.
    Finished { progress: ProgressSnapshot },
    /// Transient failure; retry after `delay_ms`.
    RetryAfter { delay_ms: u64, reason: RetryReason },
    /// The job reached a terminal failure state.
    Terminal { status: JobStatus, code: JobErrorCode },
}

/// Fatal runner error; unlike [`Iteration::RetryAfter`] these are not
/// retryable by waiting.
#[derive(Debug, thiserror::Error)]
pub enum JobRunError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Orchestrates load → validate → batch → plan → deliver → persist.
pub struct JobRunner<R: JobRepository, S: DocumentService> {
    repository: R,
    adapter: DeliveryAdapter<S>,
    engine: DelayEngine,
    batches: BatchBuilder,
    throttle: ThrottleController,
    config: RunnerConfig,
    observer: Option<Box<dyn ProgressObserver>>,
}

impl<R: JobRepository, S: DocumentService> JobRunner<R, S> {
    pub fn new(repository: R, service: S, config: RunnerConfig) -> Result<Self, DomainError> {
        let batches = BatchBuilder::new(config.batch_min_chars, config.batch_max_chars)?;
        Ok(Self {
            repository,
            adapter: DeliveryAdapter::new(service),
            engine: DelayEngine::from_config(&config),
            batches,
            throttle: ThrottleController::new(config.min_interval_ms, config.max_backoff_ms),
            config,
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Submit a new job and return its id.
    pub fn submit(&self, job: Job) -> Result<JobId, JobRunError> {
        let id = self.repository.create(job)?;
        debug!(job_id = %id, "job submitted");
        Ok(id)
    }

    /// Move a pending job into `running`.
    pub fn start(&self, job_id: JobId) -> Result<(), JobRunError> {
        self.transition(job_id, |job| job.start())
    }

    /// Stop scheduling future iterations; the job stays resumable.
    pub fn pause(&self, job_id: JobId) -> Result<(), JobRunError> {
        self.transition(job_id, |job| job.pause())
    }

    pub fn resume(&self, job_id: JobId) -> Result<(), JobRunError> {
        self.transition(job_id, |job| job.resume())
    }

    /// Terminal stop. An in-flight delivery is allowed to finish; the hash
    /// check makes that race harmless.
    pub fn stop(&self, job_id: JobId) -> Result<(), JobRunError> {
        self.transition(job_id, |job| job.stop())
    }

    fn transition(
        &self,
        job_id: JobId,
        apply: impl FnOnce(&mut Job) -> Result<(), DomainError>,
    ) -> Result<(), JobRunError> {
        let mut job = self
            .repository
            .load(job_id)?
            .ok_or(JobRunError::NotFound(job_id))?;
        apply(&mut job)?;
        self.repository
            .update(job_id, JobPatch::new().status(job.status))?;
        info!(job_id = %job_id, status = %job.status, "job status changed");
        Ok(())
    }

    /// Run one iteration for `job_id`.
    ///
    /// Safe to repeat: batches are derived deterministically from
    /// `(text, current_index)`, and a re-derived batch whose hash matches
    /// `last_batch_hash` advances the cursor without a second delivery.
    pub fn run_iteration(&self, job_id: JobId) -> Result<Iteration, JobRunError> {
        let job = self
            .repository
            .load(job_id)?
            .ok_or(JobRunError::NotFound(job_id))?;

        if job.status != JobStatus::Running {
            return Ok(Iteration::Idle(job.status));
        }

        let now = Utc::now();
        if now > job.expires_at {
            return self.fail_terminal(&job, JobStatus::Expired, JobErrorCode::Expired);
        }

        let max_runtime =
            Duration::from_std(self.config.max_runtime).unwrap_or_else(|_| Duration::hours(8));
        if now - job.created_at > max_runtime {
            return self.fail_terminal(&job, JobStatus::Failed, JobErrorCode::MaxRuntimeExceeded);
        }

        let Some(batch) = self.batches.next_batch(&job.text_content, job.current_index) else {
            return self.complete(&job);
        };

        // Idempotency guard: a matching hash means this exact batch was
        // already delivered in a prior attempt that died before persisting
        // the cursor. Skip delivery, advance, carry on.
        if job.last_batch_hash.as_deref() == Some(batch.hash.as_str()) {
            let updated = self
                .repository
                .update(job_id, JobPatch::new().current_index(batch.end_index))?;
            info!(
                job_id = %job_id,
                start_index = batch.start_index,
                end_index = batch.end_index,
                "batch already delivered; cursor advanced without delivery"
            );
            let progress = ProgressSnapshot::of(&updated);
            self.notify(&progress);
            return Ok(Iteration::Replayed { progress });
        }

        let mut state = match self.repository.load_engine_state(job_id)? {
            Some(state) => state,
            None => EngineState::for_job(job.id, job.created_at, job.profile),
        };
        let plan = self.engine.plan(
            &batch.text,
            job.base_char_delay_ms(),
            job.profile,
            job.progress(),
            job.test_wpm,
            &mut state,
        )?;

        match self.adapter.deliver(job.user_id, job.document_id, &batch) {
            DeliveryOutcome::Delivered { revision_id, .. } => {
                state.record_batch(&plan, job.base_char_delay_ms(), job.test_wpm);

                let updated = self.repository.update(
                    job_id,
                    JobPatch::new()
                        .current_index(batch.end_index)
                        .last_batch_hash(batch.hash.clone())
                        .throttle_delay_ms(self.throttle.reset()),
                )?;
                self.repository.checkpoint_engine_state(job_id, &state)?;
                self.repository.append_event(JobEvent::new(
                    job_id,
                    JobEventKind::BatchSuccess,
                    json!({
                        "hash": batch.hash,
                        "start_index": batch.start_index,
                        "end_index": batch.end_index,
                        "revision_id": revision_id,
                        "advisory_delay_ms": plan.total_ms(),
                    }),
                ))?;

                debug!(
                    job_id = %job_id,
                    end_index = batch.end_index,
                    advisory_delay_ms = plan.total_ms(),
                    "batch delivered"
                );
                let progress = ProgressSnapshot::of(&updated);
                self.notify(&progress);
                Ok(Iteration::Advanced {
                    progress,
                    advisory_delay_ms: plan.total_ms(),
                })
            }
            DeliveryOutcome::AuthRevoked => {
                self.fail_terminal(&job, JobStatus::Failed, JobErrorCode::AuthRevoked)
            }
            DeliveryOutcome::RateLimited => {
                let delay_ms = self.throttle.after_rate_limit(job.throttle_delay_ms);
                self.repository
                    .update(job_id, JobPatch::new().throttle_delay_ms(delay_ms))?;
                self.repository.append_event(JobEvent::new(
                    job_id,
                    JobEventKind::Throttled,
                    json!({ "throttle_delay_ms": delay_ms, "start_index": batch.start_index }),
                ))?;
                warn!(job_id = %job_id, delay_ms, "rate limited; backing off");
                Ok(Iteration::RetryAfter {
                    delay_ms,
                    reason: RetryReason::RateLimited,
                })
            }
            DeliveryOutcome::Failed(message) => {
                self.repository.append_event(JobEvent::new(
                    job_id,
                    JobEventKind::BatchError,
                    json!({ "error": message, "start_index": batch.start_index }),
                ))?;
                warn!(job_id = %job_id, error = %message, "delivery failed; will retry");
                Ok(Iteration::RetryAfter {
                    delay_ms: job.throttle_delay_ms,
                    reason: RetryReason::DeliveryFailed(message),
                })
            }
        }
    }

    /// Drive a running job until it leaves `running` or stops advancing.
    ///
    /// Test/demo convenience; production schedulers own the wait loop and
    /// should call [`run_iteration`](Self::run_iteration) directly.
    pub fn drain(&self, job_id: JobId, max_iterations: usize) -> Result<Iteration, JobRunError> {
        let mut last = self.run_iteration(job_id)?;
        for _ in 1..max_iterations {
            match last {
                Iteration::Advanced { .. } | Iteration::Replayed { .. } => {
                    last = self.run_iteration(job_id)?;
                }
                _ => break,
            }
        }
        Ok(last)
    }

    fn complete(&self, job: &Job) -> Result<Iteration, JobRunError> {
        let now = Utc::now();
        let updated = self.repository.update(
            job.id,
            JobPatch::new()
                .status(JobStatus::Completed)
                .completed_at(now),
        )?;
        self.repository.append_event(JobEvent::new(
            job.id,
            JobEventKind::Completed,
            json!({ "total_chars": job.total_chars }),
        ))?;
        info!(job_id = %job.id, total_chars = job.total_chars, "job completed");

        let progress = ProgressSnapshot::of(&updated);
        self.notify(&progress);
        Ok(Iteration::Finished { progress })
    }

    fn fail_terminal(
        &self,
        job: &Job,
        status: JobStatus,
        code: JobErrorCode,
    ) -> Result<Iteration, JobRunError> {
        self.repository.update(
            job.id,
            JobPatch::new().status(status).error_code(code),
        )?;
        self.repository.append_event(JobEvent::new(
            job.id,
            JobEventKind::Failed,
            json!({ "error_code": code.as_str() }),
        ))?;
        warn!(job_id = %job.id, status = %status, code = %code, "job failed terminally");
        Ok(Iteration::Terminal { status, code })
    }

    /// Access to the repository, mainly for callers that need to read events
    /// or progress outside an iteration.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Expected batch at the current cursor, without running an iteration.
    pub fn peek_batch(&self, job: &Job) -> Option<TypingBatch> {
        self.batches.next_batch(&job.text_content, job.current_index)
    }

    fn notify(&self, progress: &ProgressSnapshot) {
        if let Some(observer) = &self.observer {
            observer.on_progress(progress);
        }
    }
}
