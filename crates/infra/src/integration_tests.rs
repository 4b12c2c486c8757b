//! Integration tests for the full delivery pipeline.
//!
//! Tests: Job → JobRunner → DelayEngine → DeliveryAdapter → DocumentService
//!
//! Verifies:
//! - Jobs run to completion with the document matching the job text exactly
//! - Idempotent replay never duplicates text in the target document
//! - Backoff doubles to its cap, terminal failures stick, pause/stop work

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use ghostwriter_core::{
        DocumentId, Job, JobErrorCode, JobId, JobStatus, RunnerConfig, TypingProfile, UserId,
        batch_hash,
    };
    use ghostwriter_delivery::{DocumentService, FailureMode, InMemoryDocumentService};
    use ghostwriter_events::JobEventKind;
    use ghostwriter_pacing::EngineState;

    use crate::progress::CollectingObserver;
    use crate::repository::{InMemoryJobRepository, JobPatch, JobRepository};
    use crate::runner::{Iteration, JobRunError, JobRunner, RetryReason};

    const PANGRAM: &str = "The quick brown fox jumps over the lazy dog. ";

    fn scenario_text() -> String {
        // Exactly 170 chars, as in the reference scenario.
        PANGRAM.repeat(4).chars().take(170).collect()
    }

    fn setup() -> (
        JobRunner<Arc<InMemoryJobRepository>, Arc<InMemoryDocumentService>>,
        Arc<InMemoryJobRepository>,
        Arc<InMemoryDocumentService>,
    ) {
        let repository = InMemoryJobRepository::arc();
        let service = InMemoryDocumentService::arc();
        let runner = JobRunner::new(
            repository.clone(),
            service.clone(),
            RunnerConfig::default(),
        )
        .unwrap();
        (runner, repository, service)
    }

    fn scenario_job() -> Job {
        Job::new(
            UserId::new(),
            DocumentId::new(),
            scenario_text(),
            5,
            TypingProfile::Steady,
            None,
            500,
        )
        .unwrap()
    }

    fn run_to_completion(
        runner: &JobRunner<Arc<InMemoryJobRepository>, Arc<InMemoryDocumentService>>,
        job_id: JobId,
    ) -> Iteration {
        for _ in 0..200 {
            match runner.run_iteration(job_id).unwrap() {
                Iteration::Advanced { .. } | Iteration::Replayed { .. } => continue,
                other => return other,
            }
        }
        panic!("job did not terminate within 200 iterations");
    }

    #[test]
    fn steady_scenario_runs_to_completion() {
        let (runner, repository, service) = setup();
        let job = scenario_job();
        let user = job.user_id;
        let doc = job.document_id;
        let text = job.text_content.clone();

        // 5 min / 170 chars would be ~1.76s per char; capped at 500ms.
        assert_eq!(job.base_char_delay_ms(), 500);

        let job_id = runner.submit(job).unwrap();
        runner.start(job_id).unwrap();

        let outcome = run_to_completion(&runner, job_id);
        assert!(matches!(outcome, Iteration::Finished { .. }));

        let finished = repository.load(job_id).unwrap().unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.current_index, 170);
        assert!(finished.completed_at.is_some());
        assert_eq!(service.content(user, doc).unwrap(), text);
    }

    #[test]
    fn completion_emits_events_for_every_batch() {
        let (runner, repository, _service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();
        run_to_completion(&runner, job_id);

        let events = repository.events_for(job_id).unwrap();
        let successes = events
            .iter()
            .filter(|e| e.kind == JobEventKind::BatchSuccess)
            .count();
        assert!(successes > 0);
        assert_eq!(events.last().unwrap().kind, JobEventKind::Completed);
    }

    #[test]
    fn cursor_is_monotonic_across_the_whole_run() {
        let (repository, service) = (InMemoryJobRepository::arc(), InMemoryDocumentService::arc());
        let observer = Arc::new(CollectingObserver::new());
        let runner = JobRunner::new(
            repository.clone(),
            service.clone(),
            RunnerConfig::default(),
        )
        .unwrap()
        .with_observer(observer.clone());

        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();
        run_to_completion(&runner, job_id);

        let snapshots = observer.snapshots();
        assert!(!snapshots.is_empty());
        assert!(
            snapshots
                .windows(2)
                .all(|w| w[0].current_index <= w[1].current_index)
        );
        let last = snapshots.last().unwrap();
        assert_eq!(last.current_index, last.total_chars);
        assert_eq!(last.status, JobStatus::Completed);
    }

    #[test]
    fn replay_after_crash_does_not_duplicate_text() {
        let (runner, repository, service) = setup();
        let job = scenario_job();
        let user = job.user_id;
        let doc = job.document_id;
        let text = job.text_content.clone();
        let job_id = runner.submit(job).unwrap();
        runner.start(job_id).unwrap();

        // Simulate an iteration that delivered the first batch and persisted
        // the hash, then died before the cursor update landed.
        let job = repository.load(job_id).unwrap().unwrap();
        let batch = runner.peek_batch(&job).unwrap();
        let receipt = service.insert_text(user, doc, 0, &batch.text).unwrap();
        assert!(!receipt.revision_id.is_empty());
        repository
            .update(job_id, JobPatch::new().last_batch_hash(batch.hash.clone()))
            .unwrap();

        // The retried iteration must recognize the batch and skip delivery.
        let outcome = runner.run_iteration(job_id).unwrap();
        match outcome {
            Iteration::Replayed { progress } => {
                assert_eq!(progress.current_index, batch.end_index)
            }
            other => panic!("expected replay, got {other:?}"),
        }
        assert_eq!(service.content(user, doc).unwrap(), batch.text);

        // And the rest of the run still produces the text exactly once.
        run_to_completion(&runner, job_id);
        assert_eq!(service.content(user, doc).unwrap(), text);
    }

    #[test]
    fn recomputing_a_batch_twice_yields_the_same_hash() {
        let (runner, repository, _service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        let job = repository.load(job_id).unwrap().unwrap();

        let first = runner.peek_batch(&job).unwrap();
        let second = runner.peek_batch(&job).unwrap();
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.hash, batch_hash(&first.text, first.start_index));
    }

    #[test]
    fn rate_limits_climb_the_backoff_ladder_and_reset() {
        let (runner, repository, service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();

        for _ in 0..6 {
            service.fail_next(FailureMode::RateLimited);
        }

        let mut observed = Vec::new();
        for _ in 0..6 {
            match runner.run_iteration(job_id).unwrap() {
                Iteration::RetryAfter {
                    delay_ms,
                    reason: RetryReason::RateLimited,
                } => observed.push(delay_ms),
                other => panic!("expected rate-limit retry, got {other:?}"),
            }
        }
        assert_eq!(observed, vec![1_000, 2_000, 4_000, 8_000, 10_000, 10_000]);

        // Cursor never moved while throttled.
        assert_eq!(repository.load(job_id).unwrap().unwrap().current_index, 0);

        // One success resets the delay to the minimum interval.
        assert!(matches!(
            runner.run_iteration(job_id).unwrap(),
            Iteration::Advanced { .. }
        ));
        assert_eq!(
            repository.load(job_id).unwrap().unwrap().throttle_delay_ms,
            500
        );

        let events = repository.events_for(job_id).unwrap();
        let throttled = events
            .iter()
            .filter(|e| e.kind == JobEventKind::Throttled)
            .count();
        assert_eq!(throttled, 6);
    }

    #[test]
    fn auth_revocation_is_terminal() {
        let (runner, repository, service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();

        service.fail_next(FailureMode::AuthRevoked);
        let outcome = runner.run_iteration(job_id).unwrap();
        assert_eq!(
            outcome,
            Iteration::Terminal {
                status: JobStatus::Failed,
                code: JobErrorCode::AuthRevoked,
            }
        );

        let job = repository.load(job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_code, Some(JobErrorCode::AuthRevoked));
        assert_eq!(job.current_index, 0);

        // Later ticks see a terminal job and do nothing.
        assert_eq!(
            runner.run_iteration(job_id).unwrap(),
            Iteration::Idle(JobStatus::Failed)
        );
    }

    #[test]
    fn transient_failures_leave_the_cursor_alone() {
        let (runner, repository, service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();

        service.fail_next(FailureMode::Transient);
        match runner.run_iteration(job_id).unwrap() {
            Iteration::RetryAfter {
                reason: RetryReason::DeliveryFailed(msg),
                ..
            } => assert!(!msg.is_empty()),
            other => panic!("expected transient retry, got {other:?}"),
        }
        assert_eq!(repository.load(job_id).unwrap().unwrap().current_index, 0);

        // The next attempt succeeds and advances.
        assert!(matches!(
            runner.run_iteration(job_id).unwrap(),
            Iteration::Advanced { .. }
        ));
        assert!(repository.load(job_id).unwrap().unwrap().current_index > 0);

        let events = repository.events_for(job_id).unwrap();
        assert_eq!(events[0].kind, JobEventKind::BatchError);
    }

    #[test]
    fn empty_revision_token_counts_as_transient_failure() {
        let (runner, repository, service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();

        service.fail_next(FailureMode::EmptyRevision);
        assert!(matches!(
            runner.run_iteration(job_id).unwrap(),
            Iteration::RetryAfter {
                reason: RetryReason::DeliveryFailed(_),
                ..
            }
        ));
        assert_eq!(repository.load(job_id).unwrap().unwrap().current_index, 0);
    }

    #[test]
    fn paused_jobs_are_idle_until_resumed() {
        let (runner, _repository, _service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();
        runner.pause(job_id).unwrap();

        assert_eq!(
            runner.run_iteration(job_id).unwrap(),
            Iteration::Idle(JobStatus::Paused)
        );

        runner.resume(job_id).unwrap();
        assert!(matches!(
            runner.run_iteration(job_id).unwrap(),
            Iteration::Advanced { .. }
        ));
    }

    #[test]
    fn stopped_jobs_cannot_be_resumed() {
        let (runner, _repository, _service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();
        runner.stop(job_id).unwrap();

        assert_eq!(
            runner.run_iteration(job_id).unwrap(),
            Iteration::Idle(JobStatus::Stopped)
        );
        assert!(matches!(
            runner.resume(job_id),
            Err(JobRunError::Domain(_))
        ));
    }

    #[test]
    fn expired_jobs_terminate_with_expired_code() {
        let (runner, repository, _service) = setup();
        let job = scenario_job().with_expiry(Utc::now() - Duration::minutes(1));
        let job_id = runner.submit(job).unwrap();
        runner.start(job_id).unwrap();

        assert_eq!(
            runner.run_iteration(job_id).unwrap(),
            Iteration::Terminal {
                status: JobStatus::Expired,
                code: JobErrorCode::Expired,
            }
        );

        let events = repository.events_for(job_id).unwrap();
        assert_eq!(events.last().unwrap().kind, JobEventKind::Failed);
        assert_eq!(events.last().unwrap().details["error_code"], "EXPIRED");
    }

    #[test]
    fn runtime_cap_fails_long_lived_jobs() {
        let (runner, repository, _service) = setup();
        let mut job = scenario_job();
        // Pretend the job has been grinding for nine hours.
        job.created_at = Utc::now() - Duration::hours(9);
        let job_id = runner.submit(job).unwrap();
        runner.start(job_id).unwrap();

        assert_eq!(
            runner.run_iteration(job_id).unwrap(),
            Iteration::Terminal {
                status: JobStatus::Failed,
                code: JobErrorCode::MaxRuntimeExceeded,
            }
        );
        assert_eq!(
            repository.load(job_id).unwrap().unwrap().error_code,
            Some(JobErrorCode::MaxRuntimeExceeded)
        );
    }

    #[test]
    fn unknown_jobs_are_a_fatal_error() {
        let (runner, _repository, _service) = setup();
        assert!(matches!(
            runner.run_iteration(JobId::new()),
            Err(JobRunError::NotFound(_))
        ));
    }

    #[test]
    fn engine_state_is_checkpointed_per_delivered_batch() {
        let (runner, repository, _service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();

        assert!(repository.load_engine_state(job_id).unwrap().is_none());
        runner.run_iteration(job_id).unwrap();
        let first = repository.load_engine_state(job_id).unwrap().unwrap();
        assert_eq!(first.temporal.batch_count, 1);

        runner.run_iteration(job_id).unwrap();
        let second = repository.load_engine_state(job_id).unwrap().unwrap();
        assert_eq!(second.temporal.batch_count, 2);
        assert_ne!(first.rng, second.rng);
    }

    #[test]
    fn checkpointed_state_reseeds_deterministically() {
        let (_runner, _repository, _service) = setup();
        let job = scenario_job();
        let a = EngineState::for_job(job.id, job.created_at, job.profile);
        let b = EngineState::for_job(job.id, job.created_at, job.profile);
        assert_eq!(a, b);
    }

    #[test]
    fn concurrent_jobs_share_no_state() {
        let (runner, repository, service) = setup();
        let job_a = scenario_job();
        let job_b = Job::new(
            UserId::new(),
            DocumentId::new(),
            "A different text for a different document.",
            3,
            TypingProfile::Burst,
            None,
            500,
        )
        .unwrap();

        let (user_a, doc_a, text_a) = (job_a.user_id, job_a.document_id, job_a.text_content.clone());
        let (user_b, doc_b, text_b) = (job_b.user_id, job_b.document_id, job_b.text_content.clone());

        let id_a = runner.submit(job_a).unwrap();
        let id_b = runner.submit(job_b).unwrap();
        runner.start(id_a).unwrap();
        runner.start(id_b).unwrap();

        // Interleave ticks between the two jobs.
        for _ in 0..200 {
            let a = runner.run_iteration(id_a).unwrap();
            let b = runner.run_iteration(id_b).unwrap();
            let done = |i: &Iteration| {
                matches!(i, Iteration::Finished { .. } | Iteration::Idle(JobStatus::Completed))
            };
            if done(&a) && done(&b) {
                break;
            }
        }

        assert_eq!(repository.load(id_a).unwrap().unwrap().status, JobStatus::Completed);
        assert_eq!(repository.load(id_b).unwrap().unwrap().status, JobStatus::Completed);
        assert_eq!(service.content(user_a, doc_a).unwrap(), text_a);
        assert_eq!(service.content(user_b, doc_b).unwrap(), text_b);
    }

    #[test]
    fn every_profile_runs_to_completion() {
        for (profile, wpm) in [
            (TypingProfile::Steady, None),
            (TypingProfile::Fatigue, None),
            (TypingProfile::Burst, None),
            (TypingProfile::Micropause, None),
            (TypingProfile::TypingTest, Some(65)),
        ] {
            let (runner, repository, service) = setup();
            let job = Job::new(
                UserId::new(),
                DocumentId::new(),
                scenario_text(),
                5,
                profile,
                wpm,
                500,
            )
            .unwrap();
            let (user, doc, text) = (job.user_id, job.document_id, job.text_content.clone());

            let job_id = runner.submit(job).unwrap();
            runner.start(job_id).unwrap();
            let outcome = run_to_completion(&runner, job_id);
            assert!(
                matches!(outcome, Iteration::Finished { .. }),
                "{profile} did not finish: {outcome:?}"
            );
            let finished = repository.load(job_id).unwrap().unwrap();
            assert_eq!(finished.current_index, finished.total_chars);
            assert_eq!(service.content(user, doc).unwrap(), text);
        }
    }

    #[test]
    fn drain_runs_until_finished() {
        let (runner, repository, _service) = setup();
        let job_id = runner.submit(scenario_job()).unwrap();
        runner.start(job_id).unwrap();

        let outcome = runner.drain(job_id, 200).unwrap();
        assert!(matches!(outcome, Iteration::Finished { .. }));
        assert_eq!(
            repository.load(job_id).unwrap().unwrap().status,
            JobStatus::Completed
        );
    }
}
