//! End-to-end simulation against the in-memory stack.
//!
//! Runs one steady job to completion, printing progress as it goes. Advisory
//! delays are compressed (divided by 100) so a five-minute job finishes in a
//! few seconds of wall time.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use ghostwriter_core::{DocumentId, Job, RunnerConfig, TypingProfile, UserId};
use ghostwriter_delivery::InMemoryDocumentService;
use ghostwriter_infra::{
    CollectingObserver, InMemoryJobRepository, Iteration, JobRepository, JobRunner,
};

const TEXT: &str = "The quick brown fox jumps over the lazy dog. \
Pack my box with five dozen liquor jugs. \
How vexingly quick daft zebras jump!";

const DELAY_COMPRESSION: u64 = 100;

fn main() -> anyhow::Result<()> {
    ghostwriter_observability::init();

    let repository = InMemoryJobRepository::arc();
    let service = InMemoryDocumentService::arc();
    let observer = Arc::new(CollectingObserver::new());
    let runner = JobRunner::new(
        repository.clone(),
        service.clone(),
        RunnerConfig::default(),
    )
    .context("runner configuration")?
    .with_observer(observer.clone());

    let job = Job::new(
        UserId::new(),
        DocumentId::new(),
        TEXT,
        2,
        TypingProfile::Steady,
        None,
        500,
    )
    .context("job configuration")?;
    let (user, doc) = (job.user_id, job.document_id);

    let job_id = runner.submit(job)?;
    runner.start(job_id)?;
    info!(%job_id, chars = TEXT.chars().count(), "simulation started");

    loop {
        match runner.run_iteration(job_id)? {
            Iteration::Advanced {
                progress,
                advisory_delay_ms,
            } => {
                info!(
                    current = progress.current_index,
                    total = progress.total_chars,
                    advisory_delay_ms,
                    "progress"
                );
                thread::sleep(Duration::from_millis(advisory_delay_ms / DELAY_COMPRESSION));
            }
            Iteration::Replayed { progress } => {
                info!(current = progress.current_index, "replayed batch");
            }
            Iteration::RetryAfter { delay_ms, reason } => {
                info!(delay_ms, ?reason, "retrying later");
                thread::sleep(Duration::from_millis(delay_ms / DELAY_COMPRESSION));
            }
            Iteration::Finished { progress } => {
                info!(total = progress.total_chars, "simulation finished");
                break;
            }
            Iteration::Idle(status) => {
                info!(%status, "job is not running; bailing out");
                break;
            }
            Iteration::Terminal { status, code } => {
                anyhow::bail!("job terminated: {status} ({code})");
            }
        }
    }

    let delivered = service
        .content(user, doc)
        .context("document was never written")?;
    anyhow::ensure!(delivered == TEXT, "document does not match the job text");

    let events = repository.events_for(job_id)?;
    info!(
        events = events.len(),
        progress_updates = observer.snapshots().len(),
        "document matches the job text exactly"
    );
    Ok(())
}
