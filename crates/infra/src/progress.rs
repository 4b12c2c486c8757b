//! Progress observation.
//!
//! After each successful iteration the runner pushes one snapshot to any
//! registered observer. The transport (server push, polling, ...) belongs to
//! the caller; this is only the payload and the hook.

use std::sync::Mutex;

use serde::Serialize;

use ghostwriter_core::{Job, JobStatus};

/// The tuple the UI layer needs to render a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    pub current_index: usize,
    pub total_chars: usize,
    pub duration_minutes: u32,
}

impl ProgressSnapshot {
    pub fn of(job: &Job) -> Self {
        Self {
            status: job.status,
            current_index: job.current_index,
            total_chars: job.total_chars,
            duration_minutes: job.duration_minutes,
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total_chars == 0 {
            return 0.0;
        }
        self.current_index as f64 / self.total_chars as f64
    }
}

/// Listener for progress pushes.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}

/// Observer that records every snapshot; useful in tests and demos.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl ProgressObserver for CollectingObserver {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(*snapshot);
    }
}

impl<O: ProgressObserver + ?Sized> ProgressObserver for std::sync::Arc<O> {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        (**self).on_progress(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostwriter_core::{DocumentId, TypingProfile, UserId};

    #[test]
    fn snapshot_mirrors_the_job() {
        let job = Job::new(
            UserId::new(),
            DocumentId::new(),
            "0123456789",
            5,
            TypingProfile::Steady,
            None,
            500,
        )
        .unwrap();
        let snap = ProgressSnapshot::of(&job);
        assert_eq!(snap.status, JobStatus::Pending);
        assert_eq!(snap.total_chars, 10);
        assert_eq!(snap.ratio(), 0.0);
    }

    #[test]
    fn collecting_observer_keeps_order() {
        let observer = CollectingObserver::new();
        for i in 0..3 {
            observer.on_progress(&ProgressSnapshot {
                status: JobStatus::Running,
                current_index: i,
                total_chars: 3,
                duration_minutes: 1,
            });
        }
        let seen = observer.snapshots();
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0].current_index < w[1].current_index));
    }
}
