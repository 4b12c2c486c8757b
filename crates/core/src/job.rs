//! The typing job record and its status lifecycle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{DocumentId, JobId, UserId};

/// Hard floor/ceiling for the per-character base delay, in milliseconds.
pub const MIN_BASE_CHAR_DELAY_MS: u64 = 50;
pub const MAX_BASE_CHAR_DELAY_MS: u64 = 500;

/// Bounds for a user-measured words-per-minute value.
pub const MIN_TEST_WPM: u16 = 1;
pub const MAX_TEST_WPM: u16 = 300;

/// Default lifetime of a job from creation until it is considered stale.
const DEFAULT_TTL_HOURS: i64 = 24;

/// Pacing personality for a typing job.
///
/// A closed set: adding a profile is a compile-time exercise, every consumer
/// matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypingProfile {
    Steady,
    Fatigue,
    Burst,
    Micropause,
    TypingTest,
}

impl TypingProfile {
    /// Whether this profile paces itself against a user-measured WPM value.
    pub fn is_wpm_matched(&self) -> bool {
        matches!(self, TypingProfile::TypingTest)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypingProfile::Steady => "steady",
            TypingProfile::Fatigue => "fatigue",
            TypingProfile::Burst => "burst",
            TypingProfile::Micropause => "micropause",
            TypingProfile::TypingTest => "typing-test",
        }
    }
}

impl core::str::FromStr for TypingProfile {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "steady" => Ok(TypingProfile::Steady),
            "fatigue" => Ok(TypingProfile::Fatigue),
            "burst" => Ok(TypingProfile::Burst),
            "micropause" => Ok(TypingProfile::Micropause),
            "typing-test" => Ok(TypingProfile::TypingTest),
            other => Err(DomainError::validation(format!(
                "unknown typing profile '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for TypingProfile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status lifecycle.
///
/// `Pending → Running → {Paused ↔ Running} → {Completed | Stopped | Failed |
/// Expired}`. Everything except the pause loop is terminal-directed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Stopped,
    Expired,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped | JobStatus::Expired
        )
    }

    /// Whether a transition from `self` to `to` is legal.
    pub fn can_transition(self, to: JobStatus) -> bool {
        use JobStatus::*;
        match (self, to) {
            (Pending, Running) => true,
            (Running, Paused) | (Paused, Running) => true,
            (Pending | Running | Paused, Stopped) => true,
            (Pending | Running | Paused, Failed) => true,
            (Pending | Running | Paused, Expired) => true,
            (Running, Completed) => true,
            _ => false,
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
            JobStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Terminal failure code exposed to callers.
///
/// These are always permanent: a job carrying one is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobErrorCode {
    /// Upstream credential revoked (401/403-class). Never transient.
    #[serde(rename = "GOOGLE_AUTH_REVOKED")]
    AuthRevoked,
    /// Wall-clock cap exceeded; bounds worst-case resource use per job.
    #[serde(rename = "MAX_RUNTIME_EXCEEDED")]
    MaxRuntimeExceeded,
    /// The job outlived its `expires_at`.
    #[serde(rename = "EXPIRED")]
    Expired,
}

impl JobErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobErrorCode::AuthRevoked => "GOOGLE_AUTH_REVOKED",
            JobErrorCode::MaxRuntimeExceeded => "MAX_RUNTIME_EXCEEDED",
            JobErrorCode::Expired => "EXPIRED",
        }
    }
}

impl core::fmt::Display for JobErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typing run against one target document.
///
/// `current_index` is the only mutable progress marker; `last_batch_hash`
/// always corresponds to the batch that produced it. Text and pacing
/// configuration are immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub user_id: UserId,
    pub document_id: DocumentId,

    pub text_content: String,
    /// Char count of `text_content` (not bytes).
    pub total_chars: usize,
    /// Cursor into `text_content`, in chars. `0 <= current_index <= total_chars`.
    pub current_index: usize,

    pub status: JobStatus,

    pub duration_minutes: u32,
    pub profile: TypingProfile,
    pub test_wpm: Option<u16>,

    /// Current advisory backoff delay; mutated only by throttle handling.
    pub throttle_delay_ms: u64,
    /// Hash of the most recently successfully submitted batch.
    pub last_batch_hash: Option<String>,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    pub error_code: Option<JobErrorCode>,
}

impl Job {
    /// Create a new pending job.
    ///
    /// Pacing configuration is validated synchronously here, before any batch
    /// or delay work can begin; nothing is silently defaulted.
    pub fn new(
        user_id: UserId,
        document_id: DocumentId,
        text_content: impl Into<String>,
        duration_minutes: u32,
        profile: TypingProfile,
        test_wpm: Option<u16>,
        initial_throttle_ms: u64,
    ) -> DomainResult<Self> {
        let text_content = text_content.into();
        let total_chars = text_content.chars().count();

        if total_chars == 0 {
            return Err(DomainError::validation("text content must not be empty"));
        }
        if duration_minutes == 0 {
            return Err(DomainError::validation("duration must be at least 1 minute"));
        }
        match (profile.is_wpm_matched(), test_wpm) {
            (true, None) => {
                return Err(DomainError::validation(
                    "typing-test profile requires a measured WPM",
                ));
            }
            (true, Some(wpm)) if !(MIN_TEST_WPM..=MAX_TEST_WPM).contains(&wpm) => {
                return Err(DomainError::validation(format!(
                    "test WPM {wpm} outside [{MIN_TEST_WPM}, {MAX_TEST_WPM}]"
                )));
            }
            (false, Some(_)) => {
                return Err(DomainError::validation(
                    "test WPM is only meaningful for the typing-test profile",
                ));
            }
            _ => {}
        }

        let now = Utc::now();
        Ok(Self {
            id: JobId::new(),
            user_id,
            document_id,
            text_content,
            total_chars,
            current_index: 0,
            status: JobStatus::Pending,
            duration_minutes,
            profile,
            test_wpm,
            throttle_delay_ms: initial_throttle_ms,
            last_batch_hash: None,
            created_at: now,
            expires_at: now + Duration::hours(DEFAULT_TTL_HOURS),
            completed_at: None,
            error_code: None,
        })
    }

    /// Override the expiry deadline (defaults to 24h after creation).
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Per-character delay that would exactly meet the duration target under
    /// perfectly uniform typing, clamped to [50, 500] ms. Every profile blends
    /// toward or away from this.
    pub fn base_char_delay_ms(&self) -> u64 {
        let duration_ms = u64::from(self.duration_minutes) * 60_000;
        (duration_ms / self.total_chars as u64)
            .clamp(MIN_BASE_CHAR_DELAY_MS, MAX_BASE_CHAR_DELAY_MS)
    }

    /// Fraction of the text delivered so far, in [0, 1].
    pub fn progress(&self) -> f64 {
        self.current_index as f64 / self.total_chars as f64
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.total_chars
    }

    fn transition(&mut self, to: JobStatus) -> DomainResult<()> {
        if !self.status.can_transition(to) {
            return Err(DomainError::conflict(format!(
                "illegal status transition {} -> {}",
                self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self) -> DomainResult<()> {
        self.transition(JobStatus::Running)
    }

    pub fn pause(&mut self) -> DomainResult<()> {
        self.transition(JobStatus::Paused)
    }

    pub fn resume(&mut self) -> DomainResult<()> {
        self.transition(JobStatus::Running)
    }

    pub fn stop(&mut self) -> DomainResult<()> {
        self.transition(JobStatus::Stopped)
    }

    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(JobStatus::Completed)?;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn mark_failed(&mut self, code: JobErrorCode) -> DomainResult<()> {
        self.transition(JobStatus::Failed)?;
        self.error_code = Some(code);
        Ok(())
    }

    pub fn mark_expired(&mut self) -> DomainResult<()> {
        self.transition(JobStatus::Expired)?;
        self.error_code = Some(JobErrorCode::Expired);
        Ok(())
    }

    /// Advance the cursor past a successfully delivered batch.
    ///
    /// The cursor is monotonic and never exceeds `total_chars`.
    pub fn advance_cursor(&mut self, end_index: usize, batch_hash: String) -> DomainResult<()> {
        if end_index < self.current_index {
            return Err(DomainError::invariant(format!(
                "cursor would regress from {} to {}",
                self.current_index, end_index
            )));
        }
        if end_index > self.total_chars {
            return Err(DomainError::invariant(format!(
                "cursor {} past end of text ({})",
                end_index, self.total_chars
            )));
        }
        self.current_index = end_index;
        self.last_batch_hash = Some(batch_hash);
        Ok(())
    }
}
