//! Job records and the backoff formulas applied between retry attempts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a job currently sits in the dispatch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Ready to be claimed once `earliest_run` has passed.
    Pending,
    /// Not yet ready; `earliest_run` is in the future.
    Delayed,
    /// Claimed by a worker, handler running.
    Processing,
    /// The handler returned successfully.
    Completed,
    /// Retries exhausted, or the handler signalled a non-retryable failure.
    Failed,
}

/// How the delay between retries grows with the attempt count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffSpec {
    Fixed { base_delay_ms: u64 },
    Linear { base_delay_ms: u64 },
    Exponential { base_delay_ms: u64 },
}

impl BackoffSpec {
    /// The default backoff: fixed, one second.
    pub fn fixed_default() -> Self {
        BackoffSpec::Fixed { base_delay_ms: 1000 }
    }

    /// Delay before the given attempt number (1-based), capped at
    /// `max_delay_ms`.
    pub fn delay_for(&self, attempts: u32, max_delay_ms: u64) -> Duration {
        let raw_ms = match *self {
            BackoffSpec::Fixed { base_delay_ms } => base_delay_ms,
            BackoffSpec::Linear { base_delay_ms } => base_delay_ms.saturating_mul(attempts as u64),
            BackoffSpec::Exponential { base_delay_ms } => {
                let exponent = attempts.saturating_sub(1).min(32);
                base_delay_ms.saturating_mul(1u64 << exponent)
            }
        };
        Duration::from_millis(raw_ms.min(max_delay_ms))
    }
}

/// Options accepted by [`crate::JobQueue::add`]/[`crate::JobQueue::schedule`].
///
/// `max_attempts`/`backoff` are `None` by default rather than baking in a
/// literal, so [`crate::JobQueue::add`] can fall back to the queue's own
/// `JobQueueConfig` (itself resolved from `QUEUE_MAX_ATTEMPTS`/
/// `QUEUE_BACKOFF_BASE_MS`, per §6.1) instead of silently overriding it.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub priority: i32,
    pub delay: Duration,
    pub max_attempts: Option<u32>,
    pub backoff: Option<BackoffSpec>,
    pub max_backoff_delay: Duration,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            delay: Duration::ZERO,
            max_attempts: None,
            backoff: None,
            max_backoff_delay: Duration::from_secs(3600),
        }
    }
}

/// A fully materialized job record, as stored by a [`crate::backend::QueueBackend`].
///
/// `attempts <= max_attempts` and `earliest_run >= created_at` hold for the
/// lifetime of the record. `progress` is advisory and never read by the
/// dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub queue: String,
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub priority: i32,
    pub earliest_run: std::time::SystemTime,
    pub processed_at: Option<std::time::SystemTime>,
    pub completed_at: Option<std::time::SystemTime>,
    pub failed_at: Option<std::time::SystemTime>,
    pub created_at: std::time::SystemTime,
    pub updated_at: std::time::SystemTime,
    pub progress: u8,
    pub backoff: BackoffSpec,
    pub max_backoff_delay_ms: u64,
    /// `true` if this instance was produced by a recurring schedule firing
    /// after its originally-due time (e.g. after process downtime).
    pub missed: bool,
    /// Insertion sequence, used only to break ties when priority and
    /// `earliest_run` are otherwise identical.
    pub sequence: u64,
}

impl Job {
    /// `true` once the job can no longer be retried or re-dispatched.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}
