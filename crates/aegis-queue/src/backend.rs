//! The queue backend capability contract.
//!
//! Mirrors the cache crate's backend externalization: this crate ships an
//! in-memory default and a small connection trait a caller implements over
//! their own store for the `remote-kv`/`db` variants — no concrete Redis or
//! Postgres driver lives here.

use crate::job::{Job, JobStatus};
use aegis_core::Error;
use async_trait::async_trait;

/// The capability set a queue backend implements. The facade never mutates
/// job state directly; every transition goes through one of these calls so
/// a backend can enforce its own atomic-claim primitive (a mutex for the
/// in-memory backend, a conditional update by status+version for a remote
/// one).
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Inserts a new job, already materialized by the facade (id assigned,
    /// status set to `Pending` or `Delayed`).
    async fn insert(&self, job: Job) -> Result<(), Error>;

    async fn get(&self, queue: &str, id: &str) -> Result<Option<Job>, Error>;

    /// Applies a user-writable field update (`progress`, `data`/payload).
    /// Returns `false` if the job does not exist.
    async fn update_fields(
        &self,
        queue: &str,
        id: &str,
        progress: Option<u8>,
        payload: Option<serde_json::Value>,
    ) -> Result<bool, Error>;

    async fn remove(&self, queue: &str, id: &str) -> Result<bool, Error>;

    /// Atomically claims the single highest-priority ready job in `queue`
    /// (`status in {pending, delayed}` with `earliest_run <= now`, ordered
    /// by `(priority DESC, earliest_run ASC, sequence ASC)`), transitioning
    /// it to `processing`. At most one caller across all dispatchers
    /// sharing this backend observes a given job from this call.
    async fn claim_next_ready(&self, queue: &str) -> Result<Option<Job>, Error>;

    /// Moves every `delayed` job in `queue` whose `earliest_run` has
    /// passed to `pending`. Returns the count promoted.
    async fn promote_delayed(&self, queue: &str) -> Result<usize, Error>;

    async fn mark_completed(&self, queue: &str, id: &str, result: serde_json::Value) -> Result<(), Error>;

    /// Records the handler's failure: sets `attempts`, and either
    /// re-queues with a new `earliest_run` (`retry_at = Some`) or marks
    /// `failed` with `error` (`retry_at = None`).
    async fn mark_failed_or_retry(
        &self,
        queue: &str,
        id: &str,
        attempts: u32,
        error: String,
        retry_at: Option<std::time::SystemTime>,
    ) -> Result<(), Error>;

    /// Resets a terminal job to `pending` with `attempts = 0`. `false` if
    /// the job is absent or not in a terminal state.
    async fn retry(&self, queue: &str, id: &str) -> Result<bool, Error>;

    async fn counts_by_status(&self, queue: &str) -> Result<QueueCounts, Error>;

    async fn jobs_by_status(&self, queue: &str, status: JobStatus, limit: usize) -> Result<Vec<Job>, Error>;

    /// Removes jobs in `status` older than `older_than`, up to `limit`.
    /// Returns the count removed.
    async fn clean(
        &self,
        queue: &str,
        status: JobStatus,
        older_than: std::time::SystemTime,
        limit: usize,
    ) -> Result<usize, Error>;

    /// Reverts every `processing` job in `queue` back to `pending`,
    /// leaving `attempts` unchanged. Used by `stop()` when jobs are still
    /// in flight after the shutdown timeout.
    async fn revert_in_flight(&self, queue: &str) -> Result<usize, Error>;
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub delayed: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}
