//! The in-memory queue backend: a single process-wide mutex enforces the
//! atomic-claim property (§4.2.2's "exactly one worker... claims a given
//! job") the way a remote backend would rely on a native conditional
//! update.

use crate::backend::{QueueBackend, QueueCounts};
use crate::job::{Job, JobStatus};
use aegis_core::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Default)]
struct Store {
    jobs: HashMap<(String, String), Job>,
}

/// A `QueueBackend` that keeps every job in a `Mutex`-guarded map. Suitable
/// for a single process; state is lost on restart.
pub struct MemoryQueueBackend {
    store: Mutex<Store>,
}

impl MemoryQueueBackend {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::default()),
        }
    }
}

impl Default for MemoryQueueBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn ready_ordering_key(job: &Job) -> (i32, SystemTime, u64) {
    // priority DESC, earliest_run ASC, sequence ASC; negate priority so the
    // natural tuple ordering picks the highest priority first.
    (-job.priority, job.earliest_run, job.sequence)
}

#[async_trait]
impl QueueBackend for MemoryQueueBackend {
    async fn insert(&self, job: Job) -> Result<(), Error> {
        let mut store = self.store.lock().unwrap();
        store.jobs.insert((job.queue.clone(), job.id.clone()), job);
        Ok(())
    }

    async fn get(&self, queue: &str, id: &str) -> Result<Option<Job>, Error> {
        let store = self.store.lock().unwrap();
        Ok(store.jobs.get(&(queue.to_string(), id.to_string())).cloned())
    }

    async fn update_fields(
        &self,
        queue: &str,
        id: &str,
        progress: Option<u8>,
        payload: Option<serde_json::Value>,
    ) -> Result<bool, Error> {
        let mut store = self.store.lock().unwrap();
        match store.jobs.get_mut(&(queue.to_string(), id.to_string())) {
            Some(job) => {
                if let Some(progress) = progress {
                    job.progress = progress;
                }
                if let Some(payload) = payload {
                    job.payload = payload;
                }
                job.updated_at = SystemTime::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, queue: &str, id: &str) -> Result<bool, Error> {
        let mut store = self.store.lock().unwrap();
        Ok(store.jobs.remove(&(queue.to_string(), id.to_string())).is_some())
    }

    async fn claim_next_ready(&self, queue: &str) -> Result<Option<Job>, Error> {
        let mut store = self.store.lock().unwrap();
        let now = SystemTime::now();

        let candidate_key = store
            .jobs
            .values()
            .filter(|job| {
                job.queue == queue
                    && matches!(job.status, JobStatus::Pending)
                    && job.earliest_run <= now
            })
            .min_by_key(|job| ready_ordering_key(job))
            .map(|job| (job.queue.clone(), job.id.clone()));

        match candidate_key {
            Some(key) => {
                let job = store.jobs.get_mut(&key).unwrap();
                job.status = JobStatus::Processing;
                job.processed_at = Some(now);
                job.updated_at = now;
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn promote_delayed(&self, queue: &str) -> Result<usize, Error> {
        let mut store = self.store.lock().unwrap();
        let now = SystemTime::now();
        let mut promoted = 0;

        for job in store.jobs.values_mut() {
            if job.queue == queue && matches!(job.status, JobStatus::Delayed) && job.earliest_run <= now {
                job.status = JobStatus::Pending;
                job.updated_at = now;
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    async fn mark_completed(&self, queue: &str, id: &str, result: serde_json::Value) -> Result<(), Error> {
        let mut store = self.store.lock().unwrap();
        if let Some(job) = store.jobs.get_mut(&(queue.to_string(), id.to_string())) {
            let now = SystemTime::now();
            job.status = JobStatus::Completed;
            job.result = Some(result);
            job.completed_at = Some(now);
            job.updated_at = now;
        }
        Ok(())
    }

    async fn mark_failed_or_retry(
        &self,
        queue: &str,
        id: &str,
        attempts: u32,
        error: String,
        retry_at: Option<SystemTime>,
    ) -> Result<(), Error> {
        let mut store = self.store.lock().unwrap();
        if let Some(job) = store.jobs.get_mut(&(queue.to_string(), id.to_string())) {
            let now = SystemTime::now();
            job.attempts = attempts;
            job.error = Some(error);
            job.updated_at = now;
            match retry_at {
                Some(at) => {
                    job.earliest_run = at;
                    job.status = if at > now { JobStatus::Delayed } else { JobStatus::Pending };
                }
                None => {
                    job.status = JobStatus::Failed;
                    job.failed_at = Some(now);
                }
            }
        }
        Ok(())
    }

    async fn retry(&self, queue: &str, id: &str) -> Result<bool, Error> {
        let mut store = self.store.lock().unwrap();
        match store.jobs.get_mut(&(queue.to_string(), id.to_string())) {
            Some(job) if job.is_terminal() => {
                job.status = JobStatus::Pending;
                job.attempts = 0;
                job.error = None;
                job.earliest_run = SystemTime::now();
                job.updated_at = SystemTime::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn counts_by_status(&self, queue: &str) -> Result<QueueCounts, Error> {
        let store = self.store.lock().unwrap();
        let mut counts = QueueCounts::default();
        for job in store.jobs.values().filter(|j| j.queue == queue) {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Delayed => counts.delayed += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }

    async fn jobs_by_status(&self, queue: &str, status: JobStatus, limit: usize) -> Result<Vec<Job>, Error> {
        let store = self.store.lock().unwrap();
        let mut jobs: Vec<Job> = store
            .jobs
            .values()
            .filter(|j| j.queue == queue && j.status == status)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.sequence);
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn clean(
        &self,
        queue: &str,
        status: JobStatus,
        older_than: SystemTime,
        limit: usize,
    ) -> Result<usize, Error> {
        let mut store = self.store.lock().unwrap();
        let keys: Vec<(String, String)> = store
            .jobs
            .values()
            .filter(|j| j.queue == queue && j.status == status && j.updated_at < older_than)
            .take(limit)
            .map(|j| (j.queue.clone(), j.id.clone()))
            .collect();

        let removed = keys.len();
        for key in keys {
            store.jobs.remove(&key);
        }
        Ok(removed)
    }

    async fn revert_in_flight(&self, queue: &str) -> Result<usize, Error> {
        let mut store = self.store.lock().unwrap();
        let mut reverted = 0;
        for job in store.jobs.values_mut() {
            if job.queue == queue && matches!(job.status, JobStatus::Processing) {
                job.status = JobStatus::Pending;
                job.updated_at = SystemTime::now();
                reverted += 1;
            }
        }
        Ok(reverted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::BackoffSpec;

    fn sample_job(queue: &str, id: &str, priority: i32, sequence: u64) -> Job {
        let now = SystemTime::now();
        Job {
            id: id.to_string(),
            queue: queue.to_string(),
            payload: serde_json::json!({}),
            result: None,
            error: None,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: 3,
            priority,
            earliest_run: now,
            processed_at: None,
            completed_at: None,
            failed_at: None,
            created_at: now,
            updated_at: now,
            progress: 0,
            backoff: BackoffSpec::fixed_default(),
            max_backoff_delay_ms: 3600_000,
            missed: false,
            sequence,
        }
    }

    #[tokio::test]
    async fn claims_highest_priority_first() {
        let backend = MemoryQueueBackend::new();
        backend.insert(sample_job("q", "a", 0, 0)).await.unwrap();
        backend.insert(sample_job("q", "b", 10, 1)).await.unwrap();
        backend.insert(sample_job("q", "c", 5, 2)).await.unwrap();

        let first = backend.claim_next_ready("q").await.unwrap().unwrap();
        let second = backend.claim_next_ready("q").await.unwrap().unwrap();
        let third = backend.claim_next_ready("q").await.unwrap().unwrap();

        assert_eq!(first.id, "b");
        assert_eq!(second.id, "c");
        assert_eq!(third.id, "a");
    }

    #[tokio::test]
    async fn a_claimed_job_is_not_claimable_again() {
        let backend = MemoryQueueBackend::new();
        backend.insert(sample_job("q", "a", 0, 0)).await.unwrap();

        assert!(backend.claim_next_ready("q").await.unwrap().is_some());
        assert!(backend.claim_next_ready("q").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retry_resets_attempts_on_terminal_job_only() {
        let backend = MemoryQueueBackend::new();
        let mut job = sample_job("q", "a", 0, 0);
        job.status = JobStatus::Failed;
        job.attempts = 3;
        backend.insert(job).await.unwrap();

        assert!(backend.retry("q", "a").await.unwrap());
        let job = backend.get("q", "a").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn retry_fails_on_non_terminal_job() {
        let backend = MemoryQueueBackend::new();
        backend.insert(sample_job("q", "a", 0, 0)).await.unwrap();
        assert!(!backend.retry("q", "a").await.unwrap());
    }
}
