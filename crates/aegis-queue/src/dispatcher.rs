//! The per-queue dispatch loop: bounded concurrency via a semaphore,
//! pause/resume, delayed-job promotion, and the retry/backoff decision on
//! handler failure (§4.2.2, §4.2.3, §4.2.6).

use crate::backend::QueueBackend;
use crate::events::QueueEvent;
use crate::job::{Job, JobStatus};
use aegis_core::EventListeners;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// The outcome a handler reports for a job. `NonRetryable` skips straight
/// to `failed` regardless of remaining attempts, per §4.2.2 step 2.
pub enum HandlerOutcome {
    Completed(serde_json::Value),
    Retryable(String),
    NonRetryable(String),
}

pub type Handler =
    Arc<dyn Fn(Job) -> Pin<Box<dyn Future<Output = HandlerOutcome> + Send>> + Send + Sync>;

/// Options for [`crate::JobQueue::process`].
///
/// `concurrency: None` falls back to the queue's `JobQueueConfig`
/// (`default_concurrency`, resolved from `QUEUE_CONCURRENCY` per §6.1)
/// rather than a literal baked into this type.
#[derive(Default)]
pub struct ProcessOptions {
    pub concurrency: Option<usize>,
}

pub(crate) struct Dispatcher {
    queue: String,
    backend: Arc<dyn QueueBackend>,
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    promoter: tokio::task::JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl Dispatcher {
    pub(crate) fn spawn(
        queue: String,
        backend: Arc<dyn QueueBackend>,
        events: Arc<EventListeners<QueueEvent>>,
        handler: Handler,
        concurrency: usize,
        initial_paused: bool,
        retain_completed: bool,
    ) -> Self {
        let paused = Arc::new(AtomicBool::new(initial_paused));
        let stopped = Arc::new(AtomicBool::new(false));
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let promoter = {
            let backend = Arc::clone(&backend);
            let queue = queue.clone();
            let stopped = Arc::clone(&stopped);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(500));
                loop {
                    interval.tick().await;
                    if stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    let _ = backend.promote_delayed(&queue).await;
                }
            })
        };

        let worker = {
            let backend = Arc::clone(&backend);
            let events = Arc::clone(&events);
            let queue_name = queue.clone();
            let paused = Arc::clone(&paused);
            let stopped = Arc::clone(&stopped);
            let semaphore = Arc::clone(&semaphore);

            tokio::spawn(async move {
                loop {
                    if stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    if paused.load(Ordering::SeqCst) {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }

                    let permit = match Arc::clone(&semaphore).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };

                    let job = match backend.claim_next_ready(&queue_name).await {
                        Ok(Some(job)) => job,
                        Ok(None) => {
                            drop(permit);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            continue;
                        }
                        Err(_) => {
                            drop(permit);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            continue;
                        }
                    };

                    let backend = Arc::clone(&backend);
                    let events = Arc::clone(&events);
                    let handler = Arc::clone(&handler);
                    let queue_name = queue_name.clone();

                    tokio::spawn(async move {
                        let _permit = permit;
                        run_job(backend, events, &queue_name, job, handler, retain_completed).await;
                    });
                }
            })
        };

        Self {
            queue,
            backend,
            paused,
            stopped,
            promoter,
            worker,
        }
    }
}

impl Drop for Dispatcher {
    /// Aborts the worker/promoter tasks when the last handle to this
    /// dispatcher goes away — e.g. when [`crate::JobQueue::process`]
    /// replaces a queue's dispatcher, the old `Arc<Dispatcher>` dropped
    /// out of the map would otherwise keep claiming and running jobs
    /// alongside the new one forever.
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.promoter.abort();
        self.worker.abort();
    }
}

impl Dispatcher {
    pub(crate) fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub(crate) fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Stops dispatch, waiting up to `shutdown_timeout` for in-flight jobs
    /// (tracked by outstanding semaphore permits) to finish; anything still
    /// in flight afterward reverts to `pending` with `attempts` unchanged.
    pub(crate) async fn stop(&self, shutdown_timeout: Duration) {
        self.stopped.store(true, Ordering::SeqCst);
        self.promoter.abort();
        self.worker.abort();

        let deadline = Instant::now() + shutdown_timeout;
        loop {
            let counts = self.backend.counts_by_status(&self.queue).await.unwrap_or_default();
            if counts.processing == 0 || Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let _ = self.backend.revert_in_flight(&self.queue).await;
    }
}

async fn run_job(
    backend: Arc<dyn QueueBackend>,
    events: Arc<EventListeners<QueueEvent>>,
    queue: &str,
    job: Job,
    handler: Handler,
    retain_completed: bool,
) {
    events.emit(&QueueEvent::Started {
        queue: queue.to_string(),
        job_id: job.id.clone(),
        timestamp: Instant::now(),
    });

    let job_id = job.id.clone();
    let attempts = job.attempts + 1;
    let max_attempts = job.max_attempts;
    let backoff = job.backoff;
    let max_backoff_delay_ms = job.max_backoff_delay_ms;

    match handler(job).await {
        HandlerOutcome::Completed(result) => {
            let _ = backend.mark_completed(queue, &job_id, result).await;
            events.emit(&QueueEvent::Completed {
                queue: queue.to_string(),
                job_id: job_id.clone(),
                timestamp: Instant::now(),
            });
            if !retain_completed {
                let _ = backend.remove(queue, &job_id).await;
            }
        }
        HandlerOutcome::NonRetryable(error) => {
            let _ = backend
                .mark_failed_or_retry(queue, &job_id, attempts, error.clone(), None)
                .await;
            events.emit(&QueueEvent::Failed {
                queue: queue.to_string(),
                job_id: job_id.clone(),
                error,
                timestamp: Instant::now(),
            });
            if !retain_completed {
                let _ = backend.remove(queue, &job_id).await;
            }
        }
        HandlerOutcome::Retryable(error) => {
            if attempts >= max_attempts {
                let _ = backend
                    .mark_failed_or_retry(queue, &job_id, attempts, error.clone(), None)
                    .await;
                events.emit(&QueueEvent::Failed {
                    queue: queue.to_string(),
                    job_id: job_id.clone(),
                    error,
                    timestamp: Instant::now(),
                });
                if !retain_completed {
                    let _ = backend.remove(queue, &job_id).await;
                }
            } else {
                let delay = backoff.delay_for(attempts, max_backoff_delay_ms);
                let retry_at = SystemTime::now() + delay;
                let _ = backend
                    .mark_failed_or_retry(queue, &job_id, attempts, error, Some(retry_at))
                    .await;
            }
        }
    }
}
