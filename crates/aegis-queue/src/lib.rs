//! An at-least-once job processing engine with priorities, delayed
//! execution, retries with backoff, bounded concurrency, pause/resume, and
//! cron-style recurring jobs.
//!
//! ```
//! use aegis_queue::{JobQueue, JobQueueConfig, JobOptions, HandlerOutcome, ProcessOptions};
//! use aegis_queue::memory::MemoryQueueBackend;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), aegis_core::Error> {
//! let queue = JobQueue::new(MemoryQueueBackend::new(), JobQueueConfig::builder().build());
//!
//! queue.add("emails", serde_json::json!({"to": "a@example.com"}), JobOptions::default()).await?;
//!
//! queue.process("emails", ProcessOptions::default(), |job| {
//!     Box::pin(async move {
//!         println!("sending to {:?}", job.payload);
//!         HandlerOutcome::Completed(serde_json::json!({"sent": true}))
//!     })
//! });
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod events;
pub mod job;
pub mod memory;
pub mod schedule;

pub use backend::{QueueBackend, QueueCounts};
pub use config::{JobQueueConfig, QueueBackendKind};
pub use dispatcher::{Handler, HandlerOutcome, ProcessOptions};
pub use events::QueueEvent;
pub use job::{BackoffSpec, Job, JobOptions, JobStatus};
pub use schedule::{CronSchedule, RecurringJob, ScheduleExpression};

use aegis_core::{Error, EventListeners};
use dispatcher::Dispatcher;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// The job queue facade: owns one backend, a dispatcher per queue name
/// that has called [`JobQueue::process`], and (optionally) a recurring
/// job scheduler.
pub struct JobQueue {
    backend: Arc<dyn QueueBackend>,
    config: JobQueueConfig,
    events: Arc<EventListeners<QueueEvent>>,
    dispatchers: Mutex<HashMap<String, Arc<Dispatcher>>>,
    /// Queues paused before their dispatcher existed (e.g. `pause()` called
    /// ahead of `process()`). Consulted as the dispatcher's initial state
    /// so pause/resume order doesn't depend on call order relative to
    /// `process()`.
    paused_queues: Mutex<HashSet<String>>,
    sequence: AtomicU64,
    scheduler: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl JobQueue {
    pub fn new(backend: impl QueueBackend + 'static, config: JobQueueConfig) -> Arc<Self> {
        Arc::new(Self {
            backend: Arc::new(backend),
            config,
            events: Arc::new(EventListeners::new()),
            dispatchers: Mutex::new(HashMap::new()),
            paused_queues: Mutex::new(HashSet::new()),
            sequence: AtomicU64::new(0),
            scheduler: Mutex::new(None),
        })
    }

    /// Registers a listener for job lifecycle events (`started`/
    /// `progress`/`completed`/`failed`). Must be called on a queue with no
    /// other `Arc` clones outstanding yet, i.e. right after [`JobQueue::new`]
    /// and before the queue is handed to [`JobQueue::process`] callers.
    pub fn on_event<L>(queue: &mut Arc<Self>, listener: L)
    where
        L: aegis_core::EventListener<QueueEvent> + 'static,
    {
        let this = Arc::get_mut(queue)
            .expect("on_event must be called before the queue is cloned/shared");
        Arc::get_mut(&mut this.events)
            .expect("on_event must be called before the queue is cloned/shared")
            .add(listener);
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Enqueues a job for immediate (or delayed, via `options.delay`)
    /// dispatch. Returns the generated job id.
    pub async fn add(
        &self,
        queue: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<String, Error> {
        let now = SystemTime::now();
        let earliest_run = now + options.delay;
        let status = if options.delay.is_zero() {
            JobStatus::Pending
        } else {
            JobStatus::Delayed
        };

        let id = uuid::Uuid::new_v4().to_string();
        let job = Job {
            id: id.clone(),
            queue: queue.to_string(),
            payload,
            result: None,
            error: None,
            status,
            attempts: 0,
            max_attempts: options.max_attempts.unwrap_or(self.config.default_max_attempts),
            priority: options.priority,
            earliest_run,
            processed_at: None,
            completed_at: None,
            failed_at: None,
            created_at: now,
            updated_at: now,
            progress: 0,
            backoff: options.backoff.unwrap_or(BackoffSpec::Fixed {
                base_delay_ms: self.config.default_backoff_base_ms,
            }),
            max_backoff_delay_ms: options.max_backoff_delay.as_millis() as u64,
            missed: false,
            sequence: self.next_sequence(),
        };

        self.backend.insert(job).await?;
        Ok(id)
    }

    /// Equivalent to `add` with `options.delay` set to `delay`.
    pub async fn schedule(
        &self,
        queue: &str,
        payload: serde_json::Value,
        delay: std::time::Duration,
        mut options: JobOptions,
    ) -> Result<String, Error> {
        options.delay = delay;
        self.add(queue, payload, options).await
    }

    /// Registers a worker for `queue`. Returns immediately; the dispatch
    /// loop and delayed-job promoter run as background tasks. Calling this
    /// twice for the same queue replaces the previous dispatcher.
    pub fn process<F>(self: &Arc<Self>, queue: &str, options: ProcessOptions, handler: F)
    where
        F: Fn(Job) -> std::pin::Pin<Box<dyn std::future::Future<Output = HandlerOutcome> + Send>>
            + Send
            + Sync
            + 'static,
    {
        let initial_paused = self.paused_queues.lock().unwrap().contains(queue);
        let concurrency = options.concurrency.unwrap_or(self.config.default_concurrency);
        let dispatcher = Dispatcher::spawn(
            queue.to_string(),
            Arc::clone(&self.backend),
            Arc::clone(&self.events),
            Arc::new(handler),
            concurrency,
            initial_paused,
            self.config.retain_completed,
        );

        self.dispatchers
            .lock()
            .unwrap()
            .insert(queue.to_string(), Arc::new(dispatcher));
    }

    pub async fn get_job(&self, queue: &str, id: &str) -> Result<Option<Job>, Error> {
        self.backend.get(queue, id).await
    }

    /// Updates the user-writable fields of a job (`progress`, `data`).
    /// Attempts and timestamps are never user-writable (§4.2.1).
    pub async fn update_job(
        &self,
        queue: &str,
        id: &str,
        progress: Option<u8>,
        data: Option<serde_json::Value>,
    ) -> Result<bool, Error> {
        let updated = self.backend.update_fields(queue, id, progress, data).await?;
        if updated {
            if let Some(percent) = progress {
                self.events.emit(&QueueEvent::Progress {
                    queue: queue.to_string(),
                    job_id: id.to_string(),
                    percent,
                    timestamp: std::time::Instant::now(),
                });
            }
        }
        Ok(updated)
    }

    pub async fn remove_job(&self, queue: &str, id: &str) -> Result<bool, Error> {
        self.backend.remove(queue, id).await
    }

    /// Pauses dispatch for `queue`, or every registered queue if `None`.
    /// In-flight jobs run to completion.
    pub fn pause(&self, queue: Option<&str>) {
        let dispatchers = self.dispatchers.lock().unwrap();
        match queue {
            Some(queue) => {
                self.paused_queues.lock().unwrap().insert(queue.to_string());
                if let Some(d) = dispatchers.get(queue) {
                    d.pause();
                }
            }
            None => {
                let mut paused_queues = self.paused_queues.lock().unwrap();
                for (name, d) in dispatchers.iter() {
                    paused_queues.insert(name.clone());
                    d.pause();
                }
            }
        }
    }

    pub fn resume(&self, queue: Option<&str>) {
        let dispatchers = self.dispatchers.lock().unwrap();
        match queue {
            Some(queue) => {
                self.paused_queues.lock().unwrap().remove(queue);
                if let Some(d) = dispatchers.get(queue) {
                    d.resume();
                }
            }
            None => {
                let mut paused_queues = self.paused_queues.lock().unwrap();
                paused_queues.clear();
                dispatchers.values().for_each(|d| d.resume());
            }
        }
    }

    pub async fn get_queue_info(&self, queue: &str) -> Result<QueueCounts, Error> {
        self.backend.counts_by_status(queue).await
    }

    pub async fn get_jobs_by_status(
        &self,
        queue: &str,
        status: JobStatus,
        limit: usize,
    ) -> Result<Vec<Job>, Error> {
        self.backend.jobs_by_status(queue, status, limit).await
    }

    /// Moves a terminal job back to `pending` with `attempts = 0`. `false`
    /// if the job is absent or not yet terminal (Conflict in spirit, not
    /// surfaced as an error per the Non-goal-free public contract).
    pub async fn retry(&self, queue: &str, id: &str) -> Result<bool, Error> {
        self.backend.retry(queue, id).await
    }

    pub async fn clean(
        &self,
        queue: &str,
        older_than: SystemTime,
        status: JobStatus,
        limit: usize,
    ) -> Result<usize, Error> {
        self.backend.clean(queue, status, older_than, limit).await
    }

    /// Registers a recurring job and starts (on first call) the scheduler
    /// loop that evaluates every registered schedule once per second.
    pub fn add_recurring(self: &Arc<Self>, recurring: RecurringJob) {
        // A minimal viable scheduler: each recurring job owns its own
        // tokio task. This keeps per-job schedule state (last_fired)
        // local instead of threading a shared registry through a single
        // loop, at the cost of one task per recurring job.
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            let mut recurring = recurring;
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                interval.tick().await;
                let now = chrono::Utc::now();
                if let Some((fire_time, missed)) = recurring.due_firing(now, chrono::Duration::seconds(60)) {
                    let mut options = recurring.options.clone();
                    let mut payload = recurring.payload.clone();
                    if missed {
                        if let serde_json::Value::Object(ref mut map) = payload {
                            map.insert("missed".to_string(), serde_json::Value::Bool(true));
                        }
                    }
                    options.delay = std::time::Duration::ZERO;
                    let _ = queue.add(&recurring.queue, payload, options).await;
                    recurring.last_fired = Some(fire_time);
                }
            }
        });
    }

    /// Stops dispatch on every registered queue: waits up to
    /// `config.shutdown_timeout` for in-flight jobs, then returns.
    /// Jobs still `processing` after the timeout revert to `pending` with
    /// `attempts` unchanged.
    pub async fn stop(&self) {
        let dispatchers: Vec<Arc<Dispatcher>> = self.dispatchers.lock().unwrap().values().cloned().collect();
        for dispatcher in dispatchers {
            dispatcher.stop(self.config.shutdown_timeout).await;
        }
    }
}
