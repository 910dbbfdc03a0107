//! Job queue configuration, resolved per §6.1's explicit-argument >
//! environment-variable > built-in-default precedence.

use aegis_core::config::{resolve, resolve_duration_ms};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackendKind {
    Memory,
    RemoteKv,
    Database,
}

impl std::str::FromStr for QueueBackendKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "remote-kv" => Ok(Self::RemoteKv),
            "db" => Ok(Self::Database),
            _ => Err(()),
        }
    }
}

/// Queue-wide defaults applied when a caller's [`crate::JobOptions`]/
/// `process` options omit a field.
#[derive(Debug, Clone)]
pub struct JobQueueConfig {
    pub backend: QueueBackendKind,
    pub url: Option<String>,
    pub default_concurrency: usize,
    pub default_max_attempts: u32,
    pub default_backoff_base_ms: u64,
    pub shutdown_timeout: Duration,
    /// Resolves Open Question #1: whether the database backend keeps
    /// completed/failed jobs until an explicit `clean()` call, or removes
    /// them immediately. This crate defaults to retaining them.
    pub retain_completed: bool,
}

impl JobQueueConfig {
    pub fn builder() -> JobQueueConfigBuilder {
        JobQueueConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct JobQueueConfigBuilder {
    backend: Option<QueueBackendKind>,
    url: Option<String>,
    default_concurrency: Option<usize>,
    default_max_attempts: Option<u32>,
    default_backoff_base_ms: Option<u64>,
    shutdown_timeout: Option<Duration>,
    retain_completed: Option<bool>,
}

impl JobQueueConfigBuilder {
    pub fn backend(mut self, backend: QueueBackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn default_concurrency(mut self, concurrency: usize) -> Self {
        self.default_concurrency = Some(concurrency);
        self
    }

    pub fn default_max_attempts(mut self, max_attempts: u32) -> Self {
        self.default_max_attempts = Some(max_attempts);
        self
    }

    pub fn default_backoff_base_ms(mut self, ms: u64) -> Self {
        self.default_backoff_base_ms = Some(ms);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    pub fn retain_completed(mut self, retain: bool) -> Self {
        self.retain_completed = Some(retain);
        self
    }

    pub fn build(self) -> JobQueueConfig {
        let shutdown_timeout = resolve_duration_ms(
            self.shutdown_timeout,
            "QUEUE_SHUTDOWN_TIMEOUT_MS",
            Duration::from_millis(30_000),
        );

        JobQueueConfig {
            backend: resolve(self.backend, "QUEUE_BACKEND", QueueBackendKind::Memory),
            url: self.url.or_else(|| std::env::var("QUEUE_URL").ok()),
            default_concurrency: resolve(self.default_concurrency, "QUEUE_CONCURRENCY", 1),
            default_max_attempts: resolve(self.default_max_attempts, "QUEUE_MAX_ATTEMPTS", 3),
            default_backoff_base_ms: resolve(self.default_backoff_base_ms, "QUEUE_BACKOFF_BASE_MS", 1000),
            shutdown_timeout,
            retain_completed: self.retain_completed.unwrap_or(true),
        }
    }
}
