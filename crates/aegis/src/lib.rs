//! Cache, job queue, rate limiter, and security primitives for application
//! backends, under one facade.
//!
//! `aegis` provides infrastructure every backend eventually needs, as a
//! collection of independent subsystems. Each is available as both its own
//! crate and as a feature on this meta-crate.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! aegis = { version = "0.1", features = ["cache", "ratelimiter"] }
//! ```
//!
//! # Subsystems
//!
//! - **[Cache]** - Backend-agnostic key/value cache with TTL and single-flight get-or-compute
//! - **[Job Queue]** - At-least-once job processing with priorities, delays, retries, and backoff
//! - **[Rate Limiter]** - Fixed-window per-key request throttling with standard response headers
//! - **[Security]** - CSRF protection, AES-256-GCM encryption, and input sanitization
//!
//! [Cache]: #cache
//! [Job Queue]: #job-queue
//! [Rate Limiter]: #rate-limiter
//! [Security]: #security
//!
//! # Subsystem Guides
//!
//! ## Cache
//!
//! A namespaced key/value store with per-entry TTL, glob-pattern bulk
//! operations, and a single-flight `get_or_set` that collapses concurrent
//! misses for the same key into one backend call.
//!
//! ### When to Use
//!
//! - **Expensive computations**: memoize database queries or API calls
//! - **High read:write ratio**: data that changes far less often than it's read
//! - **Stampede protection**: many requests miss the same key at once
//!
//! ### Anti-Patterns
//!
//! ❌ **Caching errors**: only cache successful results
//! ✅ Let failures propagate; don't memoize a backend outage
//!
//! ❌ **No TTL**: stale data served forever
//! ✅ Set a TTL appropriate to how often the underlying value changes
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "cache")]
//! # {
//! use aegis::cache::{Cache, CacheConfig};
//! use aegis::cache::memory::{byte_len_size_fn, MemoryBackend};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), aegis_core::Error> {
//! let backend = MemoryBackend::new(1000, None, byte_len_size_fn, Duration::from_secs(30));
//! let cache = Cache::new(backend, CacheConfig::builder().build());
//! cache.set("user:42", &"Ada", Some(Duration::from_secs(300))).await?;
//! # Ok(())
//! # }
//! # }
//! ```
//!
//! ## Job Queue
//!
//! At-least-once background job processing: priorities, delayed execution,
//! retries with exponential backoff, bounded worker concurrency, and
//! pause/resume per queue.
//!
//! ### When to Use
//!
//! - **Deferred work**: email sends, webhook deliveries, report generation
//! - **Bounded fan-out**: limit how many jobs of one kind run concurrently
//! - **Unreliable downstreams**: retries with backoff absorb transient failures
//!
//! ### Anti-Patterns
//!
//! ❌ **Non-idempotent handlers**: at-least-once delivery means a handler can
//! run more than once for the same job
//! ✅ Make handlers safe to re-run, or dedupe on a stable job key
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "queue")]
//! # {
//! use aegis::queue::{JobQueue, JobQueueConfig, JobOptions};
//! use aegis::queue::memory::MemoryQueueBackend;
//!
//! # async fn example() -> Result<(), aegis_core::Error> {
//! let queue = JobQueue::new(MemoryQueueBackend::new(), JobQueueConfig::builder().build());
//! queue.add("emails", serde_json::json!({"to": "ada@example.com"}), JobOptions::default()).await?;
//! # Ok(())
//! # }
//! # }
//! ```
//!
//! ## Rate Limiter
//!
//! Fixed-window per-key request counting with the standard
//! `X-RateLimit-Limit`/`X-RateLimit-Remaining`/`X-RateLimit-Reset` response
//! headers and a `Retry-After` on rejection.
//!
//! ### When to Use
//!
//! - **Quota enforcement**: per-IP or per-API-key request limits
//! - **Abuse protection**: bound how fast an anonymous client can hit an endpoint
//!
//! ### Anti-Patterns
//!
//! ❌ **Using for concurrency limits**: a fixed window limits throughput, not
//! how many requests run at once
//! ✅ Use a semaphore or worker pool for concurrency; use this for rate
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "ratelimiter")]
//! # {
//! use aegis::ratelimiter::{RateLimiter, RateLimiterConfig};
//! use aegis_core::http::{TestRequest, TestResponse};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(
//!     RateLimiterConfig::builder().max_requests(100).window(Duration::from_secs(60)).build().unwrap(),
//! );
//! let req = TestRequest::default();
//! let mut resp = TestResponse::default();
//! let _outcome = limiter.check(&req, &mut resp).await;
//! # }
//! # }
//! ```
//!
//! ## Security
//!
//! CSRF token issuance/verification, AES-256-GCM field-level encryption,
//! and HTML/text sanitization, each resolved from its own documented
//! environment variables.
//!
//! ### When to Use
//!
//! - **Form-based mutations**: protect state-changing requests behind a
//!   per-session CSRF token
//! - **At-rest sensitive fields**: encrypt values before they reach storage
//! - **User-supplied HTML/text**: strip dangerous markup before rendering
//!
//! ### Anti-Patterns
//!
//! ❌ **Skipping CSRF on safe methods only by convention**: always use
//! [`csrf_middleware`](security::csrf_middleware), which already exempts
//! `GET`/`HEAD`/`OPTIONS`
//!
//! ❌ **Rolling a custom comparison for tokens**: use the constant-time
//! verification this crate already does; a `==` on secrets leaks timing
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "security")]
//! # {
//! use aegis::security::encryption::{encrypt, decrypt};
//!
//! # fn example(key: &[u8]) -> Result<(), aegis_core::Error> {
//! let envelope = encrypt(b"ssn: 000-00-0000", key, b"")?;
//! let plaintext = decrypt(&envelope, key, b"")?;
//! assert_eq!(plaintext, b"ssn: 000-00-0000");
//! # Ok(())
//! # }
//! # }
//! ```
//!
//! # Composition
//!
//! These subsystems are designed to sit together at the edge of a service:
//!
//! ```text
//! ┌─────────────┐
//! │   Request   │
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────────┐
//! │  Rate Limiter   │ ← reject abusive clients, set X-RateLimit-* headers
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  CSRF Middleware│ ← verify state-changing requests
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │      Cache      │ ← serve hot reads without touching the backend
//! └────────┬────────┘
//!          │ (miss)
//!          ▼
//! ┌─────────────────┐
//! │     Handler      │ → enqueues follow-up work onto the Job Queue
//! └─────────────────┘
//! ```
//!
//! Every subsystem is independent: enabling `cache` does not pull in
//! `queue`, `ratelimiter`, or `security`, and each can be used standalone
//! through its own crate (`aegis-cache`, `aegis-queue`,
//! `aegis-ratelimiter`, `aegis-security`).
//!
//! # Observability
//!
//! Every subsystem logs through `tracing` and exposes an event bus
//! (`aegis_core::EventListeners`) subsystem code can register listeners
//! on — see `CacheEvent`, `QueueEvent`, `RateLimiterEvent` in their
//! respective crates. With the `metrics` feature enabled on this crate
//! (and on the subsystem crates that support it), each additionally
//! records Prometheus-compatible counters and gauges.

// Re-export core (always available)
pub use aegis_core as core;

// Re-export subsystems based on features
#[cfg(feature = "cache")]
pub use aegis_cache as cache;

#[cfg(feature = "queue")]
pub use aegis_queue as queue;

#[cfg(feature = "ratelimiter")]
pub use aegis_ratelimiter as ratelimiter;

#[cfg(feature = "security")]
pub use aegis_security as security;
