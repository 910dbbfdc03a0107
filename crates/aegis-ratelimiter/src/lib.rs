//! An HTTP-middleware rate limiter with fixed-window per-key counters and
//! standard response headers (spec §4.3).
//!
//! ```
//! use aegis_ratelimiter::RateLimiter;
//! use aegis_core::http::{TestRequest, TestResponse};
//! use aegis_core::MiddlewareOutcome;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(
//!     aegis_ratelimiter::RateLimiterConfig::builder()
//!         .max_requests(2)
//!         .window(Duration::from_secs(60))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let req = TestRequest { remote_addr: Some("1.2.3.4".into()), ..Default::default() };
//! let mut resp = TestResponse::default();
//! let outcome = limiter.check(&req, &mut resp).await;
//! assert!(matches!(outcome, MiddlewareOutcome::Continue));
//! assert_eq!(resp.headers.get("X-RateLimit-Remaining").unwrap(), "1");
//! # }
//! ```

pub mod config;
pub mod events;
pub mod limiter;
pub mod store;

pub use config::{KeyFunction, RateLimiterConfig, RateLimiterConfigBuilder};
pub use events::RateLimiterEvent;
pub use store::{InMemoryStore, RateLimitRecord, RateLimitStore};

use aegis_core::http::{ErrorResponseBody, HttpRequest, HttpResponse, MiddlewareOutcome};
use aegis_core::EventListeners;
use std::sync::Arc;

/// The rate limiter facade: owns a key-derivation function and a record
/// store, and produces a [`MiddlewareOutcome`] per request.
pub struct RateLimiter {
    config: RateLimiterConfig,
    events: Arc<EventListeners<RateLimiterEvent>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            events: Arc::new(EventListeners::new()),
        }
    }

    /// Registers a listener for `allowed`/`rejected` decisions. Must be
    /// called before the limiter is cloned or shared across tasks.
    pub fn on_event<L>(&mut self, listener: L)
    where
        L: aegis_core::EventListener<RateLimiterEvent> + 'static,
    {
        Arc::get_mut(&mut self.events)
            .expect("on_event must be called before the limiter is cloned/shared")
            .add(listener);
    }

    /// Runs one request through the limiter: derives the client key,
    /// increments its window counter, sets the standard
    /// `X-RateLimit-*`/`Retry-After` headers, and reports whether to
    /// continue or reject with 429 (spec §4.3.1 steps 1-6).
    pub async fn check<R: HttpRequest, W: HttpResponse>(&self, req: &R, resp: &mut W) -> MiddlewareOutcome {
        let key = (self.config.key_function)(req);
        let decision = limiter::check_and_increment(
            self.config.store.as_ref(),
            &key,
            self.config.max_requests,
            self.config.window,
        )
        .await;

        resp.set_header("X-RateLimit-Limit", decision.max_requests.to_string());
        resp.set_header("X-RateLimit-Remaining", decision.remaining().to_string());
        resp.set_header(
            "X-RateLimit-Reset",
            unix_seconds_from_now(decision.reset_at).to_string(),
        );

        if decision.allowed {
            self.events.emit(&RateLimiterEvent::Allowed {
                key,
                count: decision.count,
                limit: decision.max_requests,
                timestamp: std::time::Instant::now(),
            });
            return MiddlewareOutcome::Continue;
        }

        let retry_after = decision.retry_after();
        let retry_after_secs = retry_after.as_millis().div_ceil(1000).max(1) as u64;
        resp.set_header("Retry-After", retry_after_secs.to_string());

        self.events.emit(&RateLimiterEvent::Rejected {
            key,
            retry_after,
            timestamp: std::time::Instant::now(),
        });

        MiddlewareOutcome::Reject {
            status: 429,
            body: ErrorResponseBody {
                error: "rate_limited",
                message: self.config.message.clone(),
                details: Some(serde_json::json!({ "retryAfterSeconds": retry_after_secs })),
            },
        }
    }
}

/// Converts a monotonic [`std::time::Instant`] reset deadline into a
/// UNIX-epoch second count, the unit spec §4.3.1 step 4 requires for
/// `X-RateLimit-Reset`.
fn unix_seconds_from_now(reset_at: std::time::Instant) -> u64 {
    let remaining = reset_at.saturating_duration_since(std::time::Instant::now());
    let now_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    (now_epoch + remaining).as_secs()
}
