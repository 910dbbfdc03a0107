//! Runs a request through a rate limiter, a cache, and the job queue, the
//! way these three subsystems are meant to sit together at a service edge.
//!
//! Requires: `cargo run --example combined --features full`

use aegis::cache::memory::{byte_len_size_fn, MemoryBackend as CacheBackend};
use aegis::cache::{Cache, CacheConfig};
use aegis::queue::memory::MemoryQueueBackend;
use aegis::queue::{HandlerOutcome, JobOptions, JobQueue, JobQueueConfig, ProcessOptions};
use aegis::ratelimiter::{RateLimiter, RateLimiterConfig};
use aegis_core::http::{TestRequest, TestResponse};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let limiter = RateLimiter::new(
        RateLimiterConfig::builder()
            .max_requests(5)
            .window(Duration::from_secs(60))
            .build()
            .expect("valid rate limiter config"),
    );

    let cache_backend = CacheBackend::new(1000, None, byte_len_size_fn, Duration::from_secs(30));
    let cache = Cache::new(cache_backend, CacheConfig::builder().build());

    let queue = JobQueue::new(MemoryQueueBackend::new(), JobQueueConfig::builder().build());
    queue.process("welcome-emails", ProcessOptions::default(), |job| {
        Box::pin(async move {
            println!("sending welcome email: {:?}", job.payload);
            HandlerOutcome::Completed(serde_json::json!({"sent": true}))
        })
    });

    let request = TestRequest {
        method: "GET".to_string(),
        remote_addr: Some("203.0.113.7".to_string()),
        ..Default::default()
    };

    let mut response = TestResponse::default();
    match limiter.check(&request, &mut response).await {
        aegis_core::MiddlewareOutcome::Continue => {
            let profile: String = cache
                .get_or_set(
                    "user:42:profile",
                    || async {
                        println!("cache miss, loading profile from \"database\"");
                        Ok("Ada Lovelace".to_string())
                    },
                    Some(Duration::from_secs(300)),
                )
                .await
                .expect("cache available");
            println!("profile: {profile}");

            queue
                .add(
                    "welcome-emails",
                    serde_json::json!({"to": "ada@example.com"}),
                    JobOptions::default(),
                )
                .await
                .expect("queue available");
        }
        aegis_core::MiddlewareOutcome::Reject { status, body } => {
            println!("rejected with {status}: {}", body.message);
        }
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
}
