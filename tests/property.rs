//! Property-based tests across the workspace's invariants.
//!
//! Run with: cargo test --test property
//!
//! Uses proptest to generate random inputs and check a couple of
//! invariants that are awkward to pin down with a handful of example
//! cases: the rate limiter's hard cap under an arbitrary request count,
//! and the backoff formulas' monotonicity and cap.

use aegis_core::http::{TestRequest, TestResponse};
use aegis_core::MiddlewareOutcome;
use aegis_queue::BackoffSpec;
use aegis_ratelimiter::{RateLimiter, RateLimiterConfig};
use proptest::prelude::*;
use std::time::Duration;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: a fixed-window limiter never lets more than `max_requests`
    /// through within a single window, no matter how many requests arrive.
    #[test]
    fn rate_limiter_never_exceeds_max_within_a_window(
        max_requests in 1u64..=20,
        num_requests in 1usize..=100,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let limiter = RateLimiter::new(
                RateLimiterConfig::builder()
                    .max_requests(max_requests)
                    .window(Duration::from_secs(60))
                    .build()
                    .unwrap(),
            );

            let req = TestRequest {
                remote_addr: Some("198.51.100.7".to_string()),
                ..Default::default()
            };

            let mut accepted = 0u64;
            for _ in 0..num_requests {
                let mut resp = TestResponse::default();
                if matches!(limiter.check(&req, &mut resp).await, MiddlewareOutcome::Continue) {
                    accepted += 1;
                }
            }

            prop_assert!(
                accepted <= max_requests,
                "accepted {accepted} requests but the limit was {max_requests}"
            );
            Ok(())
        })?;
    }

    /// Property: every backoff kind is capped at `max_delay_ms`, and
    /// linear/exponential backoff never produce a shorter delay for a
    /// later attempt.
    #[test]
    fn backoff_is_capped_and_non_decreasing(
        base_delay_ms in 1u64..=5_000,
        max_delay_ms in 1u64..=60_000,
        attempts in 1u32..=20,
    ) {
        for backoff in [
            BackoffSpec::Fixed { base_delay_ms },
            BackoffSpec::Linear { base_delay_ms },
            BackoffSpec::Exponential { base_delay_ms },
        ] {
            let this = backoff.delay_for(attempts, max_delay_ms);
            let next = backoff.delay_for(attempts + 1, max_delay_ms);

            prop_assert!(this.as_millis() as u64 <= max_delay_ms);
            prop_assert!(next.as_millis() as u64 <= max_delay_ms);
            prop_assert!(next >= this, "{backoff:?} produced a shorter delay for a later attempt");
        }
        Ok(())
    }
}
