//! The fixed-window counting algorithm (spec §4.3.1 steps 2-4).

use crate::store::{RateLimitRecord, RateLimitStore};
use std::time::{Duration, Instant};

/// The outcome of checking and incrementing one client key's record.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub count: u64,
    pub max_requests: u64,
    pub reset_at: Instant,
    pub allowed: bool,
}

impl Decision {
    pub fn remaining(&self) -> u64 {
        self.max_requests.saturating_sub(self.count)
    }

    pub fn retry_after(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Looks up (or lazily creates) the record for `key`, resets it if the
/// window has elapsed, increments the count, and reports whether this
/// request is within the limit.
///
/// This is a read-modify-write, not an atomic increment — the store
/// contract (§4.3.2) does not require atomicity, so concurrent callers on
/// a distributed store may over-count slightly under contention. The
/// in-memory store serializes this through the map's single mutex, which
/// removes the race for the default, single-process deployment.
pub async fn check_and_increment(
    store: &dyn RateLimitStore,
    key: &str,
    max_requests: u64,
    window: Duration,
) -> Decision {
    let now = Instant::now();

    let mut record = match store.get(key).await {
        Some(record) if record.reset_at > now => record,
        _ => RateLimitRecord {
            count: 0,
            reset_at: now + window,
        },
    };

    record.count += 1;
    store.set(key, record).await;

    Decision {
        count: record.count,
        max_requests,
        reset_at: record.reset_at,
        allowed: record.count <= max_requests,
    }
}
