//! Rate limiter observability events.

use aegis_core::AegisEvent;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    Allowed { key: String, count: u64, limit: u64, timestamp: Instant },
    Rejected { key: String, retry_after: Duration, timestamp: Instant },
}

impl AegisEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::Allowed { .. } => "allowed",
            RateLimiterEvent::Rejected { .. } => "rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::Allowed { timestamp, .. } => *timestamp,
            RateLimiterEvent::Rejected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RateLimiterEvent::Allowed { key, .. } => key,
            RateLimiterEvent::Rejected { key, .. } => key,
        }
    }
}
