//! Cache observability events.

use aegis_core::AegisEvent;
use std::time::Instant;

/// Lifecycle events emitted by a [`crate::Cache`] instance.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// `get` (or the fast path of `getOrSet`) found a live entry.
    Hit { name: String, timestamp: Instant },
    /// `get` found no live entry.
    Miss { name: String, timestamp: Instant },
    /// An entry was evicted to satisfy the backend's capacity bounds.
    Eviction { name: String, timestamp: Instant },
    /// `set` (or a `getOrSet` factory) wrote a new entry.
    Set { name: String, timestamp: Instant },
    /// `delete` removed a live entry.
    Delete { name: String, timestamp: Instant },
}

impl AegisEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Eviction { .. } => "eviction",
            CacheEvent::Set { .. } => "set",
            CacheEvent::Delete { .. } => "delete",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. }
            | CacheEvent::Set { timestamp, .. }
            | CacheEvent::Delete { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CacheEvent::Hit { name, .. }
            | CacheEvent::Miss { name, .. }
            | CacheEvent::Eviction { name, .. }
            | CacheEvent::Set { name, .. }
            | CacheEvent::Delete { name, .. } => name,
        }
    }
}
