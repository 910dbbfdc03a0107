//! Job lifecycle hooks and queue observability events.
//!
//! §4.2.5 calls these "lifecycle hooks" (`onStart`/`onProgress`/`onCompleted`/
//! `onFailed`) rather than a generic event bus; they're modeled here the same
//! way the cache crate models its events, so both subsystems plug into
//! [`aegis_core::EventListeners`] uniformly.

use aegis_core::AegisEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum QueueEvent {
    Started { queue: String, job_id: String, timestamp: Instant },
    Progress { queue: String, job_id: String, percent: u8, timestamp: Instant },
    Completed { queue: String, job_id: String, timestamp: Instant },
    Failed { queue: String, job_id: String, error: String, timestamp: Instant },
}

impl AegisEvent for QueueEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QueueEvent::Started { .. } => "started",
            QueueEvent::Progress { .. } => "progress",
            QueueEvent::Completed { .. } => "completed",
            QueueEvent::Failed { .. } => "failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            QueueEvent::Started { timestamp, .. }
            | QueueEvent::Progress { timestamp, .. }
            | QueueEvent::Completed { timestamp, .. }
            | QueueEvent::Failed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            QueueEvent::Started { queue, .. }
            | QueueEvent::Progress { queue, .. }
            | QueueEvent::Completed { queue, .. }
            | QueueEvent::Failed { queue, .. } => queue,
        }
    }
}
