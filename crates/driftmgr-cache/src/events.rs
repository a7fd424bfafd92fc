//! Cache observability events, dispatched through [`driftmgr_core::EventListeners`].

use driftmgr_core::CoreEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum CacheEvent {
    Hit { key: String, timestamp: Instant },
    Miss { key: String, timestamp: Instant },
    Eviction { key: String, timestamp: Instant },
    Invalidate { pattern: String, timestamp: Instant },
}

impl CoreEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Eviction { .. } => "eviction",
            CacheEvent::Invalidate { .. } => "invalidate",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. }
            | CacheEvent::Invalidate { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            CacheEvent::Hit { key, .. } | CacheEvent::Miss { key, .. } | CacheEvent::Eviction { key, .. } => key,
            CacheEvent::Invalidate { pattern, .. } => pattern,
        }
    }
}
