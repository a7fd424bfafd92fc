use driftmgr_core::CoreEvent;
use std::time::{Duration, Instant};

/// Events emitted by a rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    PermitAcquired {
        name: String,
        timestamp: Instant,
        wait_duration: Duration,
    },
    PermitRejected {
        name: String,
        timestamp: Instant,
        timeout: Duration,
    },
    LimitAdjusted {
        name: String,
        timestamp: Instant,
        new_limit: usize,
    },
}

impl CoreEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
            RateLimiterEvent::PermitRejected { .. } => "permit_rejected",
            RateLimiterEvent::LimitAdjusted { .. } => "limit_adjusted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. }
            | RateLimiterEvent::PermitRejected { timestamp, .. }
            | RateLimiterEvent::LimitAdjusted { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { name, .. }
            | RateLimiterEvent::PermitRejected { name, .. }
            | RateLimiterEvent::LimitAdjusted { name, .. } => name,
        }
    }
}
