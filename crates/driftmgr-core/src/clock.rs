//! Injectable monotonic clock.
//!
//! Circuit breaker windows, lock leases, cache TTLs, and backoff delays are
//! all expressed as durations measured against a clock. Production wires
//! [`SystemClock`]; tests inject a [`FakeClock`] so lease expiry and TTL
//! boundaries can be advanced deterministically instead of racing real time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic time.
pub trait Clock: Send + Sync {
    /// Returns the current instant according to this clock.
    fn now(&self) -> Instant;
}

/// The real wall clock, backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only advances when told to, for deterministic tests of
/// TTL expiry, lease timeouts, and circuit breaker reset windows.
#[derive(Clone)]
pub struct FakeClock {
    base: Instant,
    offset_millis: Arc<AtomicU64>,
}

impl FakeClock {
    /// Creates a clock anchored at the real current instant, offset zero.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_millis: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.offset_millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst))
    }
}
