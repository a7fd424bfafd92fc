//! Token bucket primitive shared by the fixed-rate and adaptive limiters.

use std::time::{Duration, Instant};

pub(crate) struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    pub(crate) fn new(now: Instant, initial_tokens: f64) -> Self {
        Self {
            tokens: initial_tokens,
            last_refill: now,
        }
    }

    /// Refills proportionally to elapsed time, then withdraws one token
    /// if available. Returns `Ok(())` on success or `Err(wait)` with how
    /// long until a token would be available at the current rate.
    pub(crate) fn try_acquire(
        &mut self,
        now: Instant,
        capacity: f64,
        refill_rate: f64,
    ) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit / refill_rate))
        }
    }
}
