//! Exponential backoff with uniform jitter (spec §4.A.3).

use std::time::Duration;

/// Delay before retry attempt `attempt` (1-indexed: the first retry is
/// `attempt = 1`), per `min(max_delay, initial_delay * multiplier^(attempt-1))`
/// plus uniform jitter in `[0, jitter_fraction * delay]`.
pub(crate) fn compute_delay(
    attempt: usize,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter_fraction: f64,
    jitter_sample: f64,
) -> Duration {
    let exp = multiplier.powi((attempt.saturating_sub(1)) as i32);
    let base = initial_delay.as_secs_f64() * exp;
    let base = base.min(max_delay.as_secs_f64());
    let jitter = base * jitter_fraction * jitter_sample.clamp(0.0, 1.0);
    Duration::from_secs_f64(base + jitter)
}
