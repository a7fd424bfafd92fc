use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`crate::RateLimiter::acquire`].
#[derive(Debug, Clone, Error)]
pub enum RateLimiterError {
    /// No permit became available within the configured timeout.
    #[error("rate limit exceeded; no permit within {timeout:?}")]
    Timeout { timeout: Duration },
}
