//! Token-bucket rate limiter guarding provider adapter calls (spec §4.A.2).
//!
//! [`RateLimiter`] admits a caller once a token is available, waiting up
//! to the configured timeout otherwise. When built with
//! [`RateLimiterConfigBuilder::adaptive`], the permitted rate is no
//! longer fixed: it tracks a [`driftmgr_core::aimd::AimdController`]
//! that the caller drives by reporting call outcomes via
//! [`RateLimiter::record_outcome`] — additive increase on success,
//! multiplicative decrease on failure, bounded by the controller's
//! configured min/max.
//!
//! ## Feature Flags
//! - `metrics`: permit counters via the `metrics` crate
//! - `tracing`: rejected-permit logging via the `tracing` crate

mod bucket;
mod config;
mod error;
mod events;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::RateLimiterError;
pub use events::RateLimiterEvent;

use bucket::Bucket;
use driftmgr_core::aimd::AimdController;
use driftmgr_core::{Clock, SystemClock};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A named token-bucket rate limiter, fixed-rate or adaptive.
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    aimd: Option<AimdController>,
    config: RateLimiterConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        let aimd = config.adaptive.clone().map(AimdController::new);
        let capacity = aimd
            .as_ref()
            .map(|a| a.limit() as f64)
            .unwrap_or(config.max_tokens);
        Self {
            bucket: Mutex::new(Bucket::new(clock.now(), capacity)),
            aimd,
            config,
            clock,
        }
    }

    fn effective_rate(&self) -> f64 {
        self.aimd
            .as_ref()
            .map(|a| a.limit() as f64)
            .unwrap_or(self.config.refill_rate)
    }

    /// Blocks until a token is available, or fails once the configured
    /// timeout elapses. Callers without a timeout wait indefinitely.
    pub async fn acquire(&self) -> Result<(), RateLimiterError> {
        let started = self.clock.now();
        loop {
            let now = self.clock.now();
            let rate = self.effective_rate();
            let capacity = if self.aimd.is_some() {
                rate
            } else {
                self.config.max_tokens
            };
            let wait = {
                let mut bucket = self.bucket.lock().await;
                bucket.try_acquire(now, capacity, rate)
            };

            match wait {
                Ok(()) => {
                    self.emit(RateLimiterEvent::PermitAcquired {
                        name: self.config.name.clone(),
                        timestamp: now,
                        wait_duration: now.saturating_duration_since(started),
                    });
                    return Ok(());
                }
                Err(wait_for) => {
                    if let Some(timeout) = self.config.timeout {
                        let elapsed = now.saturating_duration_since(started);
                        if elapsed + wait_for > timeout {
                            self.emit(RateLimiterEvent::PermitRejected {
                                name: self.config.name.clone(),
                                timestamp: now,
                                timeout,
                            });
                            #[cfg(feature = "tracing")]
                            tracing::debug!(limiter = %self.config.name, ?timeout, "rate limiter rejected permit");
                            #[cfg(feature = "metrics")]
                            metrics::counter!("ratelimiter_rejected_total", "limiter" => self.config.name.clone()).increment(1);
                            return Err(RateLimiterError::Timeout { timeout });
                        }
                    }
                    tokio::time::sleep(wait_for).await;
                }
            }
        }
    }

    /// Reports the outcome of a call admitted by `acquire`, adjusting
    /// the adaptive rate. No-op for a fixed-rate limiter.
    pub fn record_outcome(&self, success: bool) {
        let Some(aimd) = &self.aimd else { return };
        if success {
            aimd.on_success();
        } else {
            aimd.on_failure();
        }
        self.emit(RateLimiterEvent::LimitAdjusted {
            name: self.config.name.clone(),
            timestamp: self.clock.now(),
            new_limit: aimd.limit(),
        });
    }

    /// Current permitted rate (tokens/sec for a fixed limiter, the
    /// AIMD controller's current limit for an adaptive one).
    pub fn current_rate(&self) -> f64 {
        self.effective_rate()
    }

    fn emit(&self, event: RateLimiterEvent) {
        self.config.event_listeners.emit(&event);
    }
}
