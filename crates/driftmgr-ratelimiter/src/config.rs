//! Configuration for a provider/region rate limiter (spec §4.A.2).

use crate::events::RateLimiterEvent;
use driftmgr_core::aimd::AimdConfig;
use driftmgr_core::{EventListeners, FnListener};
use std::time::Duration;

/// Per-limiter configuration: a token bucket, optionally driven by an
/// AIMD controller instead of a fixed rate.
#[derive(Clone)]
pub struct RateLimiterConfig {
    pub(crate) max_tokens: f64,
    pub(crate) refill_rate: f64,
    pub(crate) timeout: Option<Duration>,
    pub(crate) adaptive: Option<AimdConfig>,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) name: String,
}

impl RateLimiterConfig {
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    max_tokens: f64,
    refill_rate: f64,
    timeout: Option<Duration>,
    adaptive: Option<AimdConfig>,
    event_listeners: EventListeners<RateLimiterEvent>,
    name: String,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Defaults: 50 tokens/sec, burst capacity 50, no wait timeout, fixed rate.
    pub fn new() -> Self {
        Self {
            max_tokens: 50.0,
            refill_rate: 50.0,
            timeout: None,
            adaptive: None,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Burst capacity: the maximum number of tokens the bucket can hold.
    pub fn max_tokens(mut self, tokens: f64) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Tokens added per second at a fixed rate. Ignored once `adaptive`
    /// is set; the AIMD controller's current limit is used instead.
    pub fn refill_rate(mut self, tokens_per_second: f64) -> Self {
        self.refill_rate = tokens_per_second;
        self
    }

    /// Caps how long `acquire` waits for a permit before failing.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Switches the limiter to the adaptive variant: the permitted rate
    /// tracks an AIMD controller driven by caller-reported outcomes
    /// instead of staying fixed.
    pub fn adaptive(mut self, config: AimdConfig) -> Self {
        self.adaptive = Some(config);
        self
    }

    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_permit_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitRejected { timeout, .. } = event {
                f(*timeout);
            }
        }));
        self
    }

    pub fn build(self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_tokens: self.max_tokens,
            refill_rate: self.refill_rate,
            timeout: self.timeout,
            adaptive: self.adaptive,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
