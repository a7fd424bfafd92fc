//! Configuration for a provider/region circuit breaker.

use crate::events::CircuitBreakerEvent;
use driftmgr_core::{EventListeners, FnListener};
use std::time::Duration;

/// Per-breaker configuration (spec §4.A.1): opens on an absolute failure
/// count, a failure ratio over a minimum sample, or both.
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    pub(crate) max_failures: usize,
    pub(crate) failure_ratio_threshold: Option<f64>,
    pub(crate) minimum_requests: usize,
    pub(crate) reset_timeout: Duration,
    pub(crate) half_open_max_inflight: usize,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    max_failures: usize,
    failure_ratio_threshold: Option<f64>,
    minimum_requests: usize,
    reset_timeout: Duration,
    half_open_max_inflight: usize,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_failures: 5,
            failure_ratio_threshold: None,
            minimum_requests: 10,
            reset_timeout: Duration::from_secs(30),
            half_open_max_inflight: 1,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Opens the circuit once `failures` reaches this count. Default: 5.
    pub fn max_failures(mut self, n: usize) -> Self {
        self.max_failures = n;
        self
    }

    /// Opens the circuit once `requests >= minimum_requests` and
    /// `failures/requests` reaches this ratio. Default: disabled.
    pub fn failure_ratio_threshold(mut self, ratio: f64) -> Self {
        self.failure_ratio_threshold = Some(ratio);
        self
    }

    /// Minimum sample size before the failure-ratio condition is
    /// evaluated. Default: 10.
    pub fn minimum_requests(mut self, n: usize) -> Self {
        self.minimum_requests = n;
        self
    }

    /// Time spent open before the next call attempts half-open. Default: 30s.
    pub fn reset_timeout(mut self, duration: Duration) -> Self {
        self.reset_timeout = duration;
        self
    }

    /// Concurrent calls admitted while half-open. Default: 1.
    pub fn half_open_max_inflight(mut self, n: usize) -> Self {
        self.half_open_max_inflight = n;
        self
    }

    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState, crate::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    pub fn build(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            max_failures: self.max_failures,
            failure_ratio_threshold: self.failure_ratio_threshold,
            minimum_requests: self.minimum_requests,
            reset_timeout: self.reset_timeout,
            half_open_max_inflight: self.half_open_max_inflight,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
