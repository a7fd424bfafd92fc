//! Configuration for a retry policy (spec §4.A.3).

use crate::budget::RetryBudget;
use crate::events::RetryEvent;
use driftmgr_core::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Decides whether an error is worth retrying. Defaults to "always".
pub type RetryClassifier<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RetryConfig<E> {
    pub(crate) max_attempts: usize,
    pub(crate) initial_delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) multiplier: f64,
    pub(crate) jitter_fraction: f64,
    pub(crate) classifier: RetryClassifier<E>,
    pub(crate) budget: Option<Arc<dyn RetryBudget>>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl<E> RetryConfig<E> {
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }
}

pub struct RetryConfigBuilder<E> {
    max_attempts: usize,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter_fraction: f64,
    classifier: Option<RetryClassifier<E>>,
    budget: Option<Arc<dyn RetryBudget>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Defaults: 3 attempts, 100ms initial delay, 10s max delay,
    /// multiplier 2.0, 30% jitter, every error retryable, no budget.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_fraction: 0.3,
            classifier: None,
            budget: None,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Total attempts including the first, non-retried call.
    pub fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_delay = d;
        self
    }

    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    pub fn multiplier(mut self, m: f64) -> Self {
        self.multiplier = m;
        self
    }

    /// Fraction of the computed delay added as uniform jitter. Default 0.3.
    pub fn jitter_fraction(mut self, f: f64) -> Self {
        self.jitter_fraction = f;
        self
    }

    /// Only errors for which this returns `true` are retried.
    pub fn retryable_if<F>(mut self, f: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(f));
        self
    }

    pub fn budget(mut self, budget: Arc<dyn RetryBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retrying { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    pub fn build(self) -> RetryConfig<E> {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
            jitter_fraction: self.jitter_fraction,
            classifier: self.classifier.unwrap_or_else(|| Arc::new(|_| true)),
            budget: self.budget,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
