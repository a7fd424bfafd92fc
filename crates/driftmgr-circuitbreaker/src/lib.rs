//! Circuit breaker guarding calls to cloud provider adapters.
//!
//! A plain async wrapper (no `tower::Service`, since `ProviderAdapter`
//! calls are bespoke async functions, not HTTP requests): `call` admits
//! or rejects based on the breaker's state, and reports the outcome back
//! into the state machine.
//!
//! ## Feature Flags
//! - `metrics`: state-gauge and call-outcome counters via the `metrics` crate
//! - `tracing`: state transitions logged via the `tracing` crate

mod circuit;
mod config;
mod error;
mod events;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;

use circuit::Circuit;
use driftmgr_core::EventListener;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A single named circuit breaker.
pub struct CircuitBreaker {
    circuit: Mutex<Circuit>,
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            circuit: Mutex::new(Circuit::new()),
            config: Arc::new(config),
        }
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: EventListener<CircuitBreakerEvent> + 'static,
    {
        Arc::get_mut(&mut self.config)
            .expect("add_listener must be called before the breaker is shared")
            .event_listeners
            .add(listener);
    }

    /// Runs `f` if the circuit admits it, recording success or failure.
    /// Returns `CircuitBreakerError::OpenCircuit` without running `f` if
    /// the circuit rejects the call.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admitted = {
            let mut circuit = self.circuit.lock().await;
            let admitted = circuit.try_acquire(&self.config);
            self.dispatch(circuit.take_events());
            admitted
        };
        if !admitted {
            return Err(CircuitBreakerError::OpenCircuit);
        }

        match f().await {
            Ok(value) => {
                let events = {
                    let mut circuit = self.circuit.lock().await;
                    circuit.record_success(&self.config);
                    circuit.take_events()
                };
                self.dispatch(events);
                Ok(value)
            }
            Err(err) => {
                let events = {
                    let mut circuit = self.circuit.lock().await;
                    circuit.record_failure(&self.config);
                    circuit.take_events()
                };
                self.dispatch(events);
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.circuit.lock().await.state()
    }

    pub async fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().await.metrics()
    }

    pub async fn force_open(&self) {
        let events = {
            let mut circuit = self.circuit.lock().await;
            circuit.force_open(&self.config);
            circuit.take_events()
        };
        self.dispatch(events);
    }

    pub async fn force_closed(&self) {
        let events = {
            let mut circuit = self.circuit.lock().await;
            circuit.force_closed(&self.config);
            circuit.take_events()
        };
        self.dispatch(events);
    }

    /// Dispatches events to listeners only after the breaker's mutex has
    /// been released, so a listener that re-enters the breaker (e.g. calls
    /// `state()`) cannot deadlock against the call that raised the event.
    fn dispatch(&self, events: Vec<CircuitBreakerEvent>) {
        for event in events {
            self.config.event_listeners.emit(&event);
        }
    }
}

/// Indexes breakers by a string key, typically `provider[:region]`
/// (spec §4.A.1), creating one lazily on first use via `factory`.
pub struct CircuitBreakerGroup<F> {
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    factory: F,
}

impl<F> CircuitBreakerGroup<F>
where
    F: Fn(&str) -> CircuitBreakerConfig,
{
    pub fn new(factory: F) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            factory,
        }
    }

    pub async fn get(&self, key: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().await;
        breakers
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new((self.factory)(key))))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig::builder().max_failures(2).build()
    }

    #[tokio::test]
    async fn successful_call_passes_through() {
        let breaker = CircuitBreaker::new(config());
        let result: Result<i32, CircuitBreakerError<&str>> = breaker.call(|| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn open_circuit_rejects_without_running_the_call() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..2 {
            let _: Result<i32, CircuitBreakerError<&str>> =
                breaker.call(|| async { Err("boom") }).await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        let result: Result<i32, CircuitBreakerError<&str>> = breaker.call(|| async { Ok(1) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::OpenCircuit)));
    }

    #[tokio::test]
    async fn force_open_and_force_closed_override_state() {
        let breaker = CircuitBreaker::new(config());
        breaker.force_open().await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        breaker.force_closed().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn listener_reentering_the_breaker_does_not_deadlock() {
        use driftmgr_core::FnListener;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::sync::OnceCell;

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_listener = seen.clone();

        // The listener needs a handle to the very breaker it's attached
        // to, which doesn't exist yet at `add_listener` time; a `OnceCell`
        // lets it pick that handle up once the breaker is constructed.
        let handle: Arc<OnceCell<Arc<CircuitBreaker>>> = Arc::new(OnceCell::new());
        let handle_in_listener = handle.clone();

        let mut breaker = CircuitBreaker::new(config());
        breaker.add_listener(FnListener::new(move |_event: &CircuitBreakerEvent| {
            seen_in_listener.fetch_add(1, Ordering::SeqCst);
            let handle = handle_in_listener.clone();
            tokio::spawn(async move {
                if let Some(breaker) = handle.get() {
                    let _ = breaker.state().await;
                }
            });
        }));

        let breaker = Arc::new(breaker);
        handle.set(breaker.clone()).ok();

        let outcome: Result<i32, CircuitBreakerError<&str>> = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            breaker.call(|| async { Ok(1) }),
        )
        .await
        .expect("call must not deadlock on a reentrant listener");

        assert_eq!(outcome.unwrap(), 1);
        assert!(seen.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn group_creates_one_breaker_per_key() {
        let group = CircuitBreakerGroup::new(|_key| config());
        let a1 = group.get("aws:us-east-1").await;
        let a2 = group.get("aws:us-east-1").await;
        let b = group.get("azure:eastus").await;
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }
}
