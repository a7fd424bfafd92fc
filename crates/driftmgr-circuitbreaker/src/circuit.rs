use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

/// Point-in-time view of a breaker's counters.
#[derive(Debug, Clone, Copy)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    pub requests: u64,
    pub failures: u64,
    pub successes: u64,
    pub consecutive_errors: u64,
    pub state_changes: u64,
}

/// Closed/open/half-open state machine per spec §4.A.1.
///
/// Mutating methods queue the events they raise in `pending_events` rather
/// than dispatching them to listeners directly: the caller holds this
/// struct behind a mutex, and running a listener callback while that lock
/// is held would let a reentrant listener (one that calls back into the
/// breaker) deadlock. Callers drain the queue with [`Circuit::take_events`]
/// after releasing the lock.
pub(crate) struct Circuit {
    state: CircuitState,
    requests: u64,
    failures: u64,
    successes: u64,
    consecutive_errors: u64,
    state_changes: u64,
    last_state_change: Instant,
    half_open_inflight: usize,
    pending_events: Vec<CircuitBreakerEvent>,
}

impl Circuit {
    pub(crate) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            requests: 0,
            failures: 0,
            successes: 0,
            consecutive_errors: 0,
            state_changes: 0,
            last_state_change: Instant::now(),
            half_open_inflight: 0,
            pending_events: Vec::new(),
        }
    }

    /// Drains and returns the events queued since the last call, for the
    /// caller to dispatch once it has released the breaker's lock.
    pub(crate) fn take_events(&mut self) -> Vec<CircuitBreakerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn metrics(&self) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            requests: self.requests,
            failures: self.failures,
            successes: self.successes,
            consecutive_errors: self.consecutive_errors,
            state_changes: self.state_changes,
        }
    }

    /// Attempts to admit a call. `Open` rejects until `reset_timeout` has
    /// elapsed, at which point the next attempt transitions to
    /// `HalfOpen` and is itself admitted as the first probe. `HalfOpen`
    /// admits at most `half_open_max_inflight` concurrent calls.
    pub fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> bool {
        match self.state {
            CircuitState::Closed => {
                self.queue(CircuitBreakerEvent::CallPermitted {
                    name: config.name.clone(),
                    timestamp: Instant::now(),
                    state: self.state,
                });
                true
            }
            CircuitState::Open => {
                if self.last_state_change.elapsed() >= config.reset_timeout {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.half_open_inflight = 1;
                    self.queue(CircuitBreakerEvent::CallPermitted {
                        name: config.name.clone(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                    true
                } else {
                    self.queue(CircuitBreakerEvent::CallRejected {
                        name: config.name.clone(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_inflight < config.half_open_max_inflight {
                    self.half_open_inflight += 1;
                    self.queue(CircuitBreakerEvent::CallPermitted {
                        name: config.name.clone(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                    true
                } else {
                    self.queue(CircuitBreakerEvent::CallRejected {
                        name: config.name.clone(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                    false
                }
            }
        }
    }

    /// A successful call resets `failures` to 0 in `Closed`; in
    /// `HalfOpen`, reaching `half_open_max_inflight` consecutive
    /// successes (i.e. every admitted probe succeeded) closes the circuit.
    pub fn record_success(&mut self, config: &CircuitBreakerConfig) {
        self.requests += 1;
        self.successes += 1;
        self.consecutive_errors = 0;

        self.queue(CircuitBreakerEvent::SuccessRecorded {
            name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.failures = 0;
            }
            CircuitState::HalfOpen => {
                if self.successes >= config.half_open_max_inflight as u64 {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// A single failure in `HalfOpen` reopens the circuit and restarts
    /// `reset_timeout` from now. In `Closed`, opens when `failures ≥
    /// max_failures` or `requests ≥ minimum_requests` and the failure
    /// ratio clears `failure_ratio_threshold`.
    pub fn record_failure(&mut self, config: &CircuitBreakerConfig) {
        self.requests += 1;
        self.failures += 1;
        self.consecutive_errors += 1;

        self.queue(CircuitBreakerEvent::FailureRecorded {
            name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);

        match self.state {
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open, config);
            }
            CircuitState::Closed => {
                let ratio_tripped = config
                    .failure_ratio_threshold
                    .map(|threshold| {
                        self.requests >= config.minimum_requests as u64
                            && (self.failures as f64 / self.requests as f64) >= threshold
                    })
                    .unwrap_or(false);

                if self.failures >= config.max_failures as u64 || ratio_tripped {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Open, config);
    }

    pub fn force_closed(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }
        let from_state = self.state;
        self.state = state;
        self.state_changes += 1;
        self.last_state_change = Instant::now();
        self.failures = 0;
        self.successes = 0;
        self.requests = 0;
        self.half_open_inflight = 0;

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = ?from_state, to = ?state, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone()).set(state as u8 as f64);
        }

        self.queue(CircuitBreakerEvent::StateTransition {
            name: config.name.clone(),
            timestamp: Instant::now(),
            from_state,
            to_state: state,
        });
    }

    fn queue(&mut self, event: CircuitBreakerEvent) {
        self.pending_events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig::builder()
            .max_failures(3)
            .reset_timeout(Duration::from_millis(20))
            .half_open_max_inflight(1)
            .build()
    }

    #[test]
    fn opens_after_max_failures() {
        let mut circuit = Circuit::new();
        let config = config();
        for _ in 0..3 {
            circuit.record_failure(&config);
        }
        assert_eq!(circuit.state(), CircuitState::Open);
    }

    #[test]
    fn successful_call_resets_failure_count_while_closed() {
        let mut circuit = Circuit::new();
        let config = config();
        circuit.record_failure(&config);
        circuit.record_failure(&config);
        circuit.record_success(&config);
        circuit.record_failure(&config);
        circuit.record_failure(&config);
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[test]
    fn failure_ratio_opens_once_minimum_requests_met() {
        let mut circuit = Circuit::new();
        let config = CircuitBreakerConfig::builder()
            .max_failures(1000)
            .failure_ratio_threshold(0.5)
            .minimum_requests(4)
            .build();

        circuit.record_failure(&config);
        circuit.record_success(&config);
        assert_eq!(circuit.state(), CircuitState::Closed);

        circuit.record_failure(&config);
        circuit.record_failure(&config);
        assert_eq!(circuit.state(), CircuitState::Open);
    }

    #[test]
    fn rejects_while_open_then_admits_one_probe_after_reset_timeout() {
        let mut circuit = Circuit::new();
        let config = config();
        for _ in 0..3 {
            circuit.record_failure(&config);
        }
        assert!(!circuit.try_acquire(&config));

        std::thread::sleep(Duration::from_millis(30));
        assert!(circuit.try_acquire(&config));
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
        assert!(!circuit.try_acquire(&config));
    }

    #[test]
    fn half_open_failure_reopens_and_half_open_success_closes() {
        let mut circuit = Circuit::new();
        let config = config();
        for _ in 0..3 {
            circuit.record_failure(&config);
        }
        std::thread::sleep(Duration::from_millis(30));
        circuit.try_acquire(&config);
        circuit.record_failure(&config);
        assert_eq!(circuit.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(30));
        circuit.try_acquire(&config);
        circuit.record_success(&config);
        assert_eq!(circuit.state(), CircuitState::Closed);
    }
}
