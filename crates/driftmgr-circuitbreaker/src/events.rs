//! Circuit breaker observability events, dispatched through
//! [`driftmgr_core::EventListeners`].

use crate::circuit::CircuitState;
use driftmgr_core::CoreEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    StateTransition {
        name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    CallPermitted {
        name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    CallRejected {
        name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    SuccessRecorded {
        name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    FailureRecorded {
        name: String,
        timestamp: Instant,
        state: CircuitState,
    },
}

impl CoreEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { name, .. }
            | CircuitBreakerEvent::CallPermitted { name, .. }
            | CircuitBreakerEvent::CallRejected { name, .. }
            | CircuitBreakerEvent::SuccessRecorded { name, .. }
            | CircuitBreakerEvent::FailureRecorded { name, .. } => name,
        }
    }
}
