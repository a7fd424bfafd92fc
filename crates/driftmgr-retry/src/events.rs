use driftmgr_core::CoreEvent;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum RetryEvent {
    Retrying {
        name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    Succeeded {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
    Exhausted {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
    NonRetryable {
        name: String,
        timestamp: Instant,
        attempt: usize,
    },
    BudgetExhausted {
        name: String,
        timestamp: Instant,
        attempt: usize,
    },
}

impl CoreEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retrying { .. } => "retrying",
            RetryEvent::Succeeded { .. } => "succeeded",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::NonRetryable { .. } => "non_retryable",
            RetryEvent::BudgetExhausted { .. } => "budget_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retrying { timestamp, .. }
            | RetryEvent::Succeeded { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::NonRetryable { timestamp, .. }
            | RetryEvent::BudgetExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            RetryEvent::Retrying { name, .. }
            | RetryEvent::Succeeded { name, .. }
            | RetryEvent::Exhausted { name, .. }
            | RetryEvent::NonRetryable { name, .. }
            | RetryEvent::BudgetExhausted { name, .. } => name,
        }
    }
}
