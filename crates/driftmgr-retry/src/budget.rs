//! Retry budgets, limiting total retries across all callers to avoid
//! retry storms against an already-struggling provider.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A budget controlling how many retries are allowed right now.
///
/// Shared across every clone of a [`crate::Retrier`], so it throttles
/// retries globally rather than per call.
pub trait RetryBudget: Send + Sync {
    /// Attempts to withdraw one retry token. `false` means the budget is
    /// exhausted and the caller should give up instead of retrying.
    fn try_withdraw(&self) -> bool;

    /// Deposits a token back after a successful call.
    fn deposit(&self);

    /// Current balance, for observability.
    fn balance(&self) -> usize;
}

/// Builder for the budget variants below.
#[derive(Clone, Default)]
pub struct RetryBudgetBuilder;

impl RetryBudgetBuilder {
    pub fn new() -> Self {
        Self
    }

    /// A fixed-capacity bucket: every success deposits one token back;
    /// every retry withdraws one. No background refill.
    pub fn token_bucket(self) -> TokenBucketBuilder {
        TokenBucketBuilder {
            max_tokens: 100,
            initial_tokens: None,
        }
    }

    /// A budget whose ceiling itself shrinks multiplicatively whenever
    /// it's found exhausted, and creeps back up by one per deposit.
    pub fn aimd(self) -> AimdBudgetBuilder {
        AimdBudgetBuilder {
            min_budget: 10,
            max_budget: 1000,
            decrease_factor: 0.5,
        }
    }
}

pub struct TokenBucketBuilder {
    max_tokens: usize,
    initial_tokens: Option<usize>,
}

impl TokenBucketBuilder {
    pub fn max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn initial_tokens(mut self, initial: usize) -> Self {
        self.initial_tokens = Some(initial);
        self
    }

    pub fn build(self) -> Arc<dyn RetryBudget> {
        Arc::new(TokenBucketBudget::new(
            self.max_tokens,
            self.initial_tokens.unwrap_or(self.max_tokens),
        ))
    }
}

pub struct AimdBudgetBuilder {
    min_budget: usize,
    max_budget: usize,
    decrease_factor: f64,
}

impl AimdBudgetBuilder {
    pub fn min_budget(mut self, min: usize) -> Self {
        self.min_budget = min;
        self
    }

    pub fn max_budget(mut self, max: usize) -> Self {
        self.max_budget = max;
        self
    }

    pub fn decrease_factor(mut self, factor: f64) -> Self {
        self.decrease_factor = factor;
        self
    }

    pub fn build(self) -> Arc<dyn RetryBudget> {
        Arc::new(AimdBudget::new(self.min_budget, self.max_budget, self.decrease_factor))
    }
}

/// Fixed-capacity token bucket budget with no time-based refill.
pub struct TokenBucketBudget {
    tokens: AtomicU64,
    max_tokens: u64,
}

impl TokenBucketBudget {
    pub fn new(max_tokens: usize, initial_tokens: usize) -> Self {
        Self {
            tokens: AtomicU64::new(initial_tokens as u64),
            max_tokens: max_tokens as u64,
        }
    }
}

impl RetryBudget for TokenBucketBudget {
    fn try_withdraw(&self) -> bool {
        loop {
            let current = self.tokens.load(Ordering::Relaxed);
            if current == 0 {
                return false;
            }
            if self
                .tokens
                .compare_exchange_weak(current, current - 1, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn deposit(&self) {
        let current = self.tokens.load(Ordering::Relaxed);
        self.tokens
            .store((current + 1).min(self.max_tokens), Ordering::Relaxed);
    }

    fn balance(&self) -> usize {
        self.tokens.load(Ordering::Relaxed) as usize
    }
}

/// A budget whose ceiling shrinks multiplicatively on exhaustion and
/// creeps back toward the absolute max on deposit.
pub struct AimdBudget {
    tokens: AtomicU64,
    min_budget: u64,
    current_max: AtomicU64,
    absolute_max: u64,
    decrease_factor: f64,
}

impl AimdBudget {
    pub fn new(min_budget: usize, max_budget: usize, decrease_factor: f64) -> Self {
        Self {
            tokens: AtomicU64::new(max_budget as u64),
            min_budget: min_budget as u64,
            current_max: AtomicU64::new(max_budget as u64),
            absolute_max: max_budget as u64,
            decrease_factor,
        }
    }
}

impl RetryBudget for AimdBudget {
    fn try_withdraw(&self) -> bool {
        loop {
            let current = self.tokens.load(Ordering::Relaxed);
            if current == 0 {
                let current_max = self.current_max.load(Ordering::Relaxed);
                let new_max = ((current_max as f64 * self.decrease_factor) as u64).max(self.min_budget);
                self.current_max.store(new_max, Ordering::Relaxed);
                return false;
            }
            if self
                .tokens
                .compare_exchange_weak(current, current - 1, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn deposit(&self) {
        let current_max = self.current_max.load(Ordering::Relaxed);
        let current = self.tokens.load(Ordering::Relaxed);
        self.tokens.store((current + 1).min(current_max), Ordering::Relaxed);

        if current_max < self.absolute_max {
            self.current_max
                .store((current_max + 1).min(self.absolute_max), Ordering::Relaxed);
        }
    }

    fn balance(&self) -> usize {
        self.tokens.load(Ordering::Relaxed) as usize
    }
}
