//! Retry-with-backoff policy used by discovery to survive provider
//! throttling (spec §4.A.3).
//!
//! [`Retrier::call`] retries a fallible async operation with exponential
//! backoff and uniform jitter, stopping early on a non-retryable error
//! (per the configured classifier), on retry-budget exhaustion, or on
//! cancellation via a [`tokio_util::sync::CancellationToken`].
//!
//! ## Feature Flags
//! - `metrics`: attempt/exhaustion counters via the `metrics` crate
//! - `tracing`: retry attempts logged via the `tracing` crate

mod backoff;
mod budget;
mod config;
mod error;
mod events;

pub use budget::{RetryBudget, RetryBudgetBuilder};
pub use config::{RetryClassifier, RetryConfig, RetryConfigBuilder};
pub use error::RetryError;
pub use events::RetryEvent;

use backoff::compute_delay;
use rand::RngExt;
use std::future::Future;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs an operation with the configured backoff-and-retry policy.
pub struct Retrier<E> {
    config: RetryConfig<E>,
}

impl<E> Retrier<E> {
    pub fn new(config: RetryConfig<E>) -> Self {
        Self { config }
    }

    /// Retries `f` until it succeeds, the classifier rejects an error,
    /// the budget is exhausted, or `max_attempts` is reached. Never
    /// cancels early; see [`Retrier::call_cancelable`] for that.
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_cancelable(f, &CancellationToken::new()).await
    }

    /// As [`Retrier::call`], but also stops waiting out a backoff delay
    /// (or the next attempt) as soon as `cancellation` fires.
    pub async fn call_cancelable<F, Fut, T>(
        &self,
        mut f: F,
        cancellation: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            if cancellation.is_cancelled() {
                return Err(RetryError::Canceled);
            }

            match f().await {
                Ok(value) => {
                    if let Some(budget) = &self.config.budget {
                        budget.deposit();
                    }
                    self.emit(RetryEvent::Succeeded {
                        name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    return Ok(value);
                }
                Err(err) => {
                    if !(self.config.classifier)(&err) {
                        self.emit(RetryEvent::NonRetryable {
                            name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            attempt,
                        });
                        return Err(RetryError::NonRetryable { attempt, source: err });
                    }

                    if attempt >= self.config.max_attempts {
                        self.emit(RetryEvent::Exhausted {
                            name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });
                        return Err(RetryError::Exhausted { attempts: attempt, last: err });
                    }

                    if let Some(budget) = &self.config.budget {
                        if !budget.try_withdraw() {
                            self.emit(RetryEvent::BudgetExhausted {
                                name: self.config.name.clone(),
                                timestamp: Instant::now(),
                                attempt,
                            });
                            return Err(RetryError::BudgetExhausted { attempt, last: err });
                        }
                    }

                    let jitter_sample = rand::rng().random::<f64>();
                    let delay = compute_delay(
                        attempt,
                        self.config.initial_delay,
                        self.config.max_delay,
                        self.config.multiplier,
                        self.config.jitter_fraction,
                        jitter_sample,
                    );

                    self.emit(RetryEvent::Retrying {
                        name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempt,
                        delay,
                    });
                    #[cfg(feature = "tracing")]
                    tracing::debug!(retrier = %self.config.name, attempt, ?delay, "retrying after failure");
                    #[cfg(feature = "metrics")]
                    metrics::counter!("retry_attempts_total", "retrier" => self.config.name.clone()).increment(1);

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancellation.cancelled() => return Err(RetryError::Canceled),
                    }

                    attempt += 1;
                }
            }
        }
    }

    fn emit(&self, event: RetryEvent) {
        self.config.event_listeners.emit(&event);
    }
}
