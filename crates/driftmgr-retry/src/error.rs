use thiserror::Error;

/// Errors returned by [`crate::Retrier::call`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed and the retryable classifier kept permitting
    /// retries until `max_attempts` was reached.
    #[error("retries exhausted after {attempts} attempt(s)")]
    Exhausted { attempts: usize, last: E },

    /// The first non-retryable error short-circuited further attempts.
    #[error("non-retryable error on attempt {attempt}")]
    NonRetryable { attempt: usize, source: E },

    /// The retry budget was exhausted; no more retries are permitted
    /// right now regardless of classification.
    #[error("retry budget exhausted on attempt {attempt}")]
    BudgetExhausted { attempt: usize, last: E },

    /// The call was canceled before it could complete.
    #[error("retry canceled")]
    Canceled,
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::NonRetryable { source, .. } => Some(source),
            RetryError::BudgetExhausted { last, .. } => Some(last),
            RetryError::Canceled => None,
        }
    }
}
