use thiserror::Error;

/// Errors returned by a `CircuitBreaker::call`.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the call was not permitted.
    #[error("circuit is open; call not permitted")]
    OpenCircuit,

    /// The wrapped operation itself failed.
    #[error("operation error: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit)
    }

    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}
