//! The unified error taxonomy shared by every driftmgr crate.
//!
//! Every leaf primitive (circuit breaker, rate limiter, retry, cache, lock
//! manager, discovery, state parser/analyzer) returns a [`DriftError`]
//! rather than a bespoke per-crate error type, the way the teacher
//! workspace's `ResilienceError<E>` unifies layer errors into one enum a
//! caller can match on without writing `From` impls for every layer. Unlike
//! `ResilienceError<E>`, `DriftError` is not generic over an application
//! error: driftmgr is the application, so the variants below are concrete.

use std::fmt;
use std::time::Duration;

/// The full error taxonomy described by the spec's error handling design.
#[derive(Debug, Clone)]
pub enum DriftError {
    /// Malformed input: a bad resource address, an unknown provider name,
    /// state bytes that are not a well-formed state document, ...
    Validation {
        /// Human-readable description of what was malformed.
        message: String,
    },

    /// A state, resource, backend, or lock could not be found.
    NotFound {
        /// What kind of thing was missing (e.g. `"state"`, `"lock"`).
        kind: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A state is already locked by another holder.
    StateLocked {
        /// The state that is locked.
        state_id: String,
        /// Description of the current holder.
        holder: String,
    },

    /// A commit was rejected because the persisted `serial` advanced past
    /// the value observed when the lock was acquired.
    StaleSerial {
        /// The state whose serial advanced underneath the caller.
        state_id: String,
        /// The serial the caller observed at lock-acquire time.
        observed: u64,
        /// The serial currently persisted.
        current: u64,
    },

    /// A resource the caller tried to create/import already exists.
    ResourceExists {
        /// The conflicting resource identity.
        id: String,
    },

    /// A provider adapter rejected a call for authentication/authorization
    /// reasons. Not retryable.
    Unauthorized {
        /// The provider that rejected the call.
        provider: String,
    },

    /// A transient upstream failure. Retryable per §4.A.3.
    Upstream {
        /// The provider that failed.
        provider: String,
        /// Description of the underlying failure.
        message: String,
    },

    /// The upstream signaled rate limiting. Retryable with longer backoff.
    Throttled {
        /// The provider that throttled the call.
        provider: String,
        /// Upstream-suggested retry delay, if any.
        retry_after: Option<Duration>,
    },

    /// A circuit breaker rejected the call immediately without attempting
    /// the upstream operation.
    CircuitOpen {
        /// The breaker key (`provider[:region]`) that is open.
        breaker: String,
    },

    /// The caller's cancellation token was observed at a suspension point.
    Canceled,

    /// An operation did not complete within its configured timeout.
    Timeout {
        /// The component that timed out (e.g. `"adapter_call"`, `"discovery_run"`).
        layer: &'static str,
    },

    /// An invariant was violated (e.g. double-release of a lock by the same
    /// lock id). Always a bug, never an expected outcome of caller input.
    Internal {
        /// Description of the violated invariant.
        message: String,
    },
}

impl fmt::Display for DriftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftError::Validation { message } => write!(f, "validation error: {message}"),
            DriftError::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            DriftError::StateLocked { state_id, holder } => {
                write!(f, "state {state_id} is locked by {holder}")
            }
            DriftError::StaleSerial {
                state_id,
                observed,
                current,
            } => write!(
                f,
                "state {state_id} serial advanced from {observed} to {current}"
            ),
            DriftError::ResourceExists { id } => write!(f, "resource already exists: {id}"),
            DriftError::Unauthorized { provider } => {
                write!(f, "unauthorized against provider {provider}")
            }
            DriftError::Upstream { provider, message } => {
                write!(f, "upstream error from {provider}: {message}")
            }
            DriftError::Throttled {
                provider,
                retry_after,
            } => match retry_after {
                Some(d) => write!(f, "throttled by {provider}, retry after {d:?}"),
                None => write!(f, "throttled by {provider}"),
            },
            DriftError::CircuitOpen { breaker } => write!(f, "circuit '{breaker}' is open"),
            DriftError::Canceled => write!(f, "operation canceled"),
            DriftError::Timeout { layer } => write!(f, "timeout in {layer}"),
            DriftError::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for DriftError {}

impl DriftError {
    /// Returns `true` if retrying the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriftError::Upstream { .. } | DriftError::Throttled { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DriftError::Timeout { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, DriftError::CircuitOpen { .. })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, DriftError::Canceled)
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, DriftError::Throttled { .. })
    }
}
