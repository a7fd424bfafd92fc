//! Errors specific to lock operations.

use crate::lock::LockHolder;
use std::fmt;

/// Errors returned by [`crate::LockManager`] operations. Contention is
/// always a typed error here, never a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// `Acquire` found a live (non-expired) lock held by someone else.
    LockHeld {
        /// Description of the current holder.
        holder: LockHolder,
    },
    /// `Release`/`Renew` referenced a `stateId` with no lock at all.
    NotFound,
    /// `Release`/`Renew` referenced a lock id that does not match the
    /// current holder (the lock was already released and re-acquired, or
    /// the caller never held it).
    NotHolder,
    /// `Commit` presented a `persisted_serial` past the `serial` observed
    /// when the lock was acquired: someone else wrote this state under
    /// the same lock's nose (spec §4.H, §9 `Conflict`).
    StaleSerial {
        /// The serial observed at lock-acquire time.
        observed: u64,
        /// The serial currently persisted.
        current: u64,
    },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::LockHeld { holder } => {
                write!(f, "lock held by {} ({})", holder.who, holder.operation)
            }
            LockError::NotFound => write!(f, "no lock for this state"),
            LockError::NotHolder => write!(f, "caller does not hold this lock"),
            LockError::StaleSerial { observed, current } => write!(
                f,
                "stale commit: observed serial {observed} but persisted serial is now {current}"
            ),
        }
    }
}

impl std::error::Error for LockError {}
