//! The `Lock` value type and its holder descriptor.

use std::time::Instant;

/// Identifies who is holding a lock and for what operation, e.g.
/// `operation = "AnalyzeState"`, `who = "ci-runner@prod-pipeline"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolder {
    pub operation: String,
    pub who: String,
}

impl LockHolder {
    pub fn new(operation: impl Into<String>, who: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            who: who.into(),
        }
    }
}

/// Exclusive right to mutate a `StateFile`, per spec §3 `Lock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub id: String,
    pub state_id: String,
    pub holder: LockHolder,
    pub acquired_at: Instant,
    pub lease_until: Instant,
    /// The state's `serial` observed at acquire time.
    /// [`crate::LockManager::commit`] compares this against the serial
    /// persisted at commit time and rejects with
    /// [`crate::LockError::StaleSerial`] if it has advanced.
    pub observed_serial: u64,
    /// Version counter, incremented on each renewal, for the persisted
    /// lock-record round-trip format of spec §6.
    pub version: u64,
}

impl Lock {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.lease_until
    }
}
