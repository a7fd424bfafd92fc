//! `RemoteLock`: the pluggable backend seam from spec §6.
//!
//! [`LockManager`](crate::LockManager) owns an in-process map by default.
//! A caller who needs multi-node coordination can instead hand it a
//! `RemoteLock` backed by a conditional-put KV store; the manager's
//! contract (`Acquire`/`Release`/`Renew`/`ForceBreak`) is preserved either
//! way.

use crate::lock::Lock;
use async_trait::async_trait;

/// A remote lock backend performing compare-and-swap on `(lock_id,
/// lease_until)`, the same primitive `driftmgr-cache`'s `RemoteCache`
/// seam uses for its optional L2.
#[async_trait]
pub trait RemoteLock: Send + Sync {
    /// Atomically stores `lock` iff no live lock currently exists for
    /// `lock.state_id`. Returns the conflicting lock on failure.
    async fn put_if_absent(&self, lock: Lock) -> Result<(), Lock>;

    /// Atomically deletes the stored lock iff its id matches `lock_id`.
    /// Returns `true` if deleted.
    async fn delete_if_match(&self, state_id: &str, lock_id: &str) -> bool;

    /// Reads the currently stored lock, if any.
    async fn get(&self, state_id: &str) -> Option<Lock>;
}
