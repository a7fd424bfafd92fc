//! `LockManager`: per-state-file mutual exclusion with lease TTL.
//!
//! Holds an in-process `HashMap<StateId, Lock>` guarded by a
//! `tokio::sync::Mutex`, the same guarded-shared-state shape
//! `driftmgr-circuitbreaker` uses for its `Circuit`. An expired row is
//! treated as absent by every operation; a background sweeper also
//! removes expired rows on a fixed interval so `Expired` events fire
//! even when nobody calls `Acquire` again for that state.

use crate::error::LockError;
use crate::events::LockEvent;
use crate::lock::{Lock, LockHolder};
#[cfg(feature = "metrics")]
use metrics::counter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
#[cfg(feature = "tracing")]
use tracing::debug;

use driftmgr_core::{Clock, EventListeners, SystemClock};

struct Inner {
    locks: Mutex<HashMap<String, Lock>>,
    clock: Arc<dyn Clock>,
    next_id: AtomicU64,
    events: std::sync::Mutex<EventListeners<LockEvent>>,
}

/// Grants exclusive, lease-bounded access to a single `StateId` at a time.
///
/// Cloning a `LockManager` is cheap; clones share the same underlying
/// map and sweeper task.
#[derive(Clone)]
pub struct LockManager {
    inner: Arc<Inner>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl LockManager {
    /// Creates a manager using the given clock (inject a `FakeClock` in tests).
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                locks: Mutex::new(HashMap::new()),
                clock,
                next_id: AtomicU64::new(1),
                events: std::sync::Mutex::new(EventListeners::new()),
            }),
        }
    }

    /// Registers a listener on the shared lock event bus.
    pub fn add_listener<L>(&self, listener: L)
    where
        L: driftmgr_core::EventListener<LockEvent> + 'static,
    {
        self.inner.events.lock().unwrap().add(listener);
    }

    fn next_lock_id(&self) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        format!("lock-{n:016x}")
    }

    /// Acquires an exclusive lock on `state_id`, failing with
    /// [`LockError::LockHeld`] if a non-expired lock is already present.
    pub async fn acquire(
        &self,
        state_id: impl Into<String>,
        holder: LockHolder,
        lease_ttl: Duration,
        observed_serial: u64,
    ) -> Result<Lock, LockError> {
        let state_id = state_id.into();
        let now = self.inner.clock.now();
        let mut locks = self.inner.locks.lock().await;

        if let Some(existing) = locks.get(&state_id) {
            if !existing.is_expired(now) {
                return Err(LockError::LockHeld {
                    holder: existing.holder.clone(),
                });
            }
        }

        let lock = Lock {
            id: self.next_lock_id(),
            state_id: state_id.clone(),
            holder,
            acquired_at: now,
            lease_until: now + lease_ttl,
            observed_serial,
            version: 1,
        };
        locks.insert(state_id.clone(), lock.clone());
        drop(locks);

        #[cfg(feature = "tracing")]
        debug!(state_id = %state_id, lock_id = %lock.id, "lock acquired");
        #[cfg(feature = "metrics")]
        counter!("driftmgr_lock_acquired_total").increment(1);

        self.inner.events.lock().unwrap().emit(&LockEvent::Acquired {
            state_id,
            lock_id: lock.id.clone(),
            timestamp: now,
        });
        Ok(lock)
    }

    /// Releases `lock_id`'s hold on `state_id`. Fails with
    /// [`LockError::NotFound`] if nothing is locked, or
    /// [`LockError::NotHolder`] if `lock_id` does not match the current
    /// holder.
    pub async fn release(&self, state_id: &str, lock_id: &str) -> Result<(), LockError> {
        let now = self.inner.clock.now();
        let mut locks = self.inner.locks.lock().await;
        match locks.get(state_id) {
            None => Err(LockError::NotFound),
            Some(current) if current.id != lock_id => Err(LockError::NotHolder),
            Some(_) => {
                locks.remove(state_id);
                drop(locks);
                #[cfg(feature = "tracing")]
                debug!(state_id = %state_id, lock_id = %lock_id, "lock released");
                #[cfg(feature = "metrics")]
                counter!("driftmgr_lock_released_total").increment(1);
                self.inner.events.lock().unwrap().emit(&LockEvent::Released {
                    state_id: state_id.to_string(),
                    lock_id: lock_id.to_string(),
                    timestamp: now,
                });
                Ok(())
            }
        }
    }

    /// Extends the lease on `lock_id` by `extension`, provided the caller
    /// still holds it and it has not expired.
    pub async fn renew(
        &self,
        state_id: &str,
        lock_id: &str,
        extension: Duration,
    ) -> Result<Lock, LockError> {
        let now = self.inner.clock.now();
        let mut locks = self.inner.locks.lock().await;
        match locks.get_mut(state_id) {
            None => Err(LockError::NotFound),
            Some(current) if current.id != lock_id || current.is_expired(now) => {
                Err(LockError::NotHolder)
            }
            Some(current) => {
                current.lease_until = now + extension;
                current.version += 1;
                let renewed = current.clone();
                drop(locks);
                #[cfg(feature = "tracing")]
                debug!(state_id = %state_id, lock_id = %lock_id, "lock renewed");
                self.inner.events.lock().unwrap().emit(&LockEvent::Renewed {
                    state_id: state_id.to_string(),
                    lock_id: lock_id.to_string(),
                    timestamp: now,
                });
                Ok(renewed)
            }
        }
    }

    /// Validates a commit against the lock held for `state_id` (spec
    /// §4.H): the caller must still hold `lock_id`, and `persisted_serial`
    /// — the serial read from the backend immediately before writing —
    /// must not have advanced past the serial observed when the lock was
    /// acquired. Rejects with [`LockError::StaleSerial`] if it has; the
    /// lock itself is left untouched either way, since deciding whether
    /// to retry or abort the write is the caller's call.
    pub async fn commit(
        &self,
        state_id: &str,
        lock_id: &str,
        persisted_serial: u64,
    ) -> Result<(), LockError> {
        let now = self.inner.clock.now();
        let locks = self.inner.locks.lock().await;
        match locks.get(state_id) {
            None => Err(LockError::NotFound),
            Some(current) if current.id != lock_id || current.is_expired(now) => {
                Err(LockError::NotHolder)
            }
            Some(current) if persisted_serial > current.observed_serial => {
                Err(LockError::StaleSerial {
                    observed: current.observed_serial,
                    current: persisted_serial,
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Unconditionally removes any lock on `state_id`, regardless of
    /// holder. Always emits `LockEvent::ForceBroken` for the audit trail;
    /// returns the broken lock if one existed.
    pub async fn force_break(&self, state_id: &str, reason: impl Into<String>) -> Option<Lock> {
        let now = self.inner.clock.now();
        let mut locks = self.inner.locks.lock().await;
        let broken = locks.remove(state_id);
        drop(locks);

        let reason = reason.into();
        #[cfg(feature = "tracing")]
        debug!(state_id = %state_id, reason = %reason, "lock force-broken");
        #[cfg(feature = "metrics")]
        counter!("driftmgr_lock_force_broken_total").increment(1);
        self.inner.events.lock().unwrap().emit(&LockEvent::ForceBroken {
            state_id: state_id.to_string(),
            reason,
            timestamp: now,
        });
        broken
    }

    /// Returns the current lock on `state_id`, if any and not expired.
    pub async fn current(&self, state_id: &str) -> Option<Lock> {
        let now = self.inner.clock.now();
        let locks = self.inner.locks.lock().await;
        locks
            .get(state_id)
            .filter(|l| !l.is_expired(now))
            .cloned()
    }

    /// Removes expired rows from the map, emitting `Expired` for each.
    /// Called by the sweeper task; also safe to call directly in tests.
    pub async fn sweep_expired(&self) {
        let now = self.inner.clock.now();
        let mut locks = self.inner.locks.lock().await;
        let expired: Vec<Lock> = locks
            .iter()
            .filter(|(_, l)| l.is_expired(now))
            .map(|(_, l)| l.clone())
            .collect();
        for lock in &expired {
            locks.remove(&lock.state_id);
        }
        drop(locks);

        for lock in expired {
            #[cfg(feature = "metrics")]
            counter!("driftmgr_lock_expired_total").increment(1);
            self.inner.events.lock().unwrap().emit(&LockEvent::Expired {
                state_id: lock.state_id,
                lock_id: lock.id,
                timestamp: now,
            });
        }
    }

    /// Spawns a background task sweeping expired locks every `interval`.
    /// Dropping the returned handle does not stop the sweeper; abort it
    /// explicitly to shut it down.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                manager.sweep_expired().await;
            }
        })
    }
}
