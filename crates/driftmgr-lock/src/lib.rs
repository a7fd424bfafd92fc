//! Per-state-file mutual exclusion with lease TTL, holder identity, and
//! revocation.
//!
//! [`LockManager`] grants at most one live (non-expired) lock per
//! `StateId` at a time. A caller acquires a lock before mutating a state
//! file, renews it periodically while the operation runs, and releases
//! it on completion; an abandoned lock is reclaimed once its lease
//! expires, either on the next `acquire` or by the background sweeper
//! spawned with [`LockManager::spawn_sweeper`].
//!
//! ## Feature Flags
//! - `metrics`: enables counters via the `metrics` crate
//! - `tracing`: enables debug-level logging via the `tracing` crate

mod error;
mod events;
mod lock;
mod manager;
mod remote;

pub use error::LockError;
pub use events::LockEvent;
pub use lock::{Lock, LockHolder};
pub use manager::LockManager;
pub use remote::RemoteLock;
