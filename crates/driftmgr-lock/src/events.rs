//! Lock lifecycle events, dispatched through [`driftmgr_core::EventListeners`].

use driftmgr_core::CoreEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum LockEvent {
    Acquired {
        state_id: String,
        lock_id: String,
        timestamp: Instant,
    },
    Released {
        state_id: String,
        lock_id: String,
        timestamp: Instant,
    },
    Renewed {
        state_id: String,
        lock_id: String,
        timestamp: Instant,
    },
    Expired {
        state_id: String,
        lock_id: String,
        timestamp: Instant,
    },
    /// A privileged `ForceBreak` call, always audited.
    ForceBroken {
        state_id: String,
        reason: String,
        timestamp: Instant,
    },
}

impl LockEvent {
    fn state_id(&self) -> &str {
        match self {
            LockEvent::Acquired { state_id, .. }
            | LockEvent::Released { state_id, .. }
            | LockEvent::Renewed { state_id, .. }
            | LockEvent::Expired { state_id, .. }
            | LockEvent::ForceBroken { state_id, .. } => state_id,
        }
    }
}

impl CoreEvent for LockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LockEvent::Acquired { .. } => "acquired",
            LockEvent::Released { .. } => "released",
            LockEvent::Renewed { .. } => "renewed",
            LockEvent::Expired { .. } => "expired",
            LockEvent::ForceBroken { .. } => "force_broken",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            LockEvent::Acquired { timestamp, .. }
            | LockEvent::Released { timestamp, .. }
            | LockEvent::Renewed { timestamp, .. }
            | LockEvent::Expired { timestamp, .. }
            | LockEvent::ForceBroken { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        self.state_id()
    }
}
