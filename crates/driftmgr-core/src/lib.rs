//! Shared infrastructure used by every driftmgr crate:
//! - [`error::DriftError`], the unified error taxonomy
//! - [`events`], an observability event bus
//! - [`clock::Clock`], an injectable monotonic clock
//! - [`telemetry::Telemetry`], a best-effort counter/gauge/timer sink
//! - [`aimd`], a generic AIMD controller used by the adaptive rate limiter

pub mod aimd;
pub mod clock;
pub mod error;
pub mod events;
pub mod telemetry;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::DriftError;
pub use events::{CoreEvent, EventListener, EventListeners, FnListener};
pub use telemetry::{NullTelemetry, Telemetry};
