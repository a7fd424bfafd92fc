//! Best-effort, non-blocking telemetry sink.
//!
//! The spec treats the telemetry sink as an external collaborator (§6): a
//! place to emit counters/gauges/timers without the core caring where they
//! end up. Implementations must never block or fail the caller — a sink
//! that can't reach its backend drops the sample.

use std::time::Duration;

/// Counter, gauge, and timer emission, implemented by an external
/// collaborator (e.g. a Prometheus or StatsD sink).
pub trait Telemetry: Send + Sync {
    /// Increments a named counter by `value`.
    fn counter(&self, name: &'static str, value: u64);

    /// Sets a named gauge to `value`.
    fn gauge(&self, name: &'static str, value: f64);

    /// Records a duration against a named timer.
    fn timer(&self, name: &'static str, duration: Duration);
}

/// A [`Telemetry`] sink that discards everything. Used where no sink is
/// configured, so call sites never need an `Option<Arc<dyn Telemetry>>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn counter(&self, _name: &'static str, _value: u64) {}
    fn gauge(&self, _name: &'static str, _value: f64) {}
    fn timer(&self, _name: &'static str, _duration: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_telemetry_accepts_everything() {
        let sink = NullTelemetry;
        sink.counter("x", 1);
        sink.gauge("y", 1.0);
        sink.timer("z", Duration::from_millis(1));
    }
}
