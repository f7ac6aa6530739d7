//! Kestrel Metrics - step and phase timing for the simulation loop
//!
//! Everything here compiles down to no-op stubs unless the `metrics`
//! feature is enabled, so instrumented call sites cost nothing in release
//! builds.
//!
//! # Usage
//!
//! ```ignore
//! use kestrel_metrics::{PhaseProfiler, StepTimer};
//!
//! let mut timer = StepTimer::new(256);
//! let mut profiler = PhaseProfiler::new();
//! timer.begin();
//! profiler.time_phase("update", || run_updates());
//! timer.end();
//! println!("{:.0} steps/s", timer.steps_per_second());
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod phase_profiler;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod step_timer;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use phase_profiler::{PhaseProfiler, PhaseTiming};
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use step_timer::StepTimer;

/// Whether this build collects metrics.
pub const ENABLED: bool = cfg!(feature = "metrics");

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
use std::time::Duration;

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTiming {
    pub total: Duration,
    pub calls: u64,
}

#[cfg(not(feature = "metrics"))]
impl PhaseTiming {
    pub fn mean(&self) -> Duration { Duration::ZERO }
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct PhaseProfiler;

#[cfg(not(feature = "metrics"))]
impl PhaseProfiler {
    pub fn new() -> Self { Self }
    pub fn time_phase<F, R>(&mut self, _name: &'static str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn timing(&self, _name: &str) -> PhaseTiming { PhaseTiming::default() }
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, PhaseTiming)> { std::iter::empty() }
    pub fn reset(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
pub struct StepTimer;

#[cfg(not(feature = "metrics"))]
impl StepTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn steps(&self) -> u64 { 0 }
    pub fn steps_per_second(&self) -> f64 { 0.0 }
    pub fn step_time_ms(&self) -> f64 { 0.0 }
    pub fn step_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn real_time_factor(&self, _step_size: Duration) -> f64 { 0.0 }
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str) {}
    pub fn add(&mut self, _name: &'static str, _value: u64) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> { std::iter::empty() }
}
