//! Wall-clock cost of simulation steps

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Rolling average of how long each simulation step takes to execute.
pub struct StepTimer {
    step_start: Instant,
    step_times: RingBuffer<Duration>,
    steps: u64,
}

impl StepTimer {
    /// `window` is the number of recent steps averaged over.
    pub fn new(window: usize) -> Self {
        Self {
            step_start: Instant::now(),
            step_times: RingBuffer::new(window),
            steps: 0,
        }
    }

    pub fn begin(&mut self) {
        self.step_start = Instant::now();
    }

    pub fn end(&mut self) {
        self.step_times.push(self.step_start.elapsed());
        self.steps += 1;
    }

    /// Steps timed since creation.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn steps_per_second(&self) -> f64 {
        let avg = self.step_times.average().as_secs_f64();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn step_time_ms(&self) -> f64 {
        self.step_times.average().as_secs_f64() * 1000.0
    }

    pub fn step_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.step_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    /// Simulated seconds per wall second at the current step rate.
    pub fn real_time_factor(&self, step_size: Duration) -> f64 {
        self.steps_per_second() * step_size.as_secs_f64()
    }
}
