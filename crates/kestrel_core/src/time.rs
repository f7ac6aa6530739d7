//! Deterministic simulation time
//!
//! Fixed step size; simulation time only advances while unpaused.

use std::time::{Duration, Instant};

/// Default simulation step (1 kHz).
pub const DEFAULT_STEP_SIZE: Duration = Duration::from_millis(1);

/// Read-only description of the step being executed, handed to every
/// update hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateInfo {
    /// Simulation time elapsed at the start of this step.
    pub sim_time: Duration,
    /// Simulation time this step advances by. Zero while paused.
    pub dt: Duration,
    /// Number of unpaused steps executed so far, including this one.
    pub iterations: u64,
    /// Whether simulation is paused for this step.
    pub paused: bool,
    /// Wall-clock time since the clock was created.
    pub real_time: Duration,
}

/// Simulation clock producing one [`UpdateInfo`] per step.
pub struct SimulationClock {
    step_size: Duration,
    sim_time: Duration,
    iterations: u64,
    paused: bool,
    started: Instant,
}

impl SimulationClock {
    pub fn new(step_size: Duration) -> Self {
        Self {
            step_size,
            sim_time: Duration::ZERO,
            iterations: 0,
            paused: false,
            started: Instant::now(),
        }
    }

    pub fn step_size(&self) -> Duration {
        self.step_size
    }

    pub fn sim_time(&self) -> Duration {
        self.sim_time
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Describe the next step and advance the clock past it.
    pub fn advance(&mut self) -> UpdateInfo {
        let dt = if self.paused {
            Duration::ZERO
        } else {
            self.iterations += 1;
            self.step_size
        };

        let info = UpdateInfo {
            sim_time: self.sim_time,
            dt,
            iterations: self.iterations,
            paused: self.paused,
            real_time: self.started.elapsed(),
        };
        self.sim_time += dt;
        info
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_SIZE)
    }
}
