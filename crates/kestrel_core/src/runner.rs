//! Reference step driver
//!
//! Owns the schedule, the clock and the event queue, and applies the
//! bookkeeping that has to happen between steps: control events and
//! deferred entity removal.

use crate::ecs::{Entity, World};
use crate::events::{EventSink, SimEvent};
use crate::system::{
    ConfigPayload, ParameterRegistry, SystemError, SystemHandle, SystemRecord, SystemSchedule,
};
use crate::time::{SimulationClock, UpdateInfo};
use kestrel_metrics::{Counter, StepTimer};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Number of recent steps averaged by the step timer.
const TIMER_WINDOW: usize = 256;

/// A request to load systems that the runner cannot satisfy itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub entity: Entity,
    pub payload: ConfigPayload,
}

pub struct SimulationRunner {
    schedule: SystemSchedule,
    clock: SimulationClock,
    events: EventSink,
    params: ParameterRegistry,
    timer: StepTimer,
    counters: Counter,
    load_requests: Vec<LoadRequest>,
    stopped: bool,
}

impl SimulationRunner {
    pub fn new(step_size: Duration) -> Self {
        Self {
            schedule: SystemSchedule::new(),
            clock: SimulationClock::new(step_size),
            events: EventSink::new(),
            params: ParameterRegistry::new(),
            timer: StepTimer::new(TIMER_WINDOW),
            counters: Counter::new(),
            load_requests: Vec::new(),
            stopped: false,
        }
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn schedule(&self) -> &SystemSchedule {
        &self.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut SystemSchedule {
        &mut self.schedule
    }

    /// Handle systems and callers use to emit control events.
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn params(&self) -> &ParameterRegistry {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.params
    }

    pub fn timer(&self) -> &StepTimer {
        &self.timer
    }

    /// How many of each control event have been applied.
    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.clock.set_paused(paused);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Configure a record, add it to the schedule, and give it a chance to
    /// declare parameters.
    pub fn attach(
        &mut self,
        record: SystemRecord,
        config: ConfigPayload,
        world: &mut World,
    ) -> Result<SystemHandle, SystemError> {
        let handle = self.schedule.attach(record, config, world, &self.events)?;
        if let Some(record) = self.schedule.record(handle) {
            record.configure_parameters(&mut self.params, world)?;
        }
        Ok(handle)
    }

    /// Load requests emitted since the last call.
    pub fn take_load_requests(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.load_requests)
    }

    /// Execute one step.
    ///
    /// Paused steps still run every phase with a zero `dt`. Events emitted
    /// during the step take effect before the next one. Systems whose module
    /// was unloaded are detached and the step carries on without them.
    pub fn step(&mut self, world: &mut World) -> UpdateInfo {
        self.timer.begin();
        let info = self.clock.advance();
        let failed = self.schedule.step(&info, world);
        if !failed.is_empty() {
            self.counters.add("systems.detached", failed.len() as u64);
            warn!(iteration = info.iterations, detached = failed.len(), "systems dropped from schedule");
        }
        self.apply_events();

        for entity in world.process_removals() {
            let detached = self.schedule.detach_entity(entity);
            if detached > 0 {
                debug!(%entity, detached, "detached systems of removed entity");
            }
        }
        self.timer.end();
        info
    }

    /// Execute up to `steps` steps, paused ones included, stopping early on
    /// a stop event. `None` runs until stopped. Returns the steps executed.
    pub fn run(&mut self, world: &mut World, steps: Option<u64>) -> u64 {
        let mut executed = 0;
        while !self.stopped && steps.map_or(true, |steps| executed < steps) {
            self.step(world);
            executed += 1;
        }
        info!(
            executed,
            sim_time = ?self.clock.sim_time(),
            stopped = self.stopped,
            "simulation run finished"
        );
        executed
    }

    fn apply_events(&mut self) {
        for event in self.events.drain() {
            match event {
                SimEvent::Pause(paused) => {
                    self.counters.increment("events.pause");
                    if paused != self.clock.is_paused() {
                        info!(paused, "simulation pause state changed");
                    }
                    self.clock.set_paused(paused);
                }
                SimEvent::Stop => {
                    self.counters.increment("events.stop");
                    info!("simulation stop requested");
                    self.stopped = true;
                }
                SimEvent::LoadSystems { entity, payload } => {
                    self.counters.increment("events.load_systems");
                    debug!(%entity, "queued system load request");
                    self.load_requests.push(LoadRequest { entity, payload });
                }
            }
        }
    }
}
