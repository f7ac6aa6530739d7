//! Simulation control events
//!
//! Systems receive an [`EventSink`] when configured and may keep a clone of
//! it to emit events from later phases. The runner drains the queue after
//! every step.

use crate::ecs::Entity;
use crate::system::ConfigPayload;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// `true` pauses simulation, `false` resumes it.
    Pause(bool),
    /// Terminate the running simulation.
    Stop,
    /// Ask the owner to load systems for `entity` from `payload`.
    LoadSystems { entity: Entity, payload: ConfigPayload },
}

/// Cloneable handle onto one ordered event queue.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    queue: Arc<Mutex<VecDeque<SimEvent>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: SimEvent) {
        self.queue.lock().push_back(event);
    }

    /// Remove and return every queued event in emission order.
    pub fn drain(&self) -> Vec<SimEvent> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
