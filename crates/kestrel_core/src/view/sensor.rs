use crate::components::{NAME, PARENT_ENTITY, POSE, SENSOR, SENSOR_TOPIC};
use crate::ecs::{Entity, EntityComponentStore, StoreExt};
use crate::math::Pose;
use crate::view::marked_value;

/// View over an entity carrying the sensor marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sensor {
    entity: Entity,
}

impl Sensor {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Point the view at another entity.
    pub fn reset_entity(&mut self, entity: Entity) {
        self.entity = entity;
    }

    /// Whether the entity currently carries the sensor marker.
    pub fn valid(&self, store: &dyn EntityComponentStore) -> bool {
        store.has(self.entity, &SENSOR)
    }

    pub fn name(&self, store: &dyn EntityComponentStore) -> Option<String> {
        marked_value(store, self.entity, &SENSOR, &NAME)
    }

    /// Pose relative to the parent.
    pub fn pose(&self, store: &dyn EntityComponentStore) -> Option<Pose> {
        marked_value(store, self.entity, &SENSOR, &POSE)
    }

    pub fn topic(&self, store: &dyn EntityComponentStore) -> Option<String> {
        marked_value(store, self.entity, &SENSOR, &SENSOR_TOPIC)
    }

    pub fn parent(&self, store: &dyn EntityComponentStore) -> Option<Entity> {
        marked_value(store, self.entity, &SENSOR, &PARENT_ENTITY)
    }
}
