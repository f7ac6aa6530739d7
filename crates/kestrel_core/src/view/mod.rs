//! Typed projections over one entity.
//!
//! A view stores nothing but an entity id. Every accessor re-queries the
//! store and returns `None` when the entity is not of the view's kind or
//! the attribute is missing.

mod sensor;

pub use sensor::Sensor;

use crate::ecs::{ComponentKey, ComponentValue, Entity, EntityComponentStore, StoreExt};

/// Clone `key`'s value on `entity`, but only while `marker` is present.
fn marked_value<T: ComponentValue + Clone, M: ComponentValue>(
    store: &dyn EntityComponentStore,
    entity: Entity,
    marker: &ComponentKey<M>,
    key: &ComponentKey<T>,
) -> Option<T> {
    if !store.has(entity, marker) {
        return None;
    }
    store.value(entity, key).cloned()
}
