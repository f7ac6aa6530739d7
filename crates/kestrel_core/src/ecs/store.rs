//! Store interface consumed by views and systems.
//!
//! The component store itself lives outside this crate's concerns; anything
//! that can answer these few questions can back a simulation. [`World`] is
//! the in-memory implementation.
//!
//! [`World`]: crate::ecs::World

use crate::ecs::{ComponentId, ComponentInstance, ComponentKey, ComponentValue, Entity};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("entity {entity} does not exist")]
    NoSuchEntity { entity: Entity },
}

/// Narrow read/write/has access to entity-keyed component storage.
///
/// The store does no write arbitration between systems; callers that run
/// systems concurrently must keep their write sets disjoint.
pub trait EntityComponentStore: Send + Sync {
    fn has_entity(&self, entity: Entity) -> bool;

    /// Attach `instance` to `entity`, replacing any value already held in
    /// the same slot.
    fn create_component(
        &mut self,
        entity: Entity,
        instance: ComponentInstance,
    ) -> Result<&mut ComponentInstance, StoreError>;

    fn component(&self, entity: Entity, id: ComponentId) -> Option<&ComponentInstance>;

    fn component_mut(&mut self, entity: Entity, id: ComponentId) -> Option<&mut ComponentInstance>;

    fn remove_component(&mut self, entity: Entity, id: ComponentId) -> Option<ComponentInstance>;

    fn has_component(&self, entity: Entity, id: ComponentId) -> bool {
        self.component(entity, id).is_some()
    }
}

/// Typed helpers over any [`EntityComponentStore`].
pub trait StoreExt: EntityComponentStore {
    fn create<T: ComponentValue>(
        &mut self,
        entity: Entity,
        key: &ComponentKey<T>,
        value: T,
    ) -> Result<&mut ComponentInstance, StoreError> {
        self.create_component(entity, ComponentInstance::new(key, value))
    }

    fn value<T: ComponentValue>(&self, entity: Entity, key: &ComponentKey<T>) -> Option<&T> {
        self.component(entity, key.id())?.value::<T>()
    }

    fn value_mut<T: ComponentValue>(
        &mut self,
        entity: Entity,
        key: &ComponentKey<T>,
    ) -> Option<&mut T> {
        self.component_mut(entity, key.id())?.value_mut::<T>()
    }

    /// Overwrite an existing value. Returns false if the component is absent.
    fn set_value<T: ComponentValue>(&mut self, entity: Entity, key: &ComponentKey<T>, value: T) -> bool {
        match self.value_mut(entity, key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn has<T: ComponentValue>(&self, entity: Entity, key: &ComponentKey<T>) -> bool {
        self.has_component(entity, key.id())
    }
}

impl<S: EntityComponentStore + ?Sized> StoreExt for S {}
