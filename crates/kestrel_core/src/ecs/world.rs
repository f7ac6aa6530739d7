// world.rs - In-memory entity-component store

use crate::components;
use crate::ecs::{ComponentId, ComponentInstance, Entity, EntityComponentStore, StoreError, StoreExt};
use std::collections::{hash_map::Entry, BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// In-memory store holding every entity and its component instances.
///
/// Entities are kept in id order so iteration is deterministic.
pub struct World {
    next_entity_id: u64,
    entities: BTreeMap<Entity, HashMap<ComponentId, ComponentInstance>>,
    pending_removals: BTreeSet<Entity>,
}

impl World {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self {
            next_entity_id: 1,
            entities: BTreeMap::new(),
            pending_removals: BTreeSet::new(),
        }
    }

    /// Spawn an entity with no components.
    pub fn spawn(&mut self) -> Entity {
        let entity = Entity::from_raw(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.insert(entity, HashMap::new());
        entity
    }

    /// Despawn an entity immediately, dropping all of its components.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.pending_removals.remove(&entity);
        self.entities.remove(&entity).is_some()
    }

    /// Queue an entity for removal at the end of the current step.
    ///
    /// Returns false if the entity does not exist.
    pub fn request_remove(&mut self, entity: Entity) -> bool {
        if !self.entities.contains_key(&entity) {
            return false;
        }
        self.pending_removals.insert(entity)
    }

    /// Apply queued removals and return the entities that were removed.
    pub fn process_removals(&mut self) -> Vec<Entity> {
        let pending = std::mem::take(&mut self.pending_removals);
        let removed: Vec<Entity> = pending
            .into_iter()
            .filter(|entity| self.entities.remove(entity).is_some())
            .collect();
        if !removed.is_empty() {
            debug!(count = removed.len(), "removed entities");
        }
        removed
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Live entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys().copied()
    }

    /// Components attached to `entity`, in no particular order.
    pub fn components_of(&self, entity: Entity) -> impl Iterator<Item = &ComponentInstance> {
        self.entities
            .get(&entity)
            .into_iter()
            .flat_map(|components| components.values())
    }

    /// First entity whose name component equals `name`.
    pub fn entity_by_name(&self, name: &str) -> Option<Entity> {
        self.entities()
            .find(|&entity| self.value(entity, &components::NAME).map(String::as_str) == Some(name))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityComponentStore for World {
    fn has_entity(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    fn create_component(
        &mut self,
        entity: Entity,
        instance: ComponentInstance,
    ) -> Result<&mut ComponentInstance, StoreError> {
        let components = self
            .entities
            .get_mut(&entity)
            .ok_or(StoreError::NoSuchEntity { entity })?;
        match components.entry(instance.id()) {
            Entry::Occupied(mut slot) => {
                slot.insert(instance);
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => Ok(slot.insert(instance)),
        }
    }

    fn component(&self, entity: Entity, id: ComponentId) -> Option<&ComponentInstance> {
        self.entities.get(&entity)?.get(&id)
    }

    fn component_mut(&mut self, entity: Entity, id: ComponentId) -> Option<&mut ComponentInstance> {
        self.entities.get_mut(&entity)?.get_mut(&id)
    }

    fn remove_component(&mut self, entity: Entity, id: ComponentId) -> Option<ComponentInstance> {
        self.entities.get_mut(&entity)?.remove(&id)
    }
}
