//! Spawning the initial entity layout

use crate::settings::EntitySettings;
use kestrel_core::components::{NAME, PARENT_ENTITY};
use kestrel_core::ecs::{
    ComponentRegistry, Entity, EntityComponentStore, RegistryError, StoreError, StoreExt, World,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("entity '{entity}': {source}")]
    Component {
        entity: String,
        #[source]
        source: RegistryError,
    },

    #[error("entity '{entity}': {source}")]
    Store {
        entity: String,
        #[source]
        source: StoreError,
    },

    #[error("entity '{entity}' names unknown parent '{parent}'")]
    UnknownParent { entity: String, parent: String },
}

/// Spawn every entity in declaration order and give each its name, its
/// parent link and the components listed for it.
///
/// Components are built by name through `registry`, so two entries that
/// share a value type still land in their own slots.
pub fn spawn_entities(
    entities: &[EntitySettings],
    registry: &ComponentRegistry,
    world: &mut World,
) -> Result<Vec<Entity>, SceneError> {
    let mut spawned: HashMap<&str, Entity> = HashMap::with_capacity(entities.len());
    let mut order = Vec::with_capacity(entities.len());

    for settings in entities {
        let parent = match &settings.parent {
            Some(parent) => Some(*spawned.get(parent.as_str()).ok_or_else(|| {
                SceneError::UnknownParent {
                    entity: settings.name.clone(),
                    parent: parent.clone(),
                }
            })?),
            None => None,
        };

        let entity = world.spawn();
        let store_error = |source: StoreError| SceneError::Store {
            entity: settings.name.clone(),
            source,
        };
        world
            .create(entity, &NAME, settings.name.clone())
            .map_err(store_error)?;
        if let Some(parent) = parent {
            world
                .create(entity, &PARENT_ENTITY, parent)
                .map_err(store_error)?;
        }

        for (name, value) in &settings.components {
            let instance = registry
                .deserialize(name, value.clone())
                .map_err(|source| SceneError::Component {
                    entity: settings.name.clone(),
                    source,
                })?;
            world.create_component(entity, instance).map_err(store_error)?;
        }

        debug!(%entity, name = %settings.name, components = settings.components.len(), "spawned entity");
        spawned.insert(settings.name.as_str(), entity);
        order.push(entity);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::components::{self, LINEAR_VELOCITY_CMD, POSE, SENSOR, WORLD_LINEAR_VELOCITY_CMD};
    use kestrel_core::math::DVec3;
    use kestrel_core::view::Sensor;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::default();
        components::register_builtin(&mut registry).unwrap();
        registry
    }

    fn entity(name: &str, parent: Option<&str>, components: serde_json::Value) -> EntitySettings {
        let components: BTreeMap<String, serde_json::Value> =
            serde_json::from_value(components).unwrap();
        EntitySettings {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            components,
        }
    }

    #[test]
    fn spawns_entities_with_named_components() {
        let entities = vec![
            entity(
                "rover",
                None,
                json!({
                    "kestrel_components.LinearVelocityCmd": [1.0, 0.0, 0.0],
                    "kestrel_components.WorldLinearVelocityCmd": [0.0, 1.0, 0.0]
                }),
            ),
            entity(
                "lidar",
                Some("rover"),
                json!({
                    "kestrel_components.Sensor": null,
                    "kestrel_components.SensorTopic": "/lidar"
                }),
            ),
        ];
        let mut world = World::new();

        let spawned = spawn_entities(&entities, &registry(), &mut world).unwrap();

        let (rover, lidar) = (spawned[0], spawned[1]);
        assert_eq!(world.value(rover, &LINEAR_VELOCITY_CMD), Some(&DVec3::X));
        assert_eq!(world.value(rover, &WORLD_LINEAR_VELOCITY_CMD), Some(&DVec3::Y));
        assert!(!world.has(rover, &POSE));

        let sensor = Sensor::new(lidar);
        assert!(sensor.valid(&world));
        assert_eq!(sensor.name(&world).as_deref(), Some("lidar"));
        assert_eq!(sensor.topic(&world).as_deref(), Some("/lidar"));
        assert_eq!(sensor.parent(&world), Some(rover));
        assert!(world.has_component(lidar, SENSOR.id()));
    }

    #[test]
    fn unknown_component_names_the_entity() {
        let entities = vec![entity("rover", None, json!({ "kestrel_components.Mass": 3.0 }))];
        let mut world = World::new();

        let err = spawn_entities(&entities, &registry(), &mut world).unwrap_err();
        assert!(matches!(
            &err,
            SceneError::Component { entity, source: RegistryError::UnknownComponentName { .. } }
                if entity == "rover"
        ));
    }

    #[test]
    fn malformed_value_is_rejected() {
        let entities = vec![entity(
            "rover",
            None,
            json!({ "kestrel_components.LinearVelocityCmd": "fast" }),
        )];
        let mut world = World::new();

        assert!(matches!(
            spawn_entities(&entities, &registry(), &mut world),
            Err(SceneError::Component { source: RegistryError::Deserialize { .. }, .. })
        ));
    }

    #[test]
    fn parent_must_be_spawned_first() {
        let entities = vec![entity("lidar", Some("rover"), json!({}))];
        let mut world = World::new();

        assert!(matches!(
            spawn_entities(&entities, &registry(), &mut world),
            Err(SceneError::UnknownParent { .. })
        ));
    }
}
