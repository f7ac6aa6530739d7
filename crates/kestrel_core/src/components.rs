//! Built-in component catalog
//!
//! Several entries share a value type on purpose: the velocity commands are
//! all `DVec3`, and the name and topic are both `String`. Their
//! discriminators keep them in separate slots.

use crate::define_component;
use crate::ecs::{ComponentRegistry, Entity, RegistryError};
use crate::math::{DVec3, Pose};

define_component!(
    /// Unscoped entity name.
    pub NAME: String = "kestrel_components.Name", "NameTag"
);

define_component!(
    /// Pose relative to the parent entity.
    pub POSE: Pose = "kestrel_components.Pose", "PoseTag"
);

define_component!(
    /// Marks an entity as a sensor.
    pub SENSOR: () = "kestrel_components.Sensor", "SensorTag"
);

define_component!(
    /// Topic a sensor publishes on.
    pub SENSOR_TOPIC: String = "kestrel_components.SensorTopic", "SensorTopicTag"
);

define_component!(
    /// Entity this one is attached to (a link, a joint, a model).
    pub PARENT_ENTITY: Entity = "kestrel_components.ParentEntity", "ParentEntityTag"
);

define_component!(
    /// Commanded linear velocity, expressed in the entity's frame.
    pub LINEAR_VELOCITY_CMD: DVec3 = "kestrel_components.LinearVelocityCmd", "LinearVelocityCmdTag"
);

define_component!(
    /// Commanded linear velocity, expressed in the world frame.
    pub WORLD_LINEAR_VELOCITY_CMD: DVec3 =
        "kestrel_components.WorldLinearVelocityCmd", "WorldLinearVelocityCmdTag"
);

define_component!(
    /// Commanded angular velocity, expressed in the entity's frame.
    pub ANGULAR_VELOCITY_CMD: DVec3 = "kestrel_components.AngularVelocityCmd", "AngularVelocityCmdTag"
);

define_component!(
    /// Commanded angular velocity, expressed in the world frame.
    pub WORLD_ANGULAR_VELOCITY_CMD: DVec3 =
        "kestrel_components.WorldAngularVelocityCmd", "WorldAngularVelocityCmdTag"
);

/// Register every built-in component with `registry`.
///
/// Safe to call more than once on the same registry.
pub fn register_builtin(registry: &mut ComponentRegistry) -> Result<(), RegistryError> {
    registry.register_key(&NAME)?;
    registry.register_key(&POSE)?;
    registry.register_key(&SENSOR)?;
    registry.register_key(&SENSOR_TOPIC)?;
    registry.register_key(&PARENT_ENTITY)?;
    registry.register_key(&LINEAR_VELOCITY_CMD)?;
    registry.register_key(&WORLD_LINEAR_VELOCITY_CMD)?;
    registry.register_key(&ANGULAR_VELOCITY_CMD)?;
    registry.register_key(&WORLD_ANGULAR_VELOCITY_CMD)?;
    Ok(())
}
