//! Built-in systems the runtime can attach by name.

use kestrel_core::components::{
    ANGULAR_VELOCITY_CMD, LINEAR_VELOCITY_CMD, NAME, POSE, WORLD_ANGULAR_VELOCITY_CMD,
    WORLD_LINEAR_VELOCITY_CMD,
};
use kestrel_core::ecs::{ComponentKey, Entity, EntityComponentStore, StoreExt};
use kestrel_core::events::{EventSink, SimEvent};
use kestrel_core::impl_system;
use kestrel_core::math::{DQuat, DVec3, Pose};
use kestrel_core::system::{
    Configure, ConfigPayload, ConfigureParameters, ParameterRegistry, PostUpdate, SystemRecord,
    Update,
};
use kestrel_core::time::UpdateInfo;
use kestrel_core::view::Sensor;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Names accepted by [`instantiate`].
pub const BUILTIN: &[&str] = &[
    "velocity_integrator",
    "pose_logger",
    "sensor_monitor",
    "stop_after",
];

/// Build the record for a built-in system attached to `entity`.
pub fn instantiate(name: &str, entity: Entity) -> Option<SystemRecord> {
    let record = match name {
        "velocity_integrator" => SystemRecord::from_system(VelocityIntegrator::default(), entity),
        "pose_logger" => SystemRecord::from_system(PoseLogger::default(), entity),
        "sensor_monitor" => SystemRecord::from_system(SensorMonitor::default(), entity),
        "stop_after" => SystemRecord::from_system(StopAfter::default(), entity),
        _ => return None,
    };
    Some(record)
}

/// Parse a configure payload, falling back to defaults when it is absent
/// or malformed.
fn parse_config<C: DeserializeOwned + Default>(system: &str, config: &ConfigPayload) -> C {
    if config.as_value().is_null() {
        return C::default();
    }
    match C::deserialize(config.as_value()) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(system, %err, "malformed config, using defaults");
            C::default()
        }
    }
}

// ============================================================================
// Velocity integrator
// ============================================================================

/// Integrates the four velocity commands into the entity's pose.
#[derive(Default)]
pub struct VelocityIntegrator {
    entity: Entity,
}

impl Configure for VelocityIntegrator {
    fn configure(
        &mut self,
        entity: Entity,
        _config: &ConfigPayload,
        store: &mut dyn EntityComponentStore,
        _events: &EventSink,
    ) {
        self.entity = entity;
        if !store.has(entity, &POSE) {
            if let Err(err) = store.create(entity, &POSE, Pose::IDENTITY) {
                warn!(%entity, %err, "velocity integrator has no pose to drive");
            }
        }
    }
}

impl Update for VelocityIntegrator {
    fn update(&mut self, info: &UpdateInfo, store: &mut dyn EntityComponentStore) {
        let dt = info.dt.as_secs_f64();
        if dt == 0.0 {
            return;
        }

        let command = |key: &ComponentKey<DVec3>| {
            store
                .value(self.entity, key)
                .copied()
                .unwrap_or(DVec3::ZERO)
        };
        let linear = command(&LINEAR_VELOCITY_CMD);
        let world_linear = command(&WORLD_LINEAR_VELOCITY_CMD);
        let angular = command(&ANGULAR_VELOCITY_CMD);
        let world_angular = command(&WORLD_ANGULAR_VELOCITY_CMD);

        let Some(pose) = store.value_mut(self.entity, &POSE) else {
            return;
        };
        pose.position += (pose.rotation * linear + world_linear) * dt;
        pose.rotation = (DQuat::from_scaled_axis(world_angular * dt)
            * pose.rotation
            * DQuat::from_scaled_axis(angular * dt))
        .normalize();
    }
}

impl_system!(VelocityIntegrator: configure, update);

// ============================================================================
// Pose logger
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PoseLoggerConfig {
    /// Log every `period` unpaused steps.
    period: u64,
}

impl Default for PoseLoggerConfig {
    fn default() -> Self {
        Self { period: 1000 }
    }
}

#[derive(Default)]
pub struct PoseLogger {
    entity: Entity,
    period: u64,
}

impl Configure for PoseLogger {
    fn configure(
        &mut self,
        entity: Entity,
        config: &ConfigPayload,
        _store: &mut dyn EntityComponentStore,
        _events: &EventSink,
    ) {
        let config: PoseLoggerConfig = parse_config("pose_logger", config);
        self.entity = entity;
        self.period = config.period.max(1);
    }
}

impl ConfigureParameters for PoseLogger {
    fn configure_parameters(
        &mut self,
        params: &mut ParameterRegistry,
        _store: &mut dyn EntityComponentStore,
    ) {
        let name = format!("pose_logger.{}.period", self.entity);
        if let Err(err) = params.declare(name, self.period.into()) {
            warn!(%err, "pose logger parameter not declared");
        }
    }
}

impl PostUpdate for PoseLogger {
    fn post_update(&mut self, info: &UpdateInfo, store: &dyn EntityComponentStore) {
        if info.paused || self.period == 0 || info.iterations % self.period != 0 {
            return;
        }
        let Some(pose) = store.value(self.entity, &POSE) else {
            return;
        };
        let name = store.value(self.entity, &NAME).map(String::as_str).unwrap_or("<unnamed>");
        let (axis, angle) = pose.rotation.to_axis_angle();
        let sim_time = info.sim_time + info.dt;
        info!(
            entity = name,
            ?sim_time,
            position = ?pose.position,
            yaw = angle * axis.z.signum(),
            "pose"
        );
    }
}

impl_system!(PoseLogger: configure, configure_parameters, post_update);

// ============================================================================
// Sensor monitor
// ============================================================================

/// Reports a sensor's topic and world placement once, on the first step.
#[derive(Default)]
pub struct SensorMonitor {
    sensor: Sensor,
    reported: bool,
}

impl SensorMonitor {
    /// Chain the sensor pose through its parent's pose, if it has one.
    fn world_pose(&self, store: &dyn EntityComponentStore) -> Option<Pose> {
        let local = self.sensor.pose(store)?;
        match self.sensor.parent(store) {
            Some(parent) => store.value(parent, &POSE).map(|frame| frame.compose(&local)),
            None => Some(local),
        }
    }
}

impl Configure for SensorMonitor {
    fn configure(
        &mut self,
        entity: Entity,
        _config: &ConfigPayload,
        _store: &mut dyn EntityComponentStore,
        _events: &EventSink,
    ) {
        self.sensor.reset_entity(entity);
        self.reported = false;
    }
}

impl PostUpdate for SensorMonitor {
    fn post_update(&mut self, _info: &UpdateInfo, store: &dyn EntityComponentStore) {
        if self.reported {
            return;
        }
        self.reported = true;

        if !self.sensor.valid(store) {
            warn!(entity = %self.sensor.entity(), "sensor monitor attached to a non-sensor entity");
            return;
        }
        let name = self.sensor.name(store).unwrap_or_else(|| "<unnamed>".into());
        let topic = self.sensor.topic(store).unwrap_or_else(|| "<none>".into());
        let position = self.world_pose(store).map(|pose| pose.position);
        info!(sensor = %name, topic = %topic, ?position, "sensor online");
    }
}

impl_system!(SensorMonitor: configure, post_update);

// ============================================================================
// Stop after
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StopAfterConfig {
    /// Simulation time after which a stop is requested. Zero never stops.
    sim_time_s: f64,
}

#[derive(Default)]
pub struct StopAfter {
    limit: Option<Duration>,
    events: Option<EventSink>,
    requested: bool,
}

impl Configure for StopAfter {
    fn configure(
        &mut self,
        _entity: Entity,
        config: &ConfigPayload,
        _store: &mut dyn EntityComponentStore,
        events: &EventSink,
    ) {
        let config: StopAfterConfig = parse_config("stop_after", config);
        self.limit = (config.sim_time_s.is_finite() && config.sim_time_s > 0.0)
            .then(|| Duration::from_secs_f64(config.sim_time_s));
        self.events = Some(events.clone());
        self.requested = false;
        debug!(limit = ?self.limit, "stop_after configured");
    }
}

impl PostUpdate for StopAfter {
    fn post_update(&mut self, info: &UpdateInfo, _store: &dyn EntityComponentStore) {
        let (Some(limit), Some(events)) = (self.limit, &self.events) else {
            return;
        };
        if !self.requested && info.sim_time + info.dt >= limit {
            self.requested = true;
            events.emit(SimEvent::Stop);
        }
    }
}

impl_system!(StopAfter: configure, post_update);
