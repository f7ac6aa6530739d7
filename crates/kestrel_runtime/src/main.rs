//! Kestrel Runtime
//!
//! Loads run settings, spawns the described entities, attaches built-in
//! systems and steps the simulation.
//!
//! Usage: `kestrel [settings.json]`. Without an argument the bundled rover
//! demo runs.

mod systems;

use anyhow::{Context, Result};
use kestrel_core::components;
use kestrel_core::ecs::{ComponentRegistry, World};
use kestrel_core::runner::SimulationRunner;
use kestrel_core::system::ConfigPayload;
use kestrel_services::{spawn_entities, Settings};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_SETTINGS: &str = include_str!("../demos/rover.json");

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Kestrel v{}", kestrel_core::VERSION);

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("failed to load settings from {path}"))?,
        None => {
            info!("No settings file given, running the rover demo");
            Settings::from_json(DEMO_SETTINGS).context("built-in demo settings are invalid")?
        }
    };

    let mut registry = ComponentRegistry::default();
    components::register_builtin(&mut registry).context("failed to register built-in components")?;

    let mut world = World::new();
    let spawned = spawn_entities(&settings.entities, &registry, &mut world)
        .context("failed to spawn entities")?;
    info!(
        entities = spawned.len(),
        component_types = registry.len(),
        "Scene ready"
    );

    let mut runner = SimulationRunner::new(settings.simulation.step_size());
    runner.set_paused(settings.simulation.start_paused);
    attach_systems(&settings, &mut runner, &mut world)?;

    let executed = runner.run(&mut world, settings.simulation.steps);
    for request in runner.take_load_requests() {
        warn!(entity = %request.entity, "No plugin loader available, dropping system load request");
    }

    report(&runner, executed);
    Ok(())
}

fn attach_systems(settings: &Settings, runner: &mut SimulationRunner, world: &mut World) -> Result<()> {
    for system in &settings.systems {
        let entity = world.entity_by_name(&system.entity_name).with_context(|| {
            format!(
                "system '{}' targets missing entity '{}'",
                system.name, system.entity_name
            )
        })?;
        let record = systems::instantiate(&system.name, entity).with_context(|| {
            format!(
                "unknown system '{}' (built-in: {})",
                system.name,
                systems::BUILTIN.join(", ")
            )
        })?;
        runner
            .attach(record, ConfigPayload::new(system.config.clone()), world)
            .with_context(|| format!("failed to attach system '{}'", system.name))?;
        info!(system = %system.name, entity = %system.entity_name, "Attached system");
    }
    Ok(())
}

fn report(runner: &SimulationRunner, executed: u64) {
    let clock = runner.clock();
    let timer = runner.timer();
    let (min_ms, max_ms) = timer.step_time_range_ms();
    info!(
        executed,
        sim_time = ?clock.sim_time(),
        steps_per_second = %format!("{:.0}", timer.steps_per_second()),
        real_time_factor = %format!("{:.1}", timer.real_time_factor(clock.step_size())),
        step_ms_min = min_ms,
        step_ms_max = max_ms,
        "Run summary"
    );

    for (phase, timing) in runner.schedule().profiler().iter() {
        info!(phase, calls = timing.calls, total = ?timing.total, mean = ?timing.mean(), "Phase timing");
    }
    for (name, count) in runner.counters().iter() {
        info!(event = name, count, "Control events");
    }
    for (name, value) in runner.params().iter() {
        debug!(parameter = name, %value, "Declared parameter");
    }
}
