use crate::ecs::{Entity, EntityComponentStore};
use crate::events::EventSink;
use crate::system::{ConfigPayload, HookKind, ParameterRegistry, SystemError, SystemRecord};
use crate::time::UpdateInfo;
use kestrel_metrics::PhaseProfiler;
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, warn};

/// Handle assigned to each scheduled system. Never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    /// Return the raw index backing this handle.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ScheduledSystem {
    handle: SystemHandle,
    record: SystemRecord,
}

/// Ordered set of attached systems and the per-phase routing built from
/// their hook tables.
///
/// Phase lists are rebuilt only when systems are attached or detached, so a
/// step never inspects which hooks a record has. `pre_update` and `update`
/// run sequentially in attach order; `post_update` runs in parallel
/// against a shared store.
pub struct SystemSchedule {
    systems: Vec<ScheduledSystem>,
    next_handle: u32,
    pre_update: Vec<usize>,
    update: Vec<usize>,
    post_update: Vec<usize>,
    profiler: PhaseProfiler,
}

impl SystemSchedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            next_handle: 0,
            pre_update: Vec::new(),
            update: Vec::new(),
            post_update: Vec::new(),
            profiler: PhaseProfiler::new(),
        }
    }

    /// Configure `record` with `config` and append it to the schedule.
    pub fn attach(
        &mut self,
        mut record: SystemRecord,
        config: ConfigPayload,
        store: &mut dyn EntityComponentStore,
        events: &EventSink,
    ) -> Result<SystemHandle, SystemError> {
        record.configure(config, store, events)?;
        Ok(self.push(record))
    }

    /// Append a record as-is.
    pub fn push(&mut self, record: SystemRecord) -> SystemHandle {
        let handle = SystemHandle(self.next_handle);
        self.next_handle += 1;
        debug!(%handle, system = record.name(), "scheduled system");
        self.systems.push(ScheduledSystem { handle, record });
        self.rebuild_phases();
        handle
    }

    /// Run every `configure_parameters` hook against `params`.
    pub fn configure_parameters(
        &self,
        params: &mut ParameterRegistry,
        store: &mut dyn EntityComponentStore,
    ) -> Result<(), SystemError> {
        for system in &self.systems {
            system.record.configure_parameters(params, &mut *store)?;
        }
        Ok(())
    }

    /// Replay the cached configuration of one system.
    pub fn reconfigure(
        &mut self,
        handle: SystemHandle,
        store: &mut dyn EntityComponentStore,
        events: &EventSink,
    ) -> Result<bool, SystemError> {
        match self.systems.iter_mut().find(|system| system.handle == handle) {
            Some(system) => system.record.reconfigure(store, events),
            None => Ok(false),
        }
    }

    /// Run one simulation step: every pre-update, then every update, then
    /// every post-update.
    ///
    /// A record whose hook fails (its module was unloaded) sits out the rest
    /// of the step and is detached afterwards; the other records keep
    /// running. Returns the handles detached this way, in attach order.
    pub fn step(
        &mut self,
        info: &UpdateInfo,
        store: &mut dyn EntityComponentStore,
    ) -> Vec<SystemHandle> {
        let failed = {
            let Self {
                systems,
                pre_update,
                update,
                post_update,
                profiler,
                ..
            } = self;
            let systems: &[ScheduledSystem] = systems;
            let mut failed: Vec<usize> = Vec::new();

            profiler.time_phase(HookKind::PreUpdate.as_str(), || {
                for &index in pre_update.iter() {
                    if let Err(err) = systems[index].record.pre_update(info, &mut *store) {
                        report_failure(&systems[index], HookKind::PreUpdate, &err);
                        failed.push(index);
                    }
                }
            });

            profiler.time_phase(HookKind::Update.as_str(), || {
                for &index in update.iter() {
                    if failed.contains(&index) {
                        continue;
                    }
                    if let Err(err) = systems[index].record.update(info, &mut *store) {
                        report_failure(&systems[index], HookKind::Update, &err);
                        failed.push(index);
                    }
                }
            });

            let shared: &dyn EntityComponentStore = &*store;
            let failed_post: Vec<usize> = profiler.time_phase(HookKind::PostUpdate.as_str(), || {
                post_update
                    .par_iter()
                    .filter(|index| !failed.contains(index))
                    .filter_map(|&index| {
                        let err = systems[index].record.post_update(info, shared).err()?;
                        report_failure(&systems[index], HookKind::PostUpdate, &err);
                        Some(index)
                    })
                    .collect()
            });
            failed.extend(failed_post);
            failed
        };

        self.detach_indices(failed)
    }

    /// Detach one system.
    pub fn detach(&mut self, handle: SystemHandle) -> bool {
        let Some(position) = self.systems.iter().position(|system| system.handle == handle) else {
            return false;
        };
        self.systems.remove(position).record.detach();
        self.rebuild_phases();
        true
    }

    /// Detach every system attached to `entity`. Returns how many were removed.
    pub fn detach_entity(&mut self, entity: Entity) -> usize {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.systems)
            .into_iter()
            .partition(|system| system.record.entity() == entity);
        self.systems = kept;

        let count = removed.len();
        for system in removed {
            system.record.detach();
        }
        if count > 0 {
            self.rebuild_phases();
        }
        count
    }

    /// Detach every system, in reverse attach order.
    pub fn clear(&mut self) {
        while let Some(system) = self.systems.pop() {
            system.record.detach();
        }
        self.rebuild_phases();
    }

    pub fn record(&self, handle: SystemHandle) -> Option<&SystemRecord> {
        self.systems
            .iter()
            .find(|system| system.handle == handle)
            .map(|system| &system.record)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SystemHandle, &SystemRecord)> {
        self.systems
            .iter()
            .map(|system| (system.handle, &system.record))
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Number of systems routed to `kind`.
    pub fn phase_len(&self, kind: HookKind) -> usize {
        match kind {
            HookKind::PreUpdate => self.pre_update.len(),
            HookKind::Update => self.update.len(),
            HookKind::PostUpdate => self.post_update.len(),
            HookKind::Configure | HookKind::ConfigureParameters => self
                .systems
                .iter()
                .filter(|system| system.record.has_hook(kind))
                .count(),
        }
    }

    /// Accumulated wall time per phase.
    pub fn profiler(&self) -> &PhaseProfiler {
        &self.profiler
    }

    fn detach_indices(&mut self, mut indices: Vec<usize>) -> Vec<SystemHandle> {
        if indices.is_empty() {
            return Vec::new();
        }
        indices.sort_unstable();
        indices.dedup();

        let mut handles = Vec::with_capacity(indices.len());
        for &index in indices.iter().rev() {
            let system = self.systems.remove(index);
            handles.push(system.handle);
            system.record.detach();
        }
        self.rebuild_phases();
        handles.reverse();
        handles
    }

    fn rebuild_phases(&mut self) {
        let route = |kind: HookKind| -> Vec<usize> {
            self.systems
                .iter()
                .enumerate()
                .filter(|(_, system)| system.record.has_hook(kind))
                .map(|(index, _)| index)
                .collect()
        };
        let pre_update = route(HookKind::PreUpdate);
        let update = route(HookKind::Update);
        let post_update = route(HookKind::PostUpdate);

        self.pre_update = pre_update;
        self.update = update;
        self.post_update = post_update;
    }
}

fn report_failure(system: &ScheduledSystem, phase: HookKind, err: &SystemError) {
    warn!(
        handle = %system.handle,
        system = system.record.name(),
        %phase,
        %err,
        "hook failed, detaching system"
    );
}

impl Default for SystemSchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SystemSchedule {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{LINEAR_VELOCITY_CMD, POSE};
    use crate::ecs::{StoreExt, World};
    use crate::math::{DVec3, Pose};
    use crate::system::record::tests::{FakeModule, FakePlugin, Recorder};
    use crate::system::{PostUpdate, PreUpdate, Update};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Appends a tag for every phase it sees to a shared log.
    struct Tracer {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl PreUpdate for Tracer {
        fn pre_update(&mut self, _info: &UpdateInfo, _store: &mut dyn EntityComponentStore) {
            self.log.lock().push(format!("{}:pre", self.tag));
        }
    }

    impl Update for Tracer {
        fn update(&mut self, _info: &UpdateInfo, _store: &mut dyn EntityComponentStore) {
            self.log.lock().push(format!("{}:update", self.tag));
        }
    }

    impl PostUpdate for Tracer {
        fn post_update(&mut self, _info: &UpdateInfo, _store: &dyn EntityComponentStore) {
            self.log.lock().push(format!("{}:post", self.tag));
        }
    }

    crate::impl_system!(Tracer: pre_update, update, post_update);

    /// Integrates the commanded velocity into the pose.
    struct Integrator(Entity);

    impl Update for Integrator {
        fn update(&mut self, info: &UpdateInfo, store: &mut dyn EntityComponentStore) {
            let entity = self.0;
            let Some(velocity) = store.value(entity, &LINEAR_VELOCITY_CMD).copied() else {
                return;
            };
            if let Some(pose) = store.value_mut(entity, &POSE) {
                pose.position += velocity * info.dt.as_secs_f64();
            }
        }
    }

    crate::impl_system!(Integrator: update);

    fn info(iterations: u64) -> UpdateInfo {
        UpdateInfo {
            iterations,
            dt: std::time::Duration::from_millis(100),
            ..UpdateInfo::default()
        }
    }

    #[test]
    fn phases_run_in_order_across_systems() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut world = World::new();
        let entity = world.spawn();
        let mut schedule = SystemSchedule::new();
        for tag in ["a", "b"] {
            schedule.push(SystemRecord::from_system(
                Tracer {
                    tag,
                    log: log.clone(),
                },
                entity,
            ));
        }

        schedule.step(&info(1), &mut world);

        let log = log.lock();
        assert_eq!(&log[..4], &["a:pre", "b:pre", "a:update", "b:update"]);
        let mut post: Vec<_> = log[4..].to_vec();
        post.sort();
        assert_eq!(post, vec!["a:post", "b:post"]);
    }

    #[test]
    fn capabilities_stay_fixed_over_many_steps() {
        let plugin = FakePlugin::new(FakeModule::loaded());
        let mut world = World::new();
        let entity = world.spawn();
        let events = EventSink::new();
        let mut schedule = SystemSchedule::new();
        let handle = schedule
            .attach(
                SystemRecord::from_plugin(plugin.clone(), entity).unwrap(),
                ConfigPayload::empty(),
                &mut world,
                &events,
            )
            .unwrap();

        for iteration in 1..=1000 {
            schedule.step(&info(iteration), &mut world);
            let record = schedule.record(handle).unwrap();
            assert!(!record.has_hook(HookKind::PreUpdate));
            assert!(!record.has_hook(HookKind::PostUpdate));
            assert!(record.has_hook(HookKind::Update));
        }

        assert_eq!(plugin.queries.load(Ordering::SeqCst), HookKind::ALL.len());
        assert_eq!(plugin.unit.lock().updates, 1000);
        assert_eq!(schedule.phase_len(HookKind::PreUpdate), 0);
        assert_eq!(schedule.phase_len(HookKind::Update), 1);
        assert_eq!(schedule.phase_len(HookKind::PostUpdate), 0);
    }

    #[test]
    fn update_hooks_mutate_the_store() {
        let mut world = World::new();
        let entity = world.spawn();
        world.create(entity, &POSE, Pose::IDENTITY).unwrap();
        world.create(entity, &LINEAR_VELOCITY_CMD, DVec3::X).unwrap();

        let mut schedule = SystemSchedule::new();
        schedule.push(SystemRecord::from_system(Integrator(entity), entity));
        for iteration in 1..=10 {
            schedule.step(&info(iteration), &mut world);
        }

        let pose = world.value(entity, &POSE).unwrap();
        assert!((pose.position.x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unloaded_module_detaches_only_its_own_record() {
        let module = FakeModule::loaded();
        let plugin = FakePlugin::new(module.clone());
        let mut world = World::new();
        let mut schedule = SystemSchedule::new();
        let owned = schedule.push(SystemRecord::from_plugin(plugin.clone(), world.spawn()).unwrap());
        let direct = schedule.push(SystemRecord::from_system(Recorder::default(), world.spawn()));

        assert!(schedule.step(&info(1), &mut world).is_empty());
        module.unload();
        assert_eq!(schedule.step(&info(2), &mut world), vec![owned]);
        for iteration in 3..=10 {
            assert!(schedule.step(&info(iteration), &mut world).is_empty());
        }

        assert_eq!(schedule.len(), 1);
        assert!(schedule.record(owned).is_none());
        assert_eq!(schedule.phase_len(HookKind::Update), 1);
        assert_eq!(plugin.unit.lock().updates, 1);
        let unit = schedule.record(direct).unwrap().unit::<Recorder>().unwrap();
        assert_eq!(unit.lock().updates, 10);
    }

    /// Counts how often its hook table is built.
    struct Counted {
        updates: usize,
    }

    static COUNTED_RESOLUTIONS: AtomicUsize = AtomicUsize::new(0);

    impl Update for Counted {
        fn update(&mut self, _info: &UpdateInfo, _store: &mut dyn EntityComponentStore) {
            self.updates += 1;
        }
    }

    impl crate::system::System for Counted {
        fn hooks(unit: &crate::system::Shared<Self>) -> crate::system::HookTable {
            COUNTED_RESOLUTIONS.fetch_add(1, Ordering::SeqCst);
            crate::system::HookTable::builder().update(unit).build()
        }
    }

    #[test]
    fn direct_units_resolve_hooks_once() {
        let mut world = World::new();
        let entity = world.spawn();
        let mut schedule = SystemSchedule::new();
        let handle = schedule.push(SystemRecord::from_system(Counted { updates: 0 }, entity));

        for iteration in 1..=1000 {
            schedule.step(&info(iteration), &mut world);
        }

        assert_eq!(COUNTED_RESOLUTIONS.load(Ordering::SeqCst), 1);
        let unit = schedule.record(handle).unwrap().unit::<Counted>().unwrap();
        assert_eq!(unit.lock().updates, 1000);
    }

    #[test]
    fn detaching_an_entity_reroutes_phases() {
        let mut world = World::new();
        let first = world.spawn();
        let second = world.spawn();
        let mut schedule = SystemSchedule::new();
        schedule.push(SystemRecord::from_system(Recorder::default(), first));
        let kept = schedule.push(SystemRecord::from_system(Recorder::default(), second));
        schedule.push(SystemRecord::from_system(Integrator(first), first));
        assert_eq!(schedule.phase_len(HookKind::Update), 3);

        assert_eq!(schedule.detach_entity(first), 2);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.phase_len(HookKind::Update), 1);
        assert!(schedule.record(kept).is_some());

        schedule.step(&info(1), &mut world);
        let unit = schedule.record(kept).unwrap().unit::<Recorder>().unwrap();
        assert_eq!(unit.lock().updates, 1);

        assert!(schedule.detach(kept));
        assert!(!schedule.detach(kept));
        assert!(schedule.is_empty());
    }

    #[test]
    fn reconfigure_by_handle_replays_cached_payload() {
        let mut world = World::new();
        let events = EventSink::new();
        let mut schedule = SystemSchedule::new();
        let payload = ConfigPayload::new(serde_json::json!({ "rate": 30 }));
        let handle = schedule
            .attach(
                SystemRecord::from_system(Recorder::default(), world.spawn()),
                payload.clone(),
                &mut world,
                &events,
            )
            .unwrap();

        assert!(schedule.reconfigure(handle, &mut world, &events).unwrap());
        let unit = schedule.record(handle).unwrap().unit::<Recorder>().unwrap();
        let recorder = unit.lock();
        assert_eq!(recorder.payloads.len(), 2);
        assert!(recorder.payloads.iter().all(|p| p.ptr_eq(&payload)));
    }
}
