use crate::ecs::{Entity, EntityComponentStore};
use crate::events::EventSink;
use crate::system::{
    ConfigPayload, HookKind, HookTable, Module, ParameterRegistry, Shared, System, SystemError,
    SystemPlugin,
};
use crate::time::UpdateInfo;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How the lifetime of a record's hooks is anchored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OwnershipMode {
    /// Hooks point into a loaded module and are valid only while it stays loaded.
    ModuleOwned,
    /// Hooks share ownership of a directly instantiated unit.
    DirectlyOwned,
}

enum Ownership {
    Module {
        plugin: Arc<dyn SystemPlugin>,
        module: Arc<dyn Module>,
    },
    Direct {
        unit: Arc<dyn Any + Send + Sync>,
    },
}

/// One attached system with its capabilities resolved.
///
/// The hook table is filled once, in the constructor, and never changes.
/// Dropping or [detaching](Self::detach) the record releases the hooks
/// before the module or unit that backs them.
pub struct SystemRecord {
    // Field order matters: hooks must drop before `ownership`.
    hooks: HookTable,
    ownership: Ownership,
    name: String,
    entity: Entity,
    config: Option<ConfigPayload>,
}

impl SystemRecord {
    /// Wrap a directly instantiated system attached to `entity`.
    pub fn from_system<U: System>(unit: U, entity: Entity) -> Self {
        Self::from_shared(Arc::new(Mutex::new(unit)), entity)
    }

    /// Wrap a system the caller keeps a shared handle to.
    pub fn from_shared<U: System>(unit: Shared<U>, entity: Entity) -> Self {
        let hooks = U::hooks(&unit);
        let name = unit.lock().name().to_string();
        debug!(system = %name, %entity, hooks = ?hooks, "attached system");
        Self {
            hooks,
            ownership: Ownership::Direct { unit },
            name,
            entity,
            config: None,
        }
    }

    /// Resolve a plugin's hooks, querying each phase exactly once.
    ///
    /// Fails with [`SystemError::OwnershipViolation`] if the plugin's module
    /// is not loaded, which aborts the attachment.
    pub fn from_plugin(plugin: Arc<dyn SystemPlugin>, entity: Entity) -> Result<Self, SystemError> {
        let module = plugin.module();
        let name = plugin.name().to_string();
        if !module.is_loaded() {
            return Err(SystemError::OwnershipViolation {
                system: name,
                module: module.name().to_string(),
            });
        }

        let mut hooks = HookTable::default();
        for kind in HookKind::ALL {
            let Some(hook) = plugin.query_hook(kind) else {
                continue;
            };
            if hook.kind() != kind {
                return Err(SystemError::HookKindMismatch {
                    system: name,
                    requested: kind,
                    returned: hook.kind(),
                });
            }
            hooks.insert(hook);
        }

        if !module.is_loaded() {
            return Err(SystemError::OwnershipViolation {
                system: name,
                module: module.name().to_string(),
            });
        }

        debug!(system = %name, module = module.name(), %entity, hooks = ?hooks, "attached plugin system");
        Ok(Self {
            hooks,
            ownership: Ownership::Module { plugin, module },
            name,
            entity,
            config: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity the system is attached to.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn ownership_mode(&self) -> OwnershipMode {
        match self.ownership {
            Ownership::Module { .. } => OwnershipMode::ModuleOwned,
            Ownership::Direct { .. } => OwnershipMode::DirectlyOwned,
        }
    }

    pub fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    pub fn has_hook(&self, kind: HookKind) -> bool {
        self.hooks.contains(kind)
    }

    /// Payload from the most recent `configure` call.
    pub fn config(&self) -> Option<&ConfigPayload> {
        self.config.as_ref()
    }

    /// Shared handle to a directly owned unit of type `U`.
    pub fn unit<U: System>(&self) -> Option<Shared<U>> {
        match &self.ownership {
            Ownership::Direct { unit } => unit.clone().downcast::<Mutex<U>>().ok(),
            Ownership::Module { .. } => None,
        }
    }

    /// The plugin backing a module-owned record.
    pub fn plugin(&self) -> Option<&Arc<dyn SystemPlugin>> {
        match &self.ownership {
            Ownership::Module { plugin, .. } => Some(plugin),
            Ownership::Direct { .. } => None,
        }
    }

    /// Cache `config` and run the configure hook if the unit has one.
    ///
    /// May be called again later; the newest payload replaces the cached one.
    pub fn configure(
        &mut self,
        config: ConfigPayload,
        store: &mut dyn EntityComponentStore,
        events: &EventSink,
    ) -> Result<(), SystemError> {
        self.ensure_loaded()?;
        self.config = Some(config);
        self.replay_configure(store, events)
    }

    /// Run the configure hook again with the cached payload.
    ///
    /// Returns `Ok(false)` if the record was never configured.
    pub fn reconfigure(
        &mut self,
        store: &mut dyn EntityComponentStore,
        events: &EventSink,
    ) -> Result<bool, SystemError> {
        self.ensure_loaded()?;
        if self.config.is_none() {
            return Ok(false);
        }
        self.replay_configure(store, events)?;
        Ok(true)
    }

    pub fn configure_parameters(
        &self,
        params: &mut ParameterRegistry,
        store: &mut dyn EntityComponentStore,
    ) -> Result<(), SystemError> {
        if let Some(hook) = self.hooks.configure_parameters() {
            self.ensure_loaded()?;
            hook.lock().configure_parameters(params, store);
        }
        Ok(())
    }

    pub fn pre_update(
        &self,
        info: &UpdateInfo,
        store: &mut dyn EntityComponentStore,
    ) -> Result<(), SystemError> {
        if let Some(hook) = self.hooks.pre_update() {
            self.ensure_loaded()?;
            hook.lock().pre_update(info, store);
        }
        Ok(())
    }

    pub fn update(
        &self,
        info: &UpdateInfo,
        store: &mut dyn EntityComponentStore,
    ) -> Result<(), SystemError> {
        if let Some(hook) = self.hooks.update() {
            self.ensure_loaded()?;
            hook.lock().update(info, store);
        }
        Ok(())
    }

    pub fn post_update(
        &self,
        info: &UpdateInfo,
        store: &dyn EntityComponentStore,
    ) -> Result<(), SystemError> {
        if let Some(hook) = self.hooks.post_update() {
            self.ensure_loaded()?;
            hook.lock().post_update(info, store);
        }
        Ok(())
    }

    /// Detach the system, releasing its hooks before the backing module or unit.
    pub fn detach(self) {
        let SystemRecord {
            hooks,
            ownership,
            name,
            entity,
            ..
        } = self;
        drop(hooks);
        drop(ownership);
        debug!(system = %name, %entity, "detached system");
    }

    fn replay_configure(
        &self,
        store: &mut dyn EntityComponentStore,
        events: &EventSink,
    ) -> Result<(), SystemError> {
        if let (Some(hook), Some(config)) = (self.hooks.configure(), self.config.as_ref()) {
            hook.lock().configure(self.entity, config, store, events);
        }
        Ok(())
    }

    fn ensure_loaded(&self) -> Result<(), SystemError> {
        match &self.ownership {
            Ownership::Module { module, .. } if !module.is_loaded() => {
                Err(SystemError::OwnershipViolation {
                    system: self.name.clone(),
                    module: module.name().to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for SystemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRecord")
            .field("name", &self.name)
            .field("entity", &self.entity)
            .field("ownership", &self.ownership_mode())
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ecs::World;
    use crate::system::{Configure, Hook, Update};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Records every configure payload and counts updates.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) payloads: Vec<ConfigPayload>,
        pub(crate) updates: usize,
    }

    impl Configure for Recorder {
        fn configure(
            &mut self,
            _entity: Entity,
            config: &ConfigPayload,
            _store: &mut dyn EntityComponentStore,
            _events: &EventSink,
        ) {
            self.payloads.push(config.clone());
        }
    }

    impl Update for Recorder {
        fn update(&mut self, _info: &UpdateInfo, _store: &mut dyn EntityComponentStore) {
            self.updates += 1;
        }
    }

    crate::impl_system!(Recorder: configure, update);

    pub(crate) struct FakeModule {
        loaded: AtomicBool,
    }

    impl FakeModule {
        pub(crate) fn loaded() -> Arc<Self> {
            Arc::new(Self {
                loaded: AtomicBool::new(true),
            })
        }

        pub(crate) fn unload(&self) {
            self.loaded.store(false, Ordering::SeqCst);
        }
    }

    impl Module for FakeModule {
        fn name(&self) -> &str {
            "libfake.so"
        }

        fn is_loaded(&self) -> bool {
            self.loaded.load(Ordering::SeqCst)
        }
    }

    /// Plugin exposing a [`Recorder`] and counting capability queries.
    pub(crate) struct FakePlugin {
        pub(crate) module: Arc<FakeModule>,
        pub(crate) unit: Shared<Recorder>,
        pub(crate) queries: AtomicUsize,
    }

    impl FakePlugin {
        pub(crate) fn new(module: Arc<FakeModule>) -> Arc<Self> {
            Arc::new(Self {
                module,
                unit: Arc::new(Mutex::new(Recorder::default())),
                queries: AtomicUsize::new(0),
            })
        }
    }

    impl SystemPlugin for FakePlugin {
        fn name(&self) -> &str {
            "fake::Recorder"
        }

        fn module(&self) -> Arc<dyn Module> {
            self.module.clone()
        }

        fn query_hook(&self, kind: HookKind) -> Option<Hook> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            match kind {
                HookKind::Configure => Some(Hook::Configure(self.unit.clone())),
                HookKind::Update => Some(Hook::Update(self.unit.clone())),
                _ => None,
            }
        }
    }

    struct LyingPlugin {
        module: Arc<FakeModule>,
    }

    impl SystemPlugin for LyingPlugin {
        fn name(&self) -> &str {
            "liar"
        }

        fn module(&self) -> Arc<dyn Module> {
            self.module.clone()
        }

        fn query_hook(&self, kind: HookKind) -> Option<Hook> {
            match kind {
                HookKind::PreUpdate => {
                    let unit: Shared<Recorder> = Arc::new(Mutex::new(Recorder::default()));
                    Some(Hook::Update(unit))
                }
                _ => None,
            }
        }
    }

    #[test]
    fn direct_record_resolves_declared_hooks() {
        let record = SystemRecord::from_system(Recorder::default(), Entity::from_raw(3));

        assert_eq!(record.ownership_mode(), OwnershipMode::DirectlyOwned);
        assert_eq!(record.entity(), Entity::from_raw(3));
        assert!(record.has_hook(HookKind::Configure));
        assert!(record.has_hook(HookKind::Update));
        assert!(!record.has_hook(HookKind::ConfigureParameters));
        assert!(!record.has_hook(HookKind::PreUpdate));
        assert!(!record.has_hook(HookKind::PostUpdate));
        assert!(record.plugin().is_none());
    }

    #[test]
    fn reconfigure_replays_identical_payload() {
        let mut world = World::new();
        let events = EventSink::new();
        let entity = world.spawn();
        let mut record = SystemRecord::from_system(Recorder::default(), entity);
        assert!(!record.reconfigure(&mut world, &events).unwrap());

        let payload = ConfigPayload::new(json!({ "gain": 2.5, "topic": "/cmd_vel" }));
        record.configure(payload.clone(), &mut world, &events).unwrap();
        assert!(record.reconfigure(&mut world, &events).unwrap());

        let unit = record.unit::<Recorder>().unwrap();
        let recorder = unit.lock();
        assert_eq!(recorder.payloads.len(), 2);
        assert_eq!(recorder.payloads[0], recorder.payloads[1]);
        assert!(recorder.payloads[0].ptr_eq(&recorder.payloads[1]));
        assert!(recorder.payloads[1].ptr_eq(&payload));
        assert!(record.config().unwrap().ptr_eq(&payload));
    }

    #[test]
    fn configure_caches_payload_even_without_hook() {
        struct Silent;
        impl Update for Silent {
            fn update(&mut self, _info: &UpdateInfo, _store: &mut dyn EntityComponentStore) {}
        }
        crate::impl_system!(Silent: update);

        let mut world = World::new();
        let mut record = SystemRecord::from_system(Silent, world.spawn());
        let payload = ConfigPayload::new(json!("opaque"));
        record
            .configure(payload.clone(), &mut world, &EventSink::new())
            .unwrap();
        assert_eq!(record.config(), Some(&payload));
    }

    #[test]
    fn absent_phases_are_skipped_without_error() {
        let mut world = World::new();
        let record = SystemRecord::from_system(Recorder::default(), world.spawn());
        let info = UpdateInfo::default();

        record.pre_update(&info, &mut world).unwrap();
        record.update(&info, &mut world).unwrap();
        record.post_update(&info, &world).unwrap();
        record
            .configure_parameters(&mut ParameterRegistry::new(), &mut world)
            .unwrap();

        assert_eq!(record.unit::<Recorder>().unwrap().lock().updates, 1);
    }

    #[test]
    fn plugin_record_queries_each_phase_once() {
        let plugin = FakePlugin::new(FakeModule::loaded());
        let record = SystemRecord::from_plugin(plugin.clone(), Entity::from_raw(1)).unwrap();

        assert_eq!(record.ownership_mode(), OwnershipMode::ModuleOwned);
        assert_eq!(record.name(), "fake::Recorder");
        assert_eq!(plugin.queries.load(Ordering::SeqCst), HookKind::ALL.len());
        assert_eq!(
            record.hooks().kinds().collect::<Vec<_>>(),
            vec![HookKind::Configure, HookKind::Update]
        );
        assert!(record.unit::<Recorder>().is_none());
    }

    #[test]
    fn unloaded_module_aborts_attachment() {
        let module = FakeModule::loaded();
        module.unload();
        let plugin = FakePlugin::new(module);

        let err = SystemRecord::from_plugin(plugin.clone(), Entity::from_raw(1)).unwrap_err();
        assert!(matches!(err, SystemError::OwnershipViolation { .. }));
        assert_eq!(plugin.queries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invoking_after_unload_is_an_ownership_violation() {
        let module = FakeModule::loaded();
        let plugin = FakePlugin::new(module.clone());
        let record = SystemRecord::from_plugin(plugin.clone(), Entity::from_raw(1)).unwrap();
        let mut world = World::new();

        record.update(&UpdateInfo::default(), &mut world).unwrap();
        module.unload();
        let err = record.update(&UpdateInfo::default(), &mut world).unwrap_err();
        assert_eq!(
            err,
            SystemError::OwnershipViolation {
                system: "fake::Recorder".into(),
                module: "libfake.so".into(),
            }
        );
        assert_eq!(plugin.unit.lock().updates, 1);
    }

    #[test]
    fn mismatched_hook_kind_is_rejected() {
        let plugin = Arc::new(LyingPlugin {
            module: FakeModule::loaded(),
        });
        let err = SystemRecord::from_plugin(plugin, Entity::from_raw(1)).unwrap_err();
        assert_eq!(
            err,
            SystemError::HookKindMismatch {
                system: "liar".into(),
                requested: HookKind::PreUpdate,
                returned: HookKind::Update,
            }
        );
    }

    #[test]
    fn detach_releases_hooks_before_module() {
        let module = FakeModule::loaded();
        let plugin = FakePlugin::new(module.clone());
        let record = SystemRecord::from_plugin(plugin.clone(), Entity::from_raw(1)).unwrap();

        // the plugin's own handle plus one per resolved hook
        assert_eq!(Arc::strong_count(&plugin.unit), 3);
        assert_eq!(Arc::strong_count(&module), 3);

        record.detach();
        assert_eq!(Arc::strong_count(&plugin.unit), 1);
        assert_eq!(Arc::strong_count(&module), 2);
    }
}
