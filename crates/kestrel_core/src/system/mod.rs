//! System capability dispatch.
//!
//! A system is any unit of behavior attached to an entity. It opts into up
//! to five lifecycle hooks by implementing the matching traits
//! ([`Configure`], [`ConfigureParameters`], [`PreUpdate`], [`Update`],
//! [`PostUpdate`]). Which hooks a unit implements is resolved once, when its
//! [`SystemRecord`] is built, into a [`HookTable`]; the step driver only
//! ever reads that table.
//!
//! Units come from two places:
//! - directly instantiated Rust values implementing [`System`]
//!   (see [`impl_system!`](crate::impl_system)), held by ordinary `Arc`
//!   ownership;
//! - plugins instantiated from a loaded module ([`SystemPlugin`]), whose
//!   hooks are only valid while the module stays loaded.

mod error;
mod params;
mod payload;
mod plugin;
pub(crate) mod record;
mod schedule;

pub use error::SystemError;
pub use params::{ParameterError, ParameterRegistry};
pub use payload::ConfigPayload;
pub use plugin::{Module, SystemPlugin};
pub use record::{OwnershipMode, SystemRecord};
pub use schedule::{SystemHandle, SystemSchedule};

use crate::ecs::{Entity, EntityComponentStore};
use crate::events::EventSink;
use crate::time::UpdateInfo;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Shared, lockable handle to a unit or one of its hooks.
pub type Shared<T> = Arc<Mutex<T>>;

/// The five lifecycle phases a system can take part in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    Configure,
    ConfigureParameters,
    PreUpdate,
    Update,
    PostUpdate,
}

impl HookKind {
    pub const ALL: [HookKind; 5] = [
        HookKind::Configure,
        HookKind::ConfigureParameters,
        HookKind::PreUpdate,
        HookKind::Update,
        HookKind::PostUpdate,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            HookKind::Configure => "configure",
            HookKind::ConfigureParameters => "configure_parameters",
            HookKind::PreUpdate => "pre_update",
            HookKind::Update => "update",
            HookKind::PostUpdate => "post_update",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called when the system is attached, and again on reconfiguration.
pub trait Configure: Send {
    fn configure(
        &mut self,
        entity: Entity,
        config: &ConfigPayload,
        store: &mut dyn EntityComponentStore,
        events: &EventSink,
    );
}

/// Independent entry point for the parameter surface.
pub trait ConfigureParameters: Send {
    fn configure_parameters(
        &mut self,
        params: &mut ParameterRegistry,
        store: &mut dyn EntityComponentStore,
    );
}

pub trait PreUpdate: Send {
    fn pre_update(&mut self, info: &UpdateInfo, store: &mut dyn EntityComponentStore);
}

pub trait Update: Send {
    fn update(&mut self, info: &UpdateInfo, store: &mut dyn EntityComponentStore);
}

/// Runs after all updates of a step. Receives a shared store reference and
/// may run in parallel with other systems' post-updates.
pub trait PostUpdate: Send {
    fn post_update(&mut self, info: &UpdateInfo, store: &dyn EntityComponentStore);
}

/// A directly instantiated system.
///
/// `hooks` reports which hook traits the unit implements. It is called
/// exactly once per attach; [`impl_system!`](crate::impl_system) writes it.
pub trait System: Send + 'static {
    fn hooks(unit: &Shared<Self>) -> HookTable
    where
        Self: Sized;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// One resolved hook, as returned by a plugin capability query.
#[derive(Clone)]
pub enum Hook {
    Configure(Shared<dyn Configure>),
    ConfigureParameters(Shared<dyn ConfigureParameters>),
    PreUpdate(Shared<dyn PreUpdate>),
    Update(Shared<dyn Update>),
    PostUpdate(Shared<dyn PostUpdate>),
}

impl Hook {
    pub fn kind(&self) -> HookKind {
        match self {
            Hook::Configure(_) => HookKind::Configure,
            Hook::ConfigureParameters(_) => HookKind::ConfigureParameters,
            Hook::PreUpdate(_) => HookKind::PreUpdate,
            Hook::Update(_) => HookKind::Update,
            Hook::PostUpdate(_) => HookKind::PostUpdate,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook({})", self.kind())
    }
}

/// Resolved capability table: one optional callable per phase.
#[derive(Clone, Default)]
pub struct HookTable {
    configure: Option<Shared<dyn Configure>>,
    configure_parameters: Option<Shared<dyn ConfigureParameters>>,
    pre_update: Option<Shared<dyn PreUpdate>>,
    update: Option<Shared<dyn Update>>,
    post_update: Option<Shared<dyn PostUpdate>>,
}

impl HookTable {
    pub fn builder() -> HookTableBuilder {
        HookTableBuilder::default()
    }

    pub fn configure(&self) -> Option<&Shared<dyn Configure>> {
        self.configure.as_ref()
    }

    pub fn configure_parameters(&self) -> Option<&Shared<dyn ConfigureParameters>> {
        self.configure_parameters.as_ref()
    }

    pub fn pre_update(&self) -> Option<&Shared<dyn PreUpdate>> {
        self.pre_update.as_ref()
    }

    pub fn update(&self) -> Option<&Shared<dyn Update>> {
        self.update.as_ref()
    }

    pub fn post_update(&self) -> Option<&Shared<dyn PostUpdate>> {
        self.post_update.as_ref()
    }

    pub fn contains(&self, kind: HookKind) -> bool {
        match kind {
            HookKind::Configure => self.configure.is_some(),
            HookKind::ConfigureParameters => self.configure_parameters.is_some(),
            HookKind::PreUpdate => self.pre_update.is_some(),
            HookKind::Update => self.update.is_some(),
            HookKind::PostUpdate => self.post_update.is_some(),
        }
    }

    /// Phases this table takes part in, in phase order.
    pub fn kinds(&self) -> impl Iterator<Item = HookKind> + '_ {
        HookKind::ALL.into_iter().filter(|&kind| self.contains(kind))
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().next().is_none()
    }

    fn insert(&mut self, hook: Hook) {
        match hook {
            Hook::Configure(h) => self.configure = Some(h),
            Hook::ConfigureParameters(h) => self.configure_parameters = Some(h),
            Hook::PreUpdate(h) => self.pre_update = Some(h),
            Hook::Update(h) => self.update = Some(h),
            Hook::PostUpdate(h) => self.post_update = Some(h),
        }
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

/// Builds a [`HookTable`] from a shared unit, one hook trait at a time.
///
/// Each method only accepts units that implement the matching trait, so a
/// table can never claim a hook the unit lacks.
#[derive(Default)]
pub struct HookTableBuilder {
    table: HookTable,
}

impl HookTableBuilder {
    pub fn configure<U: Configure + 'static>(mut self, unit: &Shared<U>) -> Self {
        let hook: Shared<dyn Configure> = unit.clone();
        self.table.configure = Some(hook);
        self
    }

    pub fn configure_parameters<U: ConfigureParameters + 'static>(mut self, unit: &Shared<U>) -> Self {
        let hook: Shared<dyn ConfigureParameters> = unit.clone();
        self.table.configure_parameters = Some(hook);
        self
    }

    pub fn pre_update<U: PreUpdate + 'static>(mut self, unit: &Shared<U>) -> Self {
        let hook: Shared<dyn PreUpdate> = unit.clone();
        self.table.pre_update = Some(hook);
        self
    }

    pub fn update<U: Update + 'static>(mut self, unit: &Shared<U>) -> Self {
        let hook: Shared<dyn Update> = unit.clone();
        self.table.update = Some(hook);
        self
    }

    pub fn post_update<U: PostUpdate + 'static>(mut self, unit: &Shared<U>) -> Self {
        let hook: Shared<dyn PostUpdate> = unit.clone();
        self.table.post_update = Some(hook);
        self
    }

    pub fn build(self) -> HookTable {
        self.table
    }
}

/// Implement [`System`] by listing the hooks a type provides.
///
/// # Example
/// ```ignore
/// struct Thruster { gain: f64 }
///
/// impl Configure for Thruster { /* ... */ }
/// impl Update for Thruster { /* ... */ }
///
/// impl_system!(Thruster: configure, update);
/// ```
#[macro_export]
macro_rules! impl_system {
    ($ty:ty $(: $($hook:ident),+ $(,)?)?) => {
        impl $crate::system::System for $ty {
            fn hooks(unit: &$crate::system::Shared<Self>) -> $crate::system::HookTable {
                $crate::system::HookTable::builder()
                    $($( .$hook(unit) )+)?
                    .build()
            }
        }
    };
}
