//! Plugin loader interface.
//!
//! Loading shared modules is the loader's job. The dispatch layer only needs
//! to ask a loaded plugin which hooks it provides and whether the module
//! backing them is still loaded.

use crate::system::{Hook, HookKind};
use std::sync::Arc;

/// Load lifetime of one shared module.
///
/// Holding an `Arc<dyn Module>` keeps the module loaded; a loader that
/// forcibly unloads it must report `is_loaded() == false` from then on.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;
    fn is_loaded(&self) -> bool;
}

/// A system instantiated from a loaded module.
pub trait SystemPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// The module whose code backs every hook this plugin hands out.
    fn module(&self) -> Arc<dyn Module>;

    /// Capability query: the hook for `kind`, or `None` if the plugin does
    /// not take part in that phase.
    fn query_hook(&self, kind: HookKind) -> Option<Hook>;
}
