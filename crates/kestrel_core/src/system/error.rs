use crate::system::HookKind;
use thiserror::Error;

/// Errors raised while attaching systems or routing hook calls.
///
/// A missing hook is never an error; it only means the phase is skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemError {
    #[error("system '{system}' used after its module '{module}' was unloaded")]
    OwnershipViolation { system: String, module: String },

    #[error("system '{system}' answered a {requested} query with a {returned} hook")]
    HookKindMismatch {
        system: String,
        requested: HookKind,
        returned: HookKind,
    },
}
