//! Kestrel Core
//!
//! Simulation plumbing shared by every Kestrel binary:
//! - Component identity, registry and entity storage
//! - Entity views
//! - System capability dispatch and the step schedule
//! - Deterministic time and math

pub mod components;
pub mod ecs;
pub mod events;
pub mod math;
pub mod runner;
pub mod system;
pub mod time;
pub mod view;

pub use glam;

/// Kestrel version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
