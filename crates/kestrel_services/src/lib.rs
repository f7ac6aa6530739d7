//! Kestrel Services Layer
//!
//! Everything that reads the outside world into a simulation: run settings
//! and the initial entity layout they describe.

pub mod scene;
pub mod settings;

pub use scene::{spawn_entities, SceneError};
pub use settings::{EntitySettings, Settings, SettingsError, SimulationSettings, SystemSettings};
