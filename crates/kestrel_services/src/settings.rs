//! Settings management

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Run settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationSettings,
    /// Entities to spawn before the first step, in declaration order.
    pub entities: Vec<EntitySettings>,
    /// Systems to attach once the entities exist.
    pub systems: Vec<SystemSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub step_size_ms: f64,
    /// Steps to run, paused ones included; `None` runs until a stop event.
    pub steps: Option<u64>,
    pub start_paused: bool,
}

impl SimulationSettings {
    /// Step size as a [`Duration`]. Out-of-range values that [`Settings::validate`]
    /// rejects fall back to 1 ms.
    pub fn step_size(&self) -> Duration {
        self.checked_step_size().unwrap_or(Duration::from_millis(1))
    }

    /// `None` unless the step size is a representable, non-zero duration.
    fn checked_step_size(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.step_size_ms / 1000.0)
            .ok()
            .filter(|step| !step.is_zero())
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            step_size_ms: 1.0,
            steps: Some(1000),
            start_paused: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntitySettings {
    pub name: String,
    /// Name of an entity declared earlier in the list.
    #[serde(default)]
    pub parent: Option<String>,
    /// Initial components, keyed by registered component name.
    #[serde(default)]
    pub components: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Name the system is registered under by the runtime.
    pub name: String,
    /// Entity the system attaches to.
    pub entity_name: String,
    /// Opaque payload handed to the system's configure hook.
    #[serde(default)]
    pub config: Value,
}

impl Settings {
    /// Read and validate settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded settings file");
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let step = self.simulation.step_size_ms;
        if !step.is_finite() || step <= 0.0 {
            return Err(SettingsError::Invalid(format!(
                "step_size_ms must be positive, got {step}"
            )));
        }
        if self.simulation.checked_step_size().is_none() {
            return Err(SettingsError::Invalid(format!(
                "step_size_ms {step} is out of range"
            )));
        }

        let mut declared = Vec::with_capacity(self.entities.len());
        for entity in &self.entities {
            if entity.name.is_empty() {
                return Err(SettingsError::Invalid("entity with empty name".into()));
            }
            if declared.contains(&entity.name.as_str()) {
                return Err(SettingsError::Invalid(format!(
                    "entity '{}' declared twice",
                    entity.name
                )));
            }
            if let Some(parent) = &entity.parent {
                if !declared.contains(&parent.as_str()) {
                    return Err(SettingsError::Invalid(format!(
                        "entity '{}' names parent '{}' before it is declared",
                        entity.name, parent
                    )));
                }
            }
            declared.push(entity.name.as_str());
        }

        for system in &self.systems {
            if !declared.contains(&system.entity_name.as_str()) {
                return Err(SettingsError::Invalid(format!(
                    "system '{}' attaches to unknown entity '{}'",
                    system.name, system.entity_name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_uses_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.simulation.step_size(), Duration::from_millis(1));
    }

    #[test]
    fn parses_full_document() {
        let text = json!({
            "simulation": { "step_size_ms": 10.0, "steps": null, "start_paused": true },
            "entities": [
                { "name": "rover" },
                {
                    "name": "lidar",
                    "parent": "rover",
                    "components": { "kestrel_components.Sensor": null }
                }
            ],
            "systems": [
                { "name": "velocity_integrator", "entity_name": "rover", "config": { "gain": 2 } }
            ]
        })
        .to_string();

        let settings = Settings::from_json(&text).unwrap();
        assert_eq!(settings.simulation.step_size(), Duration::from_millis(10));
        assert_eq!(settings.simulation.steps, None);
        assert!(settings.simulation.start_paused);
        assert_eq!(settings.entities[1].parent.as_deref(), Some("rover"));
        assert_eq!(settings.systems[0].config, json!({ "gain": 2 }));

        let reparsed = Settings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, settings);
    }

    #[test]
    fn rejects_bad_step_size() {
        let err = Settings::from_json(r#"{ "simulation": { "step_size_ms": 0 } }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn rejects_unrepresentable_step_size() {
        for step in ["1e300", "1e-300"] {
            let doc = format!(r#"{{ "simulation": {{ "step_size_ms": {step} }} }}"#);
            assert!(
                matches!(Settings::from_json(&doc), Err(SettingsError::Invalid(_))),
                "{step} accepted"
            );
        }

        let huge = SimulationSettings {
            step_size_ms: 1e300,
            ..SimulationSettings::default()
        };
        assert_eq!(huge.step_size(), Duration::from_millis(1));
    }

    #[test]
    fn rejects_dangling_references() {
        let forward_parent = json!({
            "entities": [{ "name": "lidar", "parent": "rover" }, { "name": "rover" }]
        });
        assert!(matches!(
            Settings::from_json(&forward_parent.to_string()),
            Err(SettingsError::Invalid(_))
        ));

        let unknown_entity = json!({
            "systems": [{ "name": "pose_logger", "entity_name": "ghost" }]
        });
        assert!(matches!(
            Settings::from_json(&unknown_entity.to_string()),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Settings::load("/nonexistent/kestrel.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/kestrel.json"));
    }
}
