use thiserror::Error;

/// Errors raised by the component registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("component name '{name}' is already registered as {existing}; refusing {requested}")]
    DuplicateRegistration {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("no component registered for '{name}'")]
    UnknownComponentName { name: String },

    #[error("failed to deserialize component '{name}': {source}")]
    Deserialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize component '{name}': {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
