use serde_json::Value;
use std::sync::Arc;

/// Configuration handed to a system's `configure` hook.
///
/// The document is opaque to the dispatch layer and shared immutably, so a
/// record can keep it verbatim and replay the very same payload later.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigPayload(Arc<Value>);

impl ConfigPayload {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// Payload carrying no configuration (`null`).
    pub fn empty() -> Self {
        Self::new(Value::Null)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Whether both payloads share the same underlying document.
    pub fn ptr_eq(&self, other: &ConfigPayload) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ConfigPayload {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for ConfigPayload {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
