//! Parameter surface handed to `configure_parameters`.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("parameter '{name}' is already declared with a different default")]
    DuplicateParameter { name: String },

    #[error("parameter '{name}' is not declared")]
    UnknownParameter { name: String },
}

/// Named parameters declared by systems and set by their owner.
#[derive(Debug, Default, Clone)]
pub struct ParameterRegistry {
    params: BTreeMap<String, Value>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` with a default value. Redeclaring the same default is
    /// allowed; a different default is rejected.
    pub fn declare(&mut self, name: impl Into<String>, default: Value) -> Result<(), ParameterError> {
        let name = name.into();
        match self.params.get(&name) {
            Some(existing) if *existing == default => Ok(()),
            Some(_) => Err(ParameterError::DuplicateParameter { name }),
            None => {
                self.params.insert(name, default);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), ParameterError> {
        match self.params.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ParameterError::UnknownParameter {
                name: name.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn declare_is_idempotent_for_equal_defaults() {
        let mut params = ParameterRegistry::new();
        params.declare("gain", json!(1.5)).unwrap();
        params.declare("gain", json!(1.5)).unwrap();
        assert_eq!(params.len(), 1);

        let err = params.declare("gain", json!(2.0)).unwrap_err();
        assert_eq!(err, ParameterError::DuplicateParameter { name: "gain".into() });
    }

    #[test]
    fn set_requires_declaration() {
        let mut params = ParameterRegistry::new();
        assert!(matches!(
            params.set("gain", json!(3.0)),
            Err(ParameterError::UnknownParameter { .. })
        ));

        params.declare("gain", json!(1.0)).unwrap();
        params.set("gain", json!(3.0)).unwrap();
        assert_eq!(params.get("gain"), Some(&json!(3.0)));
    }
}
