use crate::ecs::{
    ComponentId, ComponentIdentity, ComponentInstance, ComponentKey, ComponentValue,
    Discriminator, RegistryError, ValueType,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

/// Name-indexed catalog of component identities.
///
/// One registry is constructed explicitly and handed to every call site
/// that registers, creates or (de)serializes components by name. Names and
/// (value type, discriminator) pairs are kept in one-to-one correspondence.
#[derive(Default)]
pub struct ComponentRegistry {
    identities: Vec<ComponentIdentity>,
    name_lookup: HashMap<String, usize>,
    id_lookup: HashMap<ComponentId, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `(value_type, discriminator)`.
    ///
    /// Registering the identical identity again is a no-op. Reusing the name
    /// for another identity, or the identity under another name, fails.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        value_type: ValueType,
        discriminator: Discriminator,
    ) -> Result<(), RegistryError> {
        let requested = ComponentIdentity::new(name, value_type, discriminator);

        if let Some(&index) = self.name_lookup.get(requested.name()) {
            let existing = &self.identities[index];
            if *existing == requested {
                return Ok(());
            }
            return Err(RegistryError::DuplicateRegistration {
                name: requested.name().to_string(),
                existing: existing.to_string(),
                requested: requested.to_string(),
            });
        }

        let id = requested.id();
        if let Some(&index) = self.id_lookup.get(&id) {
            return Err(RegistryError::DuplicateRegistration {
                name: requested.name().to_string(),
                existing: self.identities[index].to_string(),
                requested: requested.to_string(),
            });
        }

        debug!(component = %requested, "registered component");
        let index = self.identities.len();
        self.name_lookup.insert(requested.name().to_string(), index);
        self.id_lookup.insert(id, index);
        self.identities.push(requested);
        Ok(())
    }

    /// Register a component declared with `define_component!`.
    pub fn register_key<T>(&mut self, key: &ComponentKey<T>) -> Result<(), RegistryError>
    where
        T: ComponentValue + Default + DeserializeOwned,
    {
        self.register(key.name(), ValueType::of::<T>(), key.discriminator())
    }

    /// Construct a default-valued instance of the component called `name`.
    pub fn create(&self, name: &str) -> Result<ComponentInstance, RegistryError> {
        let identity = self.expect_identity(name)?;
        Ok(ComponentInstance::from_parts(
            identity.id(),
            identity.value_type().default_value(),
        ))
    }

    /// Construct an instance of `name` from its JSON form.
    pub fn deserialize(
        &self,
        name: &str,
        value: serde_json::Value,
    ) -> Result<ComponentInstance, RegistryError> {
        let identity = self.expect_identity(name)?;
        let boxed = identity
            .value_type()
            .deserialize_value(value)
            .map_err(|source| RegistryError::Deserialize {
                name: name.to_string(),
                source,
            })?;
        Ok(ComponentInstance::from_parts(identity.id(), boxed))
    }

    /// Name and JSON form of an instance, the inverse of [`Self::deserialize`].
    pub fn serialize<'a>(
        &'a self,
        instance: &ComponentInstance,
    ) -> Result<(&'a str, serde_json::Value), RegistryError> {
        let identity = self.identity_of(instance.id()).ok_or_else(|| {
            RegistryError::UnknownComponentName {
                name: format!("{:?}", instance.id()),
            }
        })?;
        let value = instance
            .to_json()
            .map_err(|source| RegistryError::Serialize {
                name: identity.name().to_string(),
                source,
            })?;
        Ok((identity.name(), value))
    }

    /// Inverse lookup: the name registered for `(value_type, discriminator)`.
    pub fn lookup(
        &self,
        value_type: ValueType,
        discriminator: Discriminator,
    ) -> Result<&str, RegistryError> {
        self.identity_of(ComponentId::new(value_type.type_id(), discriminator))
            .map(ComponentIdentity::name)
            .ok_or_else(|| RegistryError::UnknownComponentName {
                name: format!("{} tagged {}", value_type.type_name(), discriminator),
            })
    }

    pub fn identity(&self, name: &str) -> Option<&ComponentIdentity> {
        self.name_lookup
            .get(name)
            .map(|&index| &self.identities[index])
    }

    pub fn identity_of(&self, id: ComponentId) -> Option<&ComponentIdentity> {
        self.id_lookup.get(&id).map(|&index| &self.identities[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_lookup.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Registered identities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentIdentity> {
        self.identities.iter()
    }

    fn expect_identity(&self, name: &str) -> Result<&ComponentIdentity, RegistryError> {
        self.identity(name)
            .ok_or_else(|| RegistryError::UnknownComponentName {
                name: name.to_string(),
            })
    }
}
