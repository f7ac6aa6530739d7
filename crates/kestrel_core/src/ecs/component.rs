// component.rs - Component identity and values
//
// Components are identified by the pair (value type, discriminator), not by
// the Rust value type alone. Many components share one representation
// (a DVec3, a String) while staying distinct slots on an entity.

use serde::{de::DeserializeOwned, Serialize};
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Explicit tag that separates components sharing a value type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Discriminator(&'static str);

impl Discriminator {
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Object-safe view of a stored component value.
///
/// Implemented for every `Clone + Serialize + Debug` type that can cross
/// threads; there is nothing to implement by hand.
pub trait ComponentValue: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_value(&self) -> Box<dyn ComponentValue>;
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl<T> ComponentValue for T
where
    T: Any + Send + Sync + fmt::Debug + Clone + Serialize,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_value(&self) -> Box<dyn ComponentValue> {
        Box::new(self.clone())
    }

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Runtime description of a component value representation.
///
/// Carries the constructors needed to build instances by name, so the
/// registry never needs the static type again after registration.
/// Equality only looks at the underlying type.
#[derive(Copy, Clone)]
pub struct ValueType {
    type_id: TypeId,
    type_name: &'static str,
    default_fn: fn() -> Box<dyn ComponentValue>,
    deserialize_fn: fn(serde_json::Value) -> Result<Box<dyn ComponentValue>, serde_json::Error>,
}

fn default_boxed<T: ComponentValue + Default>() -> Box<dyn ComponentValue> {
    Box::new(T::default())
}

fn deserialize_boxed<T: ComponentValue + DeserializeOwned>(
    value: serde_json::Value,
) -> Result<Box<dyn ComponentValue>, serde_json::Error> {
    let typed: T = serde_json::from_value(value)?;
    Ok(Box::new(typed))
}

impl ValueType {
    pub fn of<T: ComponentValue + Default + DeserializeOwned>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            default_fn: default_boxed::<T>,
            deserialize_fn: deserialize_boxed::<T>,
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn default_value(&self) -> Box<dyn ComponentValue> {
        (self.default_fn)()
    }

    pub(crate) fn deserialize_value(
        &self,
        value: serde_json::Value,
    ) -> Result<Box<dyn ComponentValue>, serde_json::Error> {
        (self.deserialize_fn)(value)
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Store key for a component slot: value type plus discriminator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentId {
    value_type: TypeId,
    discriminator: Discriminator,
}

impl ComponentId {
    pub fn new(value_type: TypeId, discriminator: Discriminator) -> Self {
        Self {
            value_type,
            discriminator,
        }
    }

    #[inline]
    pub fn value_type(&self) -> TypeId {
        self.value_type
    }

    #[inline]
    pub fn discriminator(&self) -> Discriminator {
        self.discriminator
    }
}

/// A registered component: unique name bound to one (value type, discriminator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentIdentity {
    name: String,
    value_type: ValueType,
    discriminator: Discriminator,
}

impl ComponentIdentity {
    pub fn new(name: impl Into<String>, value_type: ValueType, discriminator: Discriminator) -> Self {
        Self {
            name: name.into(),
            value_type,
            discriminator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn discriminator(&self) -> Discriminator {
        self.discriminator
    }

    pub fn id(&self) -> ComponentId {
        ComponentId::new(self.value_type.type_id(), self.discriminator)
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.name,
            self.value_type.type_name(),
            self.discriminator
        )
    }
}

/// Typed, compile-time handle for a component.
///
/// Declared with [`define_component!`](crate::define_component). The key
/// only names the slot; the store owns the value.
pub struct ComponentKey<T> {
    name: &'static str,
    discriminator: Discriminator,
    _value: PhantomData<fn() -> T>,
}

impl<T> ComponentKey<T> {
    pub const fn new(name: &'static str, discriminator: Discriminator) -> Self {
        Self {
            name,
            discriminator,
            _value: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn discriminator(&self) -> Discriminator {
        self.discriminator
    }
}

impl<T: ComponentValue> ComponentKey<T> {
    pub fn id(&self) -> ComponentId {
        ComponentId::new(TypeId::of::<T>(), self.discriminator)
    }
}

impl<T: ComponentValue + Default + DeserializeOwned> ComponentKey<T> {
    pub fn identity(&self) -> ComponentIdentity {
        ComponentIdentity::new(self.name, ValueType::of::<T>(), self.discriminator)
    }
}

impl<T> Clone for ComponentKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentKey<T> {}

impl<T> fmt::Debug for ComponentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentKey")
            .field("name", &self.name)
            .field("discriminator", &self.discriminator)
            .field("value_type", &type_name::<T>())
            .finish()
    }
}

/// One component value together with the slot it belongs to.
#[derive(Debug)]
pub struct ComponentInstance {
    id: ComponentId,
    value: Box<dyn ComponentValue>,
}

impl ComponentInstance {
    pub fn new<T: ComponentValue>(key: &ComponentKey<T>, value: T) -> Self {
        Self {
            id: key.id(),
            value: Box::new(value),
        }
    }

    /// Pair an already boxed value with its slot.
    ///
    /// Returns the value back if its type is not the slot's value type.
    pub fn from_boxed(
        id: ComponentId,
        value: Box<dyn ComponentValue>,
    ) -> Result<Self, Box<dyn ComponentValue>> {
        if (*value).as_any().type_id() != id.value_type() {
            return Err(value);
        }
        Ok(Self { id, value })
    }

    /// Caller guarantees `value` matches `id`'s value type.
    pub(crate) fn from_parts(id: ComponentId, value: Box<dyn ComponentValue>) -> Self {
        debug_assert_eq!((*value).as_any().type_id(), id.value_type());
        Self { id, value }
    }

    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn value<T: ComponentValue>(&self) -> Option<&T> {
        (*self.value).as_any().downcast_ref::<T>()
    }

    pub fn value_mut<T: ComponentValue>(&mut self) -> Option<&mut T> {
        (*self.value).as_any_mut().downcast_mut::<T>()
    }

    pub fn value_dyn(&self) -> &dyn ComponentValue {
        &*self.value
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        self.value.to_json()
    }
}

impl Clone for ComponentInstance {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: self.value.clone_value(),
        }
    }
}

/// Declare a typed component key.
///
/// # Example
/// ```ignore
/// define_component!(
///     /// Commanded linear velocity in the entity frame.
///     pub LINEAR_VELOCITY_CMD: DVec3 = "kestrel_components.LinearVelocityCmd", "LinearVelocityCmdTag"
/// );
/// ```
#[macro_export]
macro_rules! define_component {
    ($(#[$meta:meta])* $vis:vis $key:ident: $value:ty = $name:expr, $tag:expr) => {
        $(#[$meta])*
        $vis const $key: $crate::ecs::ComponentKey<$value> =
            $crate::ecs::ComponentKey::new($name, $crate::ecs::Discriminator::new($tag));
    };
}
