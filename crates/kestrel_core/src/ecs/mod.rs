//! Component identity and entity storage.
//!
//! A component is identified by its value type *and* a discriminator tag,
//! so several components may share one value representation. The
//! [`ComponentRegistry`] maps those identities to stable string names for
//! construction from serialized data; [`EntityComponentStore`] is the
//! storage seam systems operate against, with [`World`] as the in-memory
//! implementation.

mod component;
mod entity;
mod registry;
mod registry_error;
mod store;
mod world;

pub use component::{
    ComponentId, ComponentIdentity, ComponentInstance, ComponentKey, ComponentValue,
    Discriminator, ValueType,
};
pub use entity::Entity;
pub use registry::ComponentRegistry;
pub use registry_error::RegistryError;
pub use store::{EntityComponentStore, StoreError, StoreExt};
pub use world::World;
