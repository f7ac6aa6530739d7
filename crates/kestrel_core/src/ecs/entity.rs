//! Entity handles
//!
//! Entities are lightweight opaque identifiers. They carry no data of their
//! own; whether an entity is alive is decided only by the store that issued it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque entity identifier.
///
/// `Entity::NULL` (id 0) never refers to a live entity and is what a
/// default-constructed handle points at.
///
/// Example:
/// ```ignore
/// let entity = world.spawn();
/// world.despawn(entity);
/// assert!(!world.has_entity(entity));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u64);

impl Entity {
    /// Handle that refers to no entity.
    pub const NULL: Entity = Entity(0);

    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }

    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
