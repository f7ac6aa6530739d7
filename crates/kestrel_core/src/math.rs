//! Math types shared by components
//!
//! Re-exports glam and adds the rigid-body pose used by the built-in catalog.

pub use glam::*;

use serde::{Deserialize, Serialize};

/// Position and orientation of an entity relative to its parent frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    pub fn from_translation(position: DVec3) -> Self {
        Self {
            position,
            rotation: DQuat::IDENTITY,
        }
    }

    /// Compose `self` with a pose expressed in `self`'s frame.
    pub fn compose(&self, child: &Pose) -> Pose {
        Pose {
            position: self.position + self.rotation * child.position,
            rotation: self.rotation * child.rotation,
        }
    }

    /// Rotate a vector from this pose's frame into the parent frame.
    pub fn rotate(&self, local: DVec3) -> DVec3 {
        self.rotation * local
    }
}
