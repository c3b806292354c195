//! Camera registry
//!
//! Hosts own the actual cameras; the movement core only registers an id and
//! publishes follow data. All operations are idempotent.

use std::collections::HashMap;

use glam::Vec3;
use stride_core::EntityId;
use tracing::debug;

/// Identifier of a registered camera
pub type CameraId = EntityId;

/// How a host camera should track its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowDescriptor {
    /// Entity being followed
    pub target: EntityId,
    /// Camera offset from the target's feet
    pub offset: Vec3,
    /// Smoothing factor (0-1, lower = smoother)
    pub smoothing: f32,
    pub follow_position: bool,
    pub follow_rotation: bool,
}

/// Id-keyed camera registry
pub trait CameraRegistry {
    /// Register a camera. Returns false if it already existed.
    fn register(&mut self, id: CameraId) -> bool;
    /// Remove a camera. Returns false if it was not registered.
    fn unregister(&mut self, id: CameraId) -> bool;
    /// Publish follow data. Returns false for unknown cameras.
    fn set_follow(&mut self, id: CameraId, follow: FollowDescriptor) -> bool;
    fn follow(&self, id: CameraId) -> Option<FollowDescriptor>;
    /// Make a camera the one being rendered (None clears)
    fn set_active(&mut self, id: Option<CameraId>);
    fn active(&self) -> Option<CameraId>;
}

/// In-memory registry
#[derive(Debug, Default)]
pub struct CameraDirectory {
    cameras: HashMap<CameraId, Option<FollowDescriptor>>,
    active: Option<CameraId>,
}

impl CameraDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn contains(&self, id: CameraId) -> bool {
        self.cameras.contains_key(&id)
    }
}

impl CameraRegistry for CameraDirectory {
    fn register(&mut self, id: CameraId) -> bool {
        if self.cameras.contains_key(&id) {
            return false;
        }
        self.cameras.insert(id, None);
        debug!(%id, "Registered camera");
        true
    }

    fn unregister(&mut self, id: CameraId) -> bool {
        if self.active == Some(id) {
            self.active = None;
        }
        let removed = self.cameras.remove(&id).is_some();
        if removed {
            debug!(%id, "Unregistered camera");
        }
        removed
    }

    fn set_follow(&mut self, id: CameraId, follow: FollowDescriptor) -> bool {
        match self.cameras.get_mut(&id) {
            Some(slot) => {
                *slot = Some(follow);
                true
            }
            None => false,
        }
    }

    fn follow(&self, id: CameraId) -> Option<FollowDescriptor> {
        self.cameras.get(&id).copied().flatten()
    }

    fn set_active(&mut self, id: Option<CameraId>) {
        self.active = id.filter(|id| self.cameras.contains_key(id));
    }

    fn active(&self) -> Option<CameraId> {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(target: EntityId) -> FollowDescriptor {
        FollowDescriptor {
            target,
            offset: Vec3::new(0.0, 1.6, 4.0),
            smoothing: 0.15,
            follow_position: true,
            follow_rotation: false,
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut directory = CameraDirectory::new();
        let id = CameraId::new();
        assert!(directory.register(id));
        assert!(!directory.register(id));
        assert_eq!(directory.len(), 1);

        assert!(directory.unregister(id));
        assert!(!directory.unregister(id));
        assert!(directory.is_empty());
    }

    #[test]
    fn test_follow_requires_registration() {
        let mut directory = CameraDirectory::new();
        let id = CameraId::new();
        let target = EntityId::new();
        assert!(!directory.set_follow(id, descriptor(target)));

        directory.register(id);
        assert!(directory.set_follow(id, descriptor(target)));
        assert_eq!(directory.follow(id), Some(descriptor(target)));
    }

    #[test]
    fn test_unregister_clears_active() {
        let mut directory = CameraDirectory::new();
        let id = CameraId::new();
        directory.set_active(Some(id));
        assert_eq!(directory.active(), None);

        directory.register(id);
        directory.set_active(Some(id));
        assert_eq!(directory.active(), Some(id));
        directory.unregister(id);
        assert_eq!(directory.active(), None);
    }
}
