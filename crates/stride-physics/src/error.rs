use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

/// Errors raised by the physics bridge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("character body has not been spawned")]
    NotSpawned,

    #[error("rigid body {0:?} is missing from the physics world")]
    MissingBody(RigidBodyHandle),

    #[error("collider {0:?} is missing from the physics world")]
    MissingCollider(ColliderHandle),

    #[error("invalid capsule: radius {radius}, half height {half_height}")]
    InvalidCapsule { radius: f32, half_height: f32 },

    #[error("character body is already spawned")]
    AlreadySpawned,
}
