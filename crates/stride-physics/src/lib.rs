//! Stride Physics - Physics bridge using rapier3d
//!
//! Owns the rapier pipeline the character moves through and exposes the two
//! capabilities the movement core consumes: the kinematic character body
//! (`CharacterBody`) and scene raycasts (`SceneQuery`).

mod character;
mod error;

pub use character::{BodySettings, CharacterBody, CollisionContact, KinematicSettings, MoveOutcome};
pub use error::PhysicsError;

use glam::{Quat, Vec3};
use nalgebra::Unit;
use rapier3d::prelude::*;

/// Physics world configuration
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Gravity vector (default: -9.81 on Y axis)
    pub gravity: Vec3,
    /// Physics timestep (default: 1/60)
    pub timestep: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            timestep: 1.0 / 60.0,
        }
    }
}

/// Read-only scene queries used by the camera rig.
///
/// Implementations fail open: any query that cannot be answered reports no hit.
pub trait SceneQuery {
    /// Distance along `direction` to the first obstruction within `max_distance`.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<f32>;
}

/// The main physics world containing all simulation state
pub struct PhysicsWorld {
    /// Configuration
    pub config: PhysicsConfig,

    /// Rigid body storage
    pub rigid_body_set: RigidBodySet,
    /// Collider storage
    pub collider_set: ColliderSet,
    /// Impulse joint storage
    pub impulse_joint_set: ImpulseJointSet,
    /// Multi-body joint storage
    pub multibody_joint_set: MultibodyJointSet,

    /// Integration parameters
    integration_parameters: IntegrationParameters,
    /// Physics pipeline
    physics_pipeline: PhysicsPipeline,
    /// Island manager
    island_manager: IslandManager,
    /// Broad phase collision detection
    broad_phase: DefaultBroadPhase,
    /// Narrow phase collision detection
    narrow_phase: NarrowPhase,
    /// Continuous collision detection solver
    ccd_solver: CCDSolver,
    /// Query pipeline for raycasts and shape casts
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    /// Create a new physics world with default configuration
    pub fn new() -> Self {
        Self::with_config(PhysicsConfig::default())
    }

    /// Create a new physics world with custom configuration
    pub fn with_config(config: PhysicsConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.timestep;

        Self {
            config,
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Step the physics simulation
    pub fn step(&mut self) {
        let gravity = vector![self.config.gravity.x, self.config.gravity.y, self.config.gravity.z];

        self.physics_pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        self.update_queries();
    }

    /// Refresh the query pipeline without stepping (after adding static geometry)
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Add a static collider (ground, walls, etc.)
    pub fn add_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.collider_set.insert(collider)
    }

    /// Add a dynamic rigid body with a collider
    pub fn add_dynamic_body(
        &mut self,
        rigid_body: RigidBody,
        collider: Collider,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let rb_handle = self.rigid_body_set.insert(rigid_body);
        let col_handle =
            self.collider_set
                .insert_with_parent(collider, rb_handle, &mut self.rigid_body_set);
        (rb_handle, col_handle)
    }

    /// Add a kinematic rigid body with a collider
    pub fn add_kinematic_body(
        &mut self,
        rigid_body: RigidBody,
        collider: Collider,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let rb_handle = self.rigid_body_set.insert(rigid_body);
        let col_handle =
            self.collider_set
                .insert_with_parent(collider, rb_handle, &mut self.rigid_body_set);
        (rb_handle, col_handle)
    }

    /// Remove a rigid body and its colliders
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Remove a collider
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.collider_set
            .remove(handle, &mut self.island_manager, &mut self.rigid_body_set, true);
    }

    /// Get a rigid body by handle
    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Get a mutable rigid body by handle
    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// Get a collider by handle
    pub fn get_collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.collider_set.get(handle)
    }

    /// Cast a ray and return the first hit
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<(ColliderHandle, f32)> {
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        self.query_pipeline
            .cast_ray(&self.rigid_body_set, &self.collider_set, &ray, max_distance, true, filter)
    }

    /// Create a ground plane collider
    pub fn create_ground(&mut self, y: f32) -> ColliderHandle {
        let normal = Unit::new_normalize(vector![0.0, 1.0, 0.0]);
        let ground = ColliderBuilder::halfspace(normal)
            .translation(vector![0.0, y, 0.0])
            .friction(0.7)
            .restitution(0.0)
            .build();
        self.add_static_collider(ground)
    }

    /// Create a static box collider
    pub fn create_static_box(&mut self, half_extents: Vec3, position: Vec3) -> ColliderHandle {
        self.create_oriented_box(half_extents, position, Quat::IDENTITY)
    }

    /// Create a static box collider with an orientation (ramps, tilted walls)
    pub fn create_oriented_box(
        &mut self,
        half_extents: Vec3,
        position: Vec3,
        rotation: Quat,
    ) -> ColliderHandle {
        let axis_angle = rotation.to_scaled_axis();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .position(Isometry::new(
                vector![position.x, position.y, position.z],
                vector![axis_angle.x, axis_angle.y, axis_angle.z],
            ))
            .friction(0.7)
            .build();
        self.add_static_collider(collider)
    }

    /// Create a dynamic box the character can push around
    pub fn create_dynamic_box(&mut self, half_extents: Vec3, position: Vec3, density: f32) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .density(density)
            .friction(0.5)
            .build();
        let (handle, _) = self.add_dynamic_body(body, collider);
        handle
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneQuery for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<f32> {
        if !origin.is_finite() || !direction.is_finite() || max_distance <= 0.0 {
            return None;
        }
        let direction = direction.try_normalize()?;

        let mut filter = QueryFilter::default().exclude_sensors();
        if let Some(body) = exclude {
            filter = filter.exclude_rigid_body(body);
        }

        self.raycast(origin, direction, max_distance, filter)
            .map(|(_, toi)| toi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_world_creation() {
        let world = PhysicsWorld::new();
        assert_eq!(world.config.gravity, Vec3::new(0.0, -9.81, 0.0));
    }

    #[test]
    fn test_ground_creation() {
        let mut world = PhysicsWorld::new();
        let ground = world.create_ground(0.0);
        assert!(world.get_collider(ground).is_some());
    }

    #[test]
    fn test_raycast() {
        let mut world = PhysicsWorld::new();
        world.create_ground(0.0);
        world.update_queries();

        let hit = world.raycast(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            100.0,
            QueryFilter::default(),
        );
        assert!(hit.is_some());
    }

    #[test]
    fn test_scene_query_reports_distance() {
        let mut world = PhysicsWorld::new();
        world.create_static_box(Vec3::new(1.0, 1.0, 0.5), Vec3::new(0.0, 1.0, 5.0));
        world.update_queries();

        let hit = world.cast_ray(Vec3::new(0.0, 1.0, 0.0), Vec3::Z, 10.0, None);
        let distance = hit.expect("box should be hit");
        assert!((distance - 4.5).abs() < 1e-3);
    }

    #[test]
    fn test_dynamic_box_falls() {
        let mut world = PhysicsWorld::new();
        world.create_ground(0.0);
        let handle = world.create_dynamic_box(Vec3::splat(0.5), Vec3::new(0.0, 3.0, 0.0), 1.0);

        for _ in 0..120 {
            world.step();
        }
        let y = world.get_rigid_body(handle).unwrap().translation().y;
        assert!(y < 1.0 && y > 0.3);
    }

    #[test]
    fn test_scene_query_fails_open() {
        let world = PhysicsWorld::new();
        assert!(world.cast_ray(Vec3::ZERO, Vec3::ZERO, 10.0, None).is_none());
        assert!(world
            .cast_ray(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::Y, 10.0, None)
            .is_none());
    }
}
