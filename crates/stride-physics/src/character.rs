//! Kinematic character body using rapier3d's kinematic character controller
//!
//! The body owns one kinematic position-based rigid body, one capsule collider
//! and one `KinematicCharacterController`. The movement core hands it a desired
//! translation each tick and gets back the collision/slope/step corrected one.

use glam::Vec3;
use rapier3d::control::{
    CharacterAutostep, CharacterCollision, CharacterLength, KinematicCharacterController,
};
use rapier3d::prelude::*;
use tracing::{debug, info};

use crate::{PhysicsError, PhysicsWorld};

/// Kinematic-controller tunables applied to rapier's controller
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicSettings {
    /// Gap kept between the capsule and obstacles
    pub skin_offset: f32,
    /// Steepest slope the character can walk up (radians)
    pub max_climb_angle: f32,
    /// Slope above which the character slides down (radians)
    pub min_slide_angle: f32,
    /// Tallest step climbed automatically (0 disables autostep)
    pub autostep_max_height: f32,
    /// Minimum free width on top of a step
    pub autostep_min_width: f32,
    /// Whether dynamic bodies count as steps
    pub autostep_include_dynamic: bool,
    /// Maximum snap distance toward the ground (0 disables snapping)
    pub snap_to_ground: f32,
    /// Push dynamic bodies the character walks into
    pub push_dynamic_bodies: bool,
    /// Mass used when pushing dynamic bodies
    pub character_mass: f32,
}

impl Default for KinematicSettings {
    fn default() -> Self {
        Self {
            skin_offset: 0.01,
            max_climb_angle: 45f32.to_radians(),
            min_slide_angle: 30f32.to_radians(),
            autostep_max_height: 0.3,
            autostep_min_width: 0.2,
            autostep_include_dynamic: false,
            snap_to_ground: 0.2,
            push_dynamic_bodies: true,
            character_mass: 80.0,
        }
    }
}

/// Capsule dimensions for a character body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySettings {
    /// Capsule radius
    pub radius: f32,
    /// Half length of the capsule's cylindrical section
    pub half_height: f32,
    /// Extra vertical offset of the capsule center (signed)
    pub offset: f32,
}

impl Default for BodySettings {
    fn default() -> Self {
        Self {
            radius: 0.4,
            half_height: 0.5,
            offset: 0.0,
        }
    }
}

/// A collision reported while moving the character
#[derive(Debug, Clone, Copy)]
pub struct CollisionContact {
    /// The obstacle that was hit
    pub collider: ColliderHandle,
    /// Obstacle surface normal, pointing toward the character
    pub normal: Vec3,
    /// Translation applied before the hit
    pub translation_applied: Vec3,
}

/// Result of one `move_by` call
#[derive(Debug, Clone, Default)]
pub struct MoveOutcome {
    /// Collision-corrected translation that was applied
    pub corrected: Vec3,
    /// rapier's grounded predicate after the move
    pub grounded: bool,
    /// Whether the character is sliding down a slope too steep to climb
    pub sliding_down_slope: bool,
    /// Obstacles hit during the move
    pub collisions: Vec<CollisionContact>,
}

impl MoveOutcome {
    /// An outcome for a tick where the character did not move
    pub fn stationary(grounded: bool) -> Self {
        Self {
            grounded,
            ..Default::default()
        }
    }
}

/// Physics bridge for one character
pub struct CharacterBody {
    controller: KinematicCharacterController,
    settings: KinematicSettings,
    shape: BodySettings,
    body: Option<RigidBodyHandle>,
    collider: Option<ColliderHandle>,
    /// Feet position (bottom of the capsule)
    position: Vec3,
    grounded: bool,
}

impl CharacterBody {
    /// Create an unspawned body with the given controller settings
    pub fn new(settings: KinematicSettings) -> Self {
        let mut body = Self {
            controller: KinematicCharacterController::default(),
            settings: KinematicSettings::default(),
            shape: BodySettings::default(),
            body: None,
            collider: None,
            position: Vec3::ZERO,
            grounded: false,
        };
        body.configure(settings);
        body
    }

    /// Apply controller settings. Safe to call at any time.
    pub fn configure(&mut self, settings: KinematicSettings) {
        let controller = &mut self.controller;
        controller.offset = CharacterLength::Absolute(settings.skin_offset);
        controller.max_slope_climb_angle = settings.max_climb_angle;
        controller.min_slope_slide_angle = settings.min_slide_angle;
        controller.autostep = (settings.autostep_max_height > 0.0).then(|| CharacterAutostep {
            max_height: CharacterLength::Absolute(settings.autostep_max_height),
            min_width: CharacterLength::Absolute(settings.autostep_min_width),
            include_dynamic_bodies: settings.autostep_include_dynamic,
        });
        controller.snap_to_ground = (settings.snap_to_ground > 0.0)
            .then(|| CharacterLength::Absolute(settings.snap_to_ground));

        debug!(?settings, "Configured kinematic character controller");
        self.settings = settings;
    }

    /// Currently applied controller settings
    pub fn settings(&self) -> &KinematicSettings {
        &self.settings
    }

    /// Create the rigid body and capsule collider with the feet at `position`
    pub fn spawn(
        &mut self,
        physics: &mut PhysicsWorld,
        position: Vec3,
        shape: BodySettings,
    ) -> Result<(), PhysicsError> {
        if self.body.is_some() {
            return Err(PhysicsError::AlreadySpawned);
        }
        validate_capsule(shape.radius, shape.half_height)?;

        self.shape = shape;
        self.position = position;
        self.grounded = false;

        let center = self.center();
        let rigid_body = RigidBodyBuilder::kinematic_position_based()
            .translation(vector![center.x, center.y, center.z])
            .build();
        let collider = ColliderBuilder::capsule_y(shape.half_height, shape.radius)
            .friction(0.0) // Smooth sliding against walls
            .restitution(0.0)
            .build();

        let (body, collider) = physics.add_kinematic_body(rigid_body, collider);
        self.body = Some(body);
        self.collider = Some(collider);

        info!(?position, radius = shape.radius, half_height = shape.half_height, "Spawned character body");
        Ok(())
    }

    /// Remove the body and collider. Returns false if nothing was spawned.
    pub fn despawn(&mut self, physics: &mut PhysicsWorld) -> bool {
        self.collider = None;
        match self.body.take() {
            Some(handle) => {
                if physics.get_rigid_body(handle).is_some() {
                    physics.remove_rigid_body(handle);
                }
                info!("Despawned character body");
                true
            }
            None => false,
        }
    }

    /// Whether the body currently exists
    pub fn is_spawned(&self) -> bool {
        self.body.is_some()
    }

    /// Rigid body handle, used to exclude the character from queries
    pub fn body_handle(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    /// Feet position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Capsule center
    pub fn center(&self) -> Vec3 {
        self.position + Vec3::Y * (self.shape.radius + self.shape.half_height + self.shape.offset)
    }

    /// Full standing height of the capsule
    pub fn height(&self) -> f32 {
        2.0 * (self.shape.radius + self.shape.half_height)
    }

    /// Grounded predicate from the most recent move
    pub fn is_grounded_now(&self) -> bool {
        self.grounded
    }

    fn handles(&self, physics: &PhysicsWorld) -> Result<(RigidBodyHandle, ColliderHandle), PhysicsError> {
        let body = self.body.ok_or(PhysicsError::NotSpawned)?;
        let collider = self.collider.ok_or(PhysicsError::NotSpawned)?;
        if physics.get_rigid_body(body).is_none() {
            return Err(PhysicsError::MissingBody(body));
        }
        if physics.get_collider(collider).is_none() {
            return Err(PhysicsError::MissingCollider(collider));
        }
        Ok((body, collider))
    }

    /// Move by `desired`, returning the corrected translation and contacts
    pub fn move_by(
        &mut self,
        physics: &mut PhysicsWorld,
        desired: Vec3,
        dt: f32,
    ) -> Result<MoveOutcome, PhysicsError> {
        let (body_handle, collider_handle) = self.handles(physics)?;
        let center = self.center();
        let character_pos = Isometry::translation(center.x, center.y, center.z);
        let filter = QueryFilter::default()
            .exclude_rigid_body(body_handle)
            .exclude_sensors();

        let mut collisions: Vec<CharacterCollision> = Vec::new();
        let movement = {
            let shape = physics
                .collider_set
                .get(collider_handle)
                .ok_or(PhysicsError::MissingCollider(collider_handle))?
                .shape();

            self.controller.move_shape(
                dt,
                &physics.rigid_body_set,
                &physics.collider_set,
                &physics.query_pipeline,
                shape,
                &character_pos,
                vector![desired.x, desired.y, desired.z],
                filter,
                |collision| collisions.push(collision),
            )
        };

        if self.settings.push_dynamic_bodies && !collisions.is_empty() {
            if let Some(collider) = physics.collider_set.get(collider_handle) {
                self.controller.solve_character_collision_impulses(
                    dt,
                    &mut physics.rigid_body_set,
                    &physics.collider_set,
                    &physics.query_pipeline,
                    collider.shape(),
                    self.settings.character_mass,
                    &collisions,
                    filter,
                );
            }
        }

        let corrected = Vec3::new(
            movement.translation.x,
            movement.translation.y,
            movement.translation.z,
        );
        self.position += corrected;
        self.grounded = movement.grounded;
        self.sync_body(physics, body_handle);

        let collisions = collisions
            .iter()
            .map(|collision| {
                let normal = -collision.hit.normal1.into_inner();
                CollisionContact {
                    collider: collision.handle,
                    normal: Vec3::new(normal.x, normal.y, normal.z),
                    translation_applied: Vec3::new(
                        collision.translation_applied.x,
                        collision.translation_applied.y,
                        collision.translation_applied.z,
                    ),
                }
            })
            .collect();

        Ok(MoveOutcome {
            corrected,
            grounded: movement.grounded,
            sliding_down_slope: movement.is_sliding_down_slope,
            collisions,
        })
    }

    /// Current half height of the collider's cylindrical section
    pub fn collider_half_height(&self, physics: &PhysicsWorld) -> Result<f32, PhysicsError> {
        let (_, collider_handle) = self.handles(physics)?;
        let half_height = physics
            .get_collider(collider_handle)
            .and_then(|collider| collider.shape().as_capsule().map(|capsule| capsule.half_height()))
            .unwrap_or(self.shape.half_height);
        Ok(half_height)
    }

    /// Swap the capsule for one with a new half height, keeping the feet in place
    pub fn set_collider_half_height(
        &mut self,
        physics: &mut PhysicsWorld,
        half_height: f32,
    ) -> Result<(), PhysicsError> {
        let (body_handle, collider_handle) = self.handles(physics)?;
        validate_capsule(self.shape.radius, half_height)?;

        if (self.shape.half_height - half_height).abs() <= f32::EPSILON {
            return Ok(());
        }

        let collider = physics
            .collider_set
            .get_mut(collider_handle)
            .ok_or(PhysicsError::MissingCollider(collider_handle))?;
        collider.set_shape(SharedShape::capsule_y(half_height, self.shape.radius));

        debug!(from = self.shape.half_height, to = half_height, "Resized character capsule");
        self.shape.half_height = half_height;
        self.sync_body(physics, body_handle);
        Ok(())
    }

    /// Replace radius and offset (half height goes through `set_collider_half_height`)
    pub fn reshape(&mut self, physics: &mut PhysicsWorld, shape: BodySettings) -> Result<(), PhysicsError> {
        let (body_handle, collider_handle) = self.handles(physics)?;
        validate_capsule(shape.radius, shape.half_height)?;

        let collider = physics
            .collider_set
            .get_mut(collider_handle)
            .ok_or(PhysicsError::MissingCollider(collider_handle))?;
        collider.set_shape(SharedShape::capsule_y(shape.half_height, shape.radius));

        self.shape = shape;
        self.sync_body(physics, body_handle);
        Ok(())
    }

    /// Place the feet at `position` without collision checks
    pub fn teleport(&mut self, physics: &mut PhysicsWorld, position: Vec3) -> Result<(), PhysicsError> {
        let (body_handle, _) = self.handles(physics)?;
        self.position = position;
        self.grounded = false;

        let center = self.center();
        if let Some(body) = physics.get_rigid_body_mut(body_handle) {
            body.set_translation(vector![center.x, center.y, center.z], true);
        }
        Ok(())
    }

    fn sync_body(&self, physics: &mut PhysicsWorld, body_handle: RigidBodyHandle) {
        let center = self.center();
        if let Some(body) = physics.get_rigid_body_mut(body_handle) {
            body.set_next_kinematic_translation(vector![center.x, center.y, center.z]);
        }
    }
}

fn validate_capsule(radius: f32, half_height: f32) -> Result<(), PhysicsError> {
    let valid = radius.is_finite() && half_height.is_finite() && radius > 0.0 && half_height >= 0.0;
    if valid {
        Ok(())
    } else {
        Err(PhysicsError::InvalidCapsule { radius, half_height })
    }
}
