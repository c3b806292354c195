//! Player controller facade
//!
//! Owns every per-character stage and runs them in order once per tick:
//! input snapshot, horizontal solve, vertical step, physics move, state
//! update, stance, animation tag, camera.

use std::sync::Arc;

use glam::Vec3;
use stride_core::{EntityId, Transform};
use stride_physics::{CharacterBody, KinematicSettings, MoveOutcome, PhysicsWorld};
use tracing::{debug, info, warn};

use crate::camera::{CameraId, CameraMode, CameraPose, CameraRegistry, CameraRig, RigInput};
use crate::config::CharacterConfig;
use crate::error::{ConfigError, ControllerError};
use crate::events::ControllerEvent;
use crate::input::{CaptureNotice, InputSampler};

use super::animation::AnimationSelector;
use super::jump::{VerticalController, VerticalInput};
use super::movement::{self, MovementContext};
use super::state::{CharacterState, StateTracker, TickFeedback};

/// What one `update` did
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Config revision used for this tick
    pub revision: u64,
    /// Translation submitted to physics (zero when the move was skipped)
    pub desired: Vec3,
    /// Translation physics actually applied
    pub corrected: Vec3,
    pub events: Vec<ControllerEvent>,
    /// Camera pose, when the rig is active
    pub camera: Option<CameraPose>,
}

/// Kinematic player controller for one character
pub struct PlayerController {
    id: EntityId,
    config: Arc<CharacterConfig>,
    revision: u64,
    body: CharacterBody,
    input: InputSampler,
    vertical: VerticalController,
    tracker: StateTracker,
    animation: AnimationSelector,
    rig: CameraRig,
    camera: Option<CameraId>,
    /// Capsule dimensions changed; applied at the start of the next tick
    reshape_pending: bool,
    /// How far the lowered stance currently drops the head
    stance_drop: f32,
}

impl PlayerController {
    /// Create an uninitialized controller. The camera mode is fixed here.
    pub fn new(config: CharacterConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            id: EntityId::new(),
            body: CharacterBody::new(config.kinematic_settings()),
            input: InputSampler::new(config.camera.look_settings()),
            vertical: VerticalController::new(),
            tracker: StateTracker::new(),
            animation: AnimationSelector::new(),
            rig: CameraRig::new(&config.camera),
            camera: None,
            reshape_pending: false,
            stance_drop: 0.0,
            revision: 0,
            config: Arc::new(config),
        })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Spawn the character body with its feet at `position`
    pub fn initialize(&mut self, physics: &mut PhysicsWorld, position: Vec3) -> Result<(), ControllerError> {
        if self.body.is_spawned() {
            return Err(ControllerError::AlreadyInitialized);
        }
        self.body.spawn(physics, position, self.config.capsule.body_settings())?;

        let look = self.input.look();
        self.tracker.reset(look, look.yaw);
        self.vertical.reset();
        self.rig.snap();
        self.reshape_pending = false;
        self.stance_drop = 0.0;

        info!(id = %self.id, ?position, "Player controller initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.body.is_spawned()
    }

    /// Run one tick
    pub fn update(&mut self, physics: &mut PhysicsWorld, dt: f32) -> TickReport {
        let config = Arc::clone(&self.config);
        let mut report = TickReport {
            revision: self.revision,
            ..Default::default()
        };

        if !self.body.is_spawned() {
            debug!("Update on uninitialized controller skipped");
            report.events = self.drain_capture_events();
            return report;
        }
        if !(dt > 0.0 && dt.is_finite()) {
            debug!(dt, "Skipping tick with invalid delta time");
            report.events = self.drain_capture_events();
            return report;
        }

        if self.reshape_pending {
            self.apply_capsule(physics);
        }

        let input = self.input.sample();
        let state = self.tracker.state();
        let previous_grounded = state.is_grounded;

        let movement = movement::solve(&MovementContext {
            input: &input,
            movement: &config.movement,
            crouch: &config.crouch,
            yaw: input.look.yaw,
            velocity: state.velocity,
            grounded: state.is_grounded,
            crouching: state.is_crouching,
            sliding: state.is_sliding,
            surface_normal: state.surface_normal,
            facing_yaw: state.facing_yaw,
            third_person: self.rig.mode() == CameraMode::ThirdPerson,
            dt,
        });

        let vertical = self.vertical.step(
            &config.jump,
            VerticalInput {
                grounded: state.is_grounded,
                jumping: state.is_jumping,
                vertical_velocity: state.vertical_velocity,
                jump_pressed: input.jump_pressed(),
                dt,
            },
        );

        let mut desired = Vec3::new(movement.desired.x, vertical.desired_y, movement.desired.z);
        let outcome = match self.body.move_by(physics, desired, dt) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Character move skipped: {}", e);
                desired = Vec3::ZERO;
                MoveOutcome::stationary(previous_grounded)
            }
        };

        let mut events = self.tracker.update(
            &config,
            TickFeedback {
                input: &input,
                movement: &movement,
                vertical: &vertical,
                desired,
                outcome: &outcome,
                dt,
            },
        );

        self.apply_stance(physics, &config);

        if let Some(event) = self.animation.update(self.tracker.state(), config.animations.as_ref()) {
            events.push(event);
        }

        if self.input.is_active() {
            self.rig.zoom(input.zoom, &config.camera);
            let pose = self.rig.update(
                &config.camera,
                &config.capsule,
                RigInput {
                    anchor: self.body.position(),
                    look: input.look,
                    stance_drop: self.stance_drop,
                    exclude: self.body.body_handle(),
                    dt,
                },
                &*physics,
            );
            report.camera = Some(pose);
        }

        events.extend(self.drain_capture_events());

        report.desired = desired;
        report.corrected = outcome.corrected;
        report.events = events;
        report
    }

    fn lowered_half_height(config: &CharacterConfig, lowered: bool) -> f32 {
        let standing = config.capsule.half_height;
        if lowered {
            standing * (1.0 - config.crouch.height_reduction)
        } else {
            standing
        }
    }

    /// Match the collider to the crouch/slide stance
    fn apply_stance(&mut self, physics: &mut PhysicsWorld, config: &CharacterConfig) {
        let half_height = Self::lowered_half_height(config, self.tracker.state().is_lowered());
        let drop = 2.0 * (config.capsule.half_height - half_height);
        if (drop - self.stance_drop).abs() <= f32::EPSILON {
            return;
        }

        match self.body.set_collider_half_height(physics, half_height) {
            Ok(()) => {
                debug!(half_height, "Stance changed");
                self.stance_drop = drop;
            }
            Err(e) => warn!("Failed to resize character collider: {}", e),
        }
    }

    /// Apply new capsule dimensions from the config
    fn apply_capsule(&mut self, physics: &mut PhysicsWorld) {
        self.reshape_pending = false;
        let config = Arc::clone(&self.config);

        let mut shape = config.capsule.body_settings();
        shape.half_height = Self::lowered_half_height(&config, self.tracker.state().is_lowered());

        match self.body.reshape(physics, shape) {
            Ok(()) => {
                self.stance_drop = 2.0 * (config.capsule.half_height - shape.half_height);
                debug!(radius = shape.radius, half_height = shape.half_height, "Capsule reshaped");
            }
            Err(e) => warn!("Failed to reshape character collider: {}", e),
        }
    }

    /// Request a jump as if the jump key had been pressed
    pub fn jump(&mut self) {
        self.vertical.request_jump();
    }

    /// Register the rig's camera and start taking device input
    pub fn activate_camera(&mut self, registry: &mut dyn CameraRegistry) -> CameraId {
        let id = *self.camera.get_or_insert_with(CameraId::new);
        registry.register(id);
        registry.set_active(Some(id));
        self.input.set_active(true);
        self.rig.snap();
        self.publish_camera(registry);

        info!(camera = %id, mode = ?self.rig.mode(), "Camera activated");
        id
    }

    /// Release capture and unregister the camera. Safe to call repeatedly.
    pub fn deactivate(&mut self, registry: &mut dyn CameraRegistry) {
        self.input.set_active(false);
        if let Some(id) = self.camera.take() {
            if registry.active() == Some(id) {
                registry.set_active(None);
            }
            registry.unregister(id);
            info!(camera = %id, "Camera deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.input.is_active()
    }

    /// Push the current follow descriptor to the registry
    pub fn publish_camera(&self, registry: &mut dyn CameraRegistry) -> bool {
        match self.camera {
            Some(id) => registry.set_follow(id, self.rig.follow_descriptor(self.id, &self.config.camera)),
            None => false,
        }
    }

    /// Capture transitions not yet reported through `update`
    pub fn drain_capture_events(&mut self) -> Vec<ControllerEvent> {
        self.input
            .drain_notices()
            .into_iter()
            .map(|notice| ControllerEvent::CaptureChanged {
                captured: notice == CaptureNotice::Captured,
            })
            .collect()
    }

    /// Edit a copy of the config; the copy replaces the snapshot if valid
    pub fn update_config(&mut self, edit: impl FnOnce(&mut CharacterConfig)) -> Result<u64, ConfigError> {
        let mut next = (*self.config).clone();
        edit(&mut next);
        self.install(next)
    }

    /// Replace the config wholesale
    pub fn replace_config(&mut self, config: CharacterConfig) -> Result<u64, ConfigError> {
        self.install(config)
    }

    /// Merge a partial TOML document onto the current config
    pub fn apply_config_patch(&mut self, patch: &str) -> Result<u64, ConfigError> {
        let next = self.config.merged_with_toml(patch)?;
        self.install(next)
    }

    fn install(&mut self, next: CharacterConfig) -> Result<u64, ConfigError> {
        if let Err(e) = next.validate() {
            warn!("Rejected config update: {}", e);
            return Err(e);
        }
        let previous = Arc::clone(&self.config);

        let settings = next.kinematic_settings();
        if &settings != self.body.settings() {
            self.body.configure(settings);
        }
        if next.capsule != previous.capsule && self.body.is_spawned() {
            self.reshape_pending = true;
        }
        if next.camera.mode != previous.camera.mode {
            warn!("Camera mode is fixed once the rig is built, keeping {:?}", self.rig.mode());
        }
        if next.camera.distance != previous.camera.distance {
            self.rig.set_distance(next.camera.distance, &next.camera);
        } else {
            self.rig.set_distance(self.rig.distance(), &next.camera);
        }
        self.input.set_look_settings(next.camera.look_settings());
        if next.animations != previous.animations {
            self.animation.rebind(next.animations.as_ref());
        }

        self.config = Arc::new(next);
        self.revision += 1;
        info!(revision = self.revision, "Applied character config");
        Ok(self.revision)
    }

    /// Current config snapshot
    pub fn config(&self) -> Arc<CharacterConfig> {
        Arc::clone(&self.config)
    }

    pub fn config_revision(&self) -> u64 {
        self.revision
    }

    pub fn state(&self) -> &CharacterState {
        self.tracker.state()
    }

    pub fn input(&self) -> &InputSampler {
        &self.input
    }

    /// Device events and scripted input go through the sampler
    pub fn input_mut(&mut self) -> &mut InputSampler {
        &mut self.input
    }

    pub fn camera(&self) -> &CameraRig {
        &self.rig
    }

    pub fn camera_id(&self) -> Option<CameraId> {
        self.camera
    }

    pub fn body(&self) -> &CharacterBody {
        &self.body
    }

    /// Kinematic settings currently applied to the physics controller
    pub fn kinematic_settings(&self) -> &KinematicSettings {
        self.body.settings()
    }

    /// Visual transform: feet position and facing
    pub fn transform(&self) -> Transform {
        Transform::from_position_yaw(self.body.position(), self.tracker.state().facing_yaw)
    }

    /// Resolve animation bindings against the clips a rig offers
    pub fn attach_animations(&mut self, available: &[&str]) {
        self.animation.attach(available, self.config.animations.as_ref());
    }

    /// Move the feet to `position` and drop all motion state
    pub fn teleport(&mut self, physics: &mut PhysicsWorld, position: Vec3) -> Result<(), ControllerError> {
        self.body.teleport(physics, position)?;

        let look = self.input.look();
        let facing = self.tracker.state().facing_yaw;
        self.tracker.reset(look, facing);
        self.vertical.reset();
        self.rig.snap();

        let config = Arc::clone(&self.config);
        self.apply_stance(physics, &config);
        debug!(?position, "Teleported");
        Ok(())
    }

    /// Deactivate and remove the body. Safe to call repeatedly.
    pub fn dispose(&mut self, physics: &mut PhysicsWorld, registry: &mut dyn CameraRegistry) {
        self.deactivate(registry);
        if self.body.despawn(physics) {
            info!(id = %self.id, "Player controller disposed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraDirectory;
    use crate::input::InputAction;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.create_ground(0.0);
        world.update_queries();
        world
    }

    fn spawned(config: CharacterConfig) -> (PhysicsWorld, PlayerController) {
        let mut world = world();
        let mut controller = PlayerController::new(config).unwrap();
        controller
            .initialize(&mut world, Vec3::new(0.0, 0.05, 0.0))
            .unwrap();
        for _ in 0..30 {
            controller.update(&mut world, DT);
        }
        assert!(controller.state().is_grounded);
        (world, controller)
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut world = world();
        let mut controller = PlayerController::new(CharacterConfig::default()).unwrap();
        controller.initialize(&mut world, Vec3::ZERO).unwrap();
        assert!(matches!(
            controller.initialize(&mut world, Vec3::ZERO),
            Err(ControllerError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_invalid_capsule_rejected() {
        let mut config = CharacterConfig::default();
        config.capsule.radius = 0.0;
        assert!(PlayerController::new(config).is_err());
    }

    #[test]
    fn test_idle_character_stays_grounded() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        let start = controller.body().position();

        for _ in 0..120 {
            let report = controller.update(&mut world, DT);
            assert!(controller.state().is_grounded);
            assert_eq!(controller.state().velocity, Vec3::ZERO);
            assert!(!report.events.iter().any(|e| matches!(e, ControllerEvent::LeftGround)));
        }

        let end = controller.body().position();
        assert!((end.x - start.x).abs() < 1e-3);
        assert!((end.z - start.z).abs() < 1e-3);
    }

    #[test]
    fn test_zero_stop_speed_stays_at_rest() {
        let mut config = CharacterConfig::default();
        config.movement.stop_speed = 0.0;
        let (mut world, mut controller) = spawned(config);

        for _ in 0..30 {
            let report = controller.update(&mut world, DT);
            assert!(report.desired.is_finite());
            assert_eq!(controller.state().velocity, Vec3::ZERO);
            assert_eq!(controller.state().current_speed, 0.0);
        }
        assert!(controller.state().is_grounded);
    }

    #[test]
    fn test_third_person_camera_stops_at_wall() {
        let mut world = world();
        // Wall face 2.5 behind the character (camera side at yaw 0)
        world.create_static_box(Vec3::new(3.0, 3.0, 0.5), Vec3::new(0.0, 2.0, 3.0));
        world.update_queries();

        let config = CharacterConfig::default();
        let height = config.camera.height;
        let margin = config.camera.collision_margin;
        let min_distance = config.camera.min_distance.abs();
        let mut controller = PlayerController::new(config).unwrap();
        controller.initialize(&mut world, Vec3::new(0.0, 0.05, 0.0)).unwrap();
        for _ in 0..30 {
            controller.update(&mut world, DT);
            world.step();
        }

        let mut registry = CameraDirectory::new();
        controller.activate_camera(&mut registry);
        let report = controller.update(&mut world, DT);
        let pose = report.camera.unwrap();

        // The ray starts inside the character's own capsule
        let head = controller.body().position() + Vec3::Y * height;
        let expected = (2.5 - margin).max(min_distance);
        assert!(
            ((pose.position - head).length() - expected).abs() < 0.05,
            "camera {:?} head {:?}",
            pose.position,
            head
        );
        assert!((pose.position.y - head.y).abs() < 1e-3);
    }

    #[test]
    fn test_walk_forward() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        let config = controller.config();
        controller.input_mut().press(InputAction::MoveForward);

        for _ in 0..60 {
            controller.update(&mut world, DT);
            assert!(controller.state().current_speed <= config.movement.max_velocity + 1e-4);
        }

        let state = controller.state();
        assert!(state.is_grounded);
        assert!(state.current_speed > 0.95 * config.movement.max_speed);
        // Yaw 0 walks toward -Z, and the model turns to face it
        assert!(controller.body().position().z < -3.0);
        assert!(controller.transform().forward().z < -0.99);
    }

    #[test]
    fn test_jump_fires_once_and_lands() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        controller.jump();

        let mut jumps = 0;
        let mut landed = false;
        let mut peak: f32 = 0.0;
        for _ in 0..120 {
            let report = controller.update(&mut world, DT);
            peak = peak.max(controller.body().position().y);
            for event in &report.events {
                match event {
                    ControllerEvent::Jumped { .. } => jumps += 1,
                    ControllerEvent::Landed { .. } => landed = true,
                    _ => {}
                }
            }
            if landed {
                break;
            }
        }

        assert_eq!(jumps, 1);
        assert!(landed);
        assert!(peak > 0.5);
        assert!(!controller.state().is_jumping);
    }

    #[test]
    fn test_held_jump_does_not_repeat() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        controller.input_mut().press(InputAction::Jump);

        let mut jumps = 0;
        for _ in 0..180 {
            let report = controller.update(&mut world, DT);
            jumps += report
                .events
                .iter()
                .filter(|e| matches!(e, ControllerEvent::Jumped { .. }))
                .count();
        }
        assert_eq!(jumps, 1);
    }

    #[test]
    fn test_wall_blocks_movement() {
        let mut world = world();
        world.create_static_box(Vec3::new(5.0, 2.0, 0.5), Vec3::new(0.0, 2.0, -3.0));
        world.update_queries();

        let config = CharacterConfig::default();
        let radius = config.capsule.radius;
        let mut controller = PlayerController::new(config).unwrap();
        controller.initialize(&mut world, Vec3::new(0.0, 0.05, 0.0)).unwrap();
        controller.input_mut().press(InputAction::MoveForward);

        for _ in 0..180 {
            controller.update(&mut world, DT);
        }

        // Wall face is at z = -2.5
        let z = controller.body().position().z;
        assert!(z > -2.5 + radius - 0.05, "penetrated wall: z = {z}");
        assert!(z < -2.0);
    }

    #[test]
    fn test_crouch_lowers_collider() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        let config = controller.config();

        controller.input_mut().press(InputAction::Crouch);
        let report = controller.update(&mut world, DT);
        assert!(report
            .events
            .contains(&ControllerEvent::CrouchChanged { crouching: true }));

        let half = controller.body().collider_half_height(&world).unwrap();
        let expected = config.capsule.half_height * (1.0 - config.crouch.height_reduction);
        assert!((half - expected).abs() < 1e-5);

        controller.input_mut().release(InputAction::Crouch);
        controller.update(&mut world, DT);
        let half = controller.body().collider_half_height(&world).unwrap();
        assert!((half - config.capsule.half_height).abs() < 1e-5);
    }

    #[test]
    fn test_missing_body_skips_move() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        let handle = controller.body().body_handle().unwrap();
        world.remove_rigid_body(handle);

        let before = controller.body().position();
        controller.input_mut().press(InputAction::MoveForward);
        let report = controller.update(&mut world, DT);

        assert_eq!(report.desired, Vec3::ZERO);
        assert_eq!(report.corrected, Vec3::ZERO);
        assert_eq!(controller.body().position(), before);
    }

    #[test]
    fn test_config_update_round_trip() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());

        let revision = controller.update_config(|c| c.jump.force = 9.5).unwrap();
        assert_eq!(revision, 1);
        assert_eq!(controller.config().jump.force, 9.5);
        assert_eq!(controller.update(&mut world, DT).revision, 1);

        let revision = controller.apply_config_patch("[movement]\nmax_speed = 7.0\n").unwrap();
        assert_eq!(revision, 2);
        assert_eq!(controller.config().movement.max_speed, 7.0);
        assert_eq!(controller.config().jump.force, 9.5);
    }

    #[test]
    fn test_physics_settings_reapplied() {
        let (_world, mut controller) = spawned(CharacterConfig::default());
        controller
            .update_config(|c| {
                c.physics.snap_to_ground = 0.5;
                c.physics.max_climb_angle = 30.0;
            })
            .unwrap();

        let settings = controller.kinematic_settings();
        assert_eq!(settings.snap_to_ground, 0.5);
        assert!((settings.max_climb_angle - 30f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_keeps_snapshot() {
        let (_world, mut controller) = spawned(CharacterConfig::default());
        let before = controller.config();

        let result = controller.update_config(|c| {
            c.camera.pitch_down_limit = 20.0;
            c.camera.pitch_up_limit = -20.0;
        });
        assert!(result.is_err());
        assert_eq!(controller.config_revision(), 0);
        assert!(Arc::ptr_eq(&before, &controller.config()));
    }

    #[test]
    fn test_capsule_change_applied_next_tick() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        controller.update_config(|c| c.capsule.half_height = 0.7).unwrap();
        controller.update(&mut world, DT);
        let half = controller.body().collider_half_height(&world).unwrap();
        assert!((half - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_camera_lifecycle() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        let mut registry = CameraDirectory::new();

        assert!(controller.update(&mut world, DT).camera.is_none());

        let id = controller.activate_camera(&mut registry);
        assert_eq!(registry.active(), Some(id));
        let follow = registry.follow(id).unwrap();
        assert_eq!(follow.target, controller.id());

        let report = controller.update(&mut world, DT);
        assert!(report.camera.is_some());
        assert!(controller.publish_camera(&mut registry));

        controller.deactivate(&mut registry);
        controller.deactivate(&mut registry);
        assert!(registry.is_empty());
        assert!(!controller.is_active());
        assert!(controller.update(&mut world, DT).camera.is_none());
    }

    #[test]
    fn test_capture_changes_reported() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        let mut registry = CameraDirectory::new();
        controller.activate_camera(&mut registry);

        controller.input_mut().press(InputAction::CapturePointer);
        let report = controller.update(&mut world, DT);
        assert!(report
            .events
            .contains(&ControllerEvent::CaptureChanged { captured: true }));

        controller.deactivate(&mut registry);
        assert_eq!(
            controller.drain_capture_events(),
            vec![ControllerEvent::CaptureChanged { captured: false }]
        );
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        let mut registry = CameraDirectory::new();
        controller.activate_camera(&mut registry);

        controller.dispose(&mut world, &mut registry);
        controller.dispose(&mut world, &mut registry);
        assert_eq!(world.rigid_body_set.len(), 0);
        assert!(registry.is_empty());

        let report = controller.update(&mut world, DT);
        assert_eq!(report.corrected, Vec3::ZERO);
    }

    #[test]
    fn test_teleport_resets_motion() {
        let (mut world, mut controller) = spawned(CharacterConfig::default());
        controller.input_mut().press(InputAction::MoveForward);
        for _ in 0..20 {
            controller.update(&mut world, DT);
        }

        controller.teleport(&mut world, Vec3::new(10.0, 2.0, 0.0)).unwrap();
        assert_eq!(controller.state().velocity, Vec3::ZERO);
        assert_eq!(controller.transform().position, Vec3::new(10.0, 2.0, 0.0));
    }
}
