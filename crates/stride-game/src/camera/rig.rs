//! Camera rig with smoothing and collision avoidance

use glam::{EulerRot, Mat4, Quat, Vec3};
use rapier3d::prelude::RigidBodyHandle;
use stride_core::EntityId;
use stride_physics::SceneQuery;

use crate::config::CapsuleConfig;
use crate::input::LookAngles;

use super::{CameraConfig, CameraMode, FollowDescriptor};

/// Where the camera is and what it looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Quat,
    pub look_at: Vec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            look_at: Vec3::NEG_Z,
        }
    }
}

impl CameraPose {
    /// Viewing direction
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }
}

/// Per-tick inputs to the rig
#[derive(Debug, Clone, Copy)]
pub struct RigInput {
    /// Character feet position
    pub anchor: Vec3,
    pub look: LookAngles,
    /// How far the stance lowered the character's head (crouch/slide)
    pub stance_drop: f32,
    /// Body to ignore in collision raycasts
    pub exclude: Option<RigidBodyHandle>,
    pub dt: f32,
}

/// Camera rig for one character. The mode is fixed at construction.
#[derive(Debug, Clone)]
pub struct CameraRig {
    mode: CameraMode,
    /// Current orbit distance (zoom)
    distance: f32,
    /// Smoothed orbit pivot height / first-person eye height
    height: f32,
    /// Smoothed look-at target
    look_at: Vec3,
    /// Offset from the anchor after collision avoidance
    offset: Vec3,
    pose: CameraPose,
    initialized: bool,
}

/// Frame-rate independent smoothing factor
fn smoothing_alpha(smoothing: f32, dt: f32) -> f32 {
    1.0 - (1.0 - smoothing.clamp(0.0, 1.0)).powf(dt * 60.0)
}

impl CameraRig {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            mode: config.mode,
            distance: config.clamp_distance(config.distance),
            height: 0.0,
            look_at: Vec3::ZERO,
            offset: Vec3::ZERO,
            pose: CameraPose::default(),
            initialized: false,
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Set the orbit distance, clamped to the zoom range
    pub fn set_distance(&mut self, distance: f32, config: &CameraConfig) {
        self.distance = config.clamp_distance(distance);
    }

    /// Scroll zoom (positive notches zoom in)
    pub fn zoom(&mut self, notches: f32, config: &CameraConfig) {
        if notches != 0.0 && notches.is_finite() {
            self.set_distance(self.distance - notches * config.zoom_speed, config);
        }
    }

    /// Offset from the anchor used for the last pose
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Drop smoothing history so the next update snaps (spawn, teleport)
    pub fn snap(&mut self) {
        self.initialized = false;
    }

    /// Follow data for the camera registry
    pub fn follow_descriptor(&self, target: EntityId, config: &CameraConfig) -> FollowDescriptor {
        FollowDescriptor {
            target,
            offset: self.offset,
            smoothing: config.smoothing(self.mode),
            follow_position: true,
            follow_rotation: self.mode == CameraMode::FirstPerson,
        }
    }

    /// Place the camera for this tick
    pub fn update(
        &mut self,
        config: &CameraConfig,
        capsule: &CapsuleConfig,
        input: RigInput,
        scene: &dyn SceneQuery,
    ) -> CameraPose {
        let alpha = if self.initialized {
            smoothing_alpha(config.smoothing(self.mode), input.dt)
        } else {
            1.0
        };
        self.initialized = true;

        self.pose = match self.mode {
            CameraMode::FirstPerson => self.update_attached(capsule, input, alpha),
            CameraMode::ThirdPerson => self.update_orbit(config, capsule, input, scene, alpha),
        };
        self.pose
    }

    fn update_attached(&mut self, capsule: &CapsuleConfig, input: RigInput, alpha: f32) -> CameraPose {
        let eye_height = capsule.eye_height - input.stance_drop;
        self.height += (eye_height - self.height) * alpha;
        self.offset = Vec3::Y * self.height;

        let position = input.anchor + self.offset;
        let rotation = Quat::from_euler(EulerRot::YXZ, input.look.yaw, input.look.pitch, 0.0);
        self.look_at = position + rotation * Vec3::NEG_Z;

        CameraPose {
            position,
            rotation,
            look_at: self.look_at,
        }
    }

    fn update_orbit(
        &mut self,
        config: &CameraConfig,
        capsule: &CapsuleConfig,
        input: RigInput,
        scene: &dyn SceneQuery,
        alpha: f32,
    ) -> CameraPose {
        let target_height = config.height - input.stance_drop;
        self.height += (target_height - self.height) * alpha;

        let LookAngles { pitch, yaw } = input.look;
        let d = self.distance;
        let spherical = Vec3::new(
            yaw.sin() * pitch.cos() * d,
            pitch.sin() * d,
            yaw.cos() * pitch.cos() * d,
        );
        let mut arm = spherical;

        // Pull in along the head ray when something sits between it and the camera
        let head = input.anchor + Vec3::Y * self.height;
        if let Some(hit) = scene.cast_ray(head, spherical, d, input.exclude) {
            let length = (hit - config.collision_margin).max(config.min_distance.abs());
            arm = spherical.normalize_or_zero() * length;
        }
        let offset = Vec3::Y * self.height + arm;
        self.offset = offset;

        let torso = input.anchor + Vec3::Y * (capsule.look_at_height - input.stance_drop);
        self.look_at = self.look_at.lerp(torso, alpha);

        let position = input.anchor + offset;
        let rotation = match (self.look_at - position).try_normalize() {
            Some(dir) => {
                let yaw = (-dir.x).atan2(-dir.z);
                let pitch = dir.y.clamp(-1.0, 1.0).asin();
                Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0)
            }
            None => self.pose.rotation,
        };

        CameraPose {
            position,
            rotation,
            look_at: self.look_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    /// Reports a hit at a fixed distance, or nothing
    struct FixedHit(Option<f32>);

    impl SceneQuery for FixedHit {
        fn cast_ray(&self, _: Vec3, _: Vec3, max_distance: f32, _: Option<RigidBodyHandle>) -> Option<f32> {
            self.0.filter(|d| *d <= max_distance)
        }
    }

    fn input(look: LookAngles) -> RigInput {
        RigInput {
            anchor: Vec3::ZERO,
            look,
            stance_drop: 0.0,
            exclude: None,
            dt: DT,
        }
    }

    fn third_person(height: f32) -> CameraConfig {
        CameraConfig {
            mode: CameraMode::ThirdPerson,
            distance: 5.0,
            height,
            ..Default::default()
        }
    }

    #[test]
    fn test_orbit_sits_behind_facing() {
        let config = third_person(1.6);
        let mut rig = CameraRig::new(&config);
        rig.update(&config, &CapsuleConfig::default(), input(LookAngles::default()), &FixedHit(None));

        // Yaw 0 faces -Z, so the camera sits on +Z
        let offset = rig.offset();
        assert!((offset - Vec3::new(0.0, 1.6, 5.0)).length() < 1e-4);
        assert!(rig.pose().forward().z < 0.0);
    }

    #[test]
    fn test_obstruction_shortens_offset() {
        let config = third_person(0.0);
        let mut rig = CameraRig::new(&config);
        let scene = FixedHit(Some(3.0));
        rig.update(&config, &CapsuleConfig::default(), input(LookAngles::default()), &scene);

        let expected = (3.0 - 0.2f32).max(config.min_distance.abs());
        assert!((rig.offset().length() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_obstruction_keeps_pivot_height() {
        let config = third_person(1.6);
        let capsule = CapsuleConfig::default();
        let mut rig = CameraRig::new(&config);
        let pose = rig.update(&config, &capsule, input(LookAngles::default()), &FixedHit(Some(2.5)));

        assert!((pose.position - Vec3::new(0.0, 1.6, 2.3)).length() < 1e-4);
        assert!(pose.position.y > capsule.look_at_height);
    }

    #[test]
    fn test_close_obstruction_respects_min_distance() {
        let config = CameraConfig {
            min_distance: -1.5,
            ..third_person(0.0)
        };
        let mut rig = CameraRig::new(&config);
        let scene = FixedHit(Some(0.5));
        let look = LookAngles { pitch: 0.3, yaw: 1.0 };
        rig.update(&config, &CapsuleConfig::default(), input(look), &scene);

        assert!((rig.offset().length() - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_no_hit_keeps_ideal_distance() {
        let config = third_person(0.0);
        let mut rig = CameraRig::new(&config);
        let look = LookAngles { pitch: -0.4, yaw: 2.0 };
        rig.update(&config, &CapsuleConfig::default(), input(look), &FixedHit(None));
        assert!((rig.offset().length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_look_at_smoothed_after_first_frame() {
        let config = third_person(1.6);
        let capsule = CapsuleConfig::default();
        let mut rig = CameraRig::new(&config);
        rig.update(&config, &capsule, input(LookAngles::default()), &FixedHit(None));
        assert!((rig.pose().look_at.y - capsule.look_at_height).abs() < 1e-5);

        let mut moved = input(LookAngles::default());
        moved.anchor = Vec3::new(0.0, 0.0, -1.0);
        rig.update(&config, &capsule, moved, &FixedHit(None));
        let look_at = rig.pose().look_at;
        assert!(look_at.z < 0.0 && look_at.z > -1.0);
    }

    #[test]
    fn test_first_person_pins_eye_height() {
        let config = CameraConfig {
            mode: CameraMode::FirstPerson,
            ..Default::default()
        };
        let capsule = CapsuleConfig::default();
        let mut rig = CameraRig::new(&config);
        let look = LookAngles { pitch: 0.2, yaw: 0.5 };
        let pose = rig.update(&config, &capsule, input(look), &FixedHit(Some(0.1)));

        assert!((pose.position.y - capsule.eye_height).abs() < 1e-5);
        let expected = Quat::from_euler(EulerRot::YXZ, 0.5, 0.2, 0.0);
        assert!(pose.rotation.abs_diff_eq(expected, 1e-5));

        // Crouching lowers the eye smoothly
        let mut crouched = input(look);
        crouched.stance_drop = 0.5;
        let pose = rig.update(&config, &capsule, crouched, &FixedHit(None));
        assert!(pose.position.y < capsule.eye_height);
        assert!(pose.position.y > capsule.eye_height - 0.5);
    }

    #[test]
    fn test_zoom_clamped() {
        let config = third_person(1.6);
        let mut rig = CameraRig::new(&config);
        rig.zoom(100.0, &config);
        assert_eq!(rig.distance(), config.min_distance.abs());
        rig.zoom(-100.0, &config);
        assert_eq!(rig.distance(), config.max_distance);
    }
}
