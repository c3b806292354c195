//! Character configuration
//!
//! A `CharacterConfig` is replaced wholesale: edits produce a new validated
//! snapshot which the controller hands out by `Arc` for the following ticks.
//! Configs round-trip through TOML so editors can persist and patch them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stride_physics::{BodySettings, KinematicSettings};
use tracing::info;

use crate::camera::CameraConfig;
use crate::error::ConfigError;
use crate::player::{AnimationTag, CrouchConfig, JumpConfig, MovementConfig};

/// Complete tunables for one character
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub capsule: CapsuleConfig,
    pub movement: MovementConfig,
    pub crouch: CrouchConfig,
    pub jump: JumpConfig,
    pub camera: CameraConfig,
    pub physics: KinematicConfig,
    /// Animation clip names per tag (optional)
    pub animations: Option<AnimationBindings>,
}

/// Capsule collider dimensions and derived heights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleConfig {
    /// Capsule radius
    pub radius: f32,
    /// Half length of the cylindrical section (standing)
    pub half_height: f32,
    /// Vertical offset of the capsule center (signed)
    pub offset: f32,
    /// Camera eye height above the feet (first person)
    pub eye_height: f32,
    /// Upper-torso height the third-person camera looks at
    pub look_at_height: f32,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            radius: 0.35,
            half_height: 0.55,
            offset: 0.0,
            eye_height: 1.6,
            look_at_height: 1.4,
        }
    }
}

impl CapsuleConfig {
    /// Standing height of the capsule
    pub fn height(&self) -> f32 {
        2.0 * (self.radius + self.half_height)
    }

    pub(crate) fn body_settings(&self) -> BodySettings {
        BodySettings {
            radius: self.radius,
            half_height: self.half_height,
            offset: self.offset,
        }
    }
}

/// Settings pushed into the physics engine's kinematic controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicConfig {
    /// Gap kept between the capsule and obstacles
    pub skin_offset: f32,
    /// Steepest walkable slope in degrees
    pub max_climb_angle: f32,
    /// Slope in degrees above which the character slides down
    pub min_slide_angle: f32,
    /// Tallest step climbed automatically (0 disables autostep)
    pub autostep_max_height: f32,
    /// Minimum free width on top of a step
    pub autostep_min_width: f32,
    /// Whether dynamic bodies can be stepped onto
    pub autostep_include_dynamic: bool,
    /// Snap-to-ground distance (0 disables snapping)
    pub snap_to_ground: f32,
    /// Push dynamic bodies the character walks into
    pub push_dynamic_bodies: bool,
    /// Mass used when pushing dynamic bodies
    pub character_mass: f32,
}

impl Default for KinematicConfig {
    fn default() -> Self {
        Self {
            skin_offset: 0.02,
            max_climb_angle: 45.0,
            min_slide_angle: 30.0,
            autostep_max_height: 0.3,
            autostep_min_width: 0.2,
            autostep_include_dynamic: true,
            snap_to_ground: 0.2,
            push_dynamic_bodies: true,
            character_mass: 80.0,
        }
    }
}

/// Animation clip names bound to each tag
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationBindings {
    pub idle: Option<String>,
    pub walk: Option<String>,
    pub sprint: Option<String>,
    pub jump: Option<String>,
    pub fall: Option<String>,
    pub crouch: Option<String>,
    pub slide: Option<String>,
}

impl AnimationBindings {
    /// Clip bound to `tag`, if any
    pub fn clip(&self, tag: AnimationTag) -> Option<&str> {
        let clip = match tag {
            AnimationTag::Idle => &self.idle,
            AnimationTag::Walk => &self.walk,
            AnimationTag::Sprint => &self.sprint,
            AnimationTag::JumpRise => &self.jump,
            AnimationTag::Fall => &self.fall,
            AnimationTag::Crouch => &self.crouch,
            AnimationTag::Slide => &self.slide,
        };
        clip.as_deref()
    }
}

impl CharacterConfig {
    /// Check invariants. Rejected configs never reach the controller.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if camera.pitch_down_limit > camera.pitch_up_limit {
            return Err(invalid(
                "camera.pitch_down_limit",
                format!(
                    "{} is above pitch_up_limit {}",
                    camera.pitch_down_limit, camera.pitch_up_limit
                ),
            ));
        }
        if camera.min_distance.abs() > camera.max_distance {
            return Err(invalid(
                "camera.min_distance",
                format!("|{}| exceeds max_distance {}", camera.min_distance, camera.max_distance),
            ));
        }
        for (field, value) in [
            ("camera.first_person_smoothing", camera.first_person_smoothing),
            ("camera.third_person_smoothing", camera.third_person_smoothing),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(field, format!("{value} is outside (0, 1]")));
            }
        }

        if !(self.capsule.radius > 0.0) {
            return Err(invalid("capsule.radius", "must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.crouch.height_reduction) {
            return Err(invalid(
                "crouch.height_reduction",
                format!("{} is outside [0, 1]", self.crouch.height_reduction),
            ));
        }

        let non_negative = [
            ("capsule.half_height", self.capsule.half_height),
            ("capsule.eye_height", self.capsule.eye_height),
            ("capsule.look_at_height", self.capsule.look_at_height),
            ("movement.max_speed", self.movement.max_speed),
            ("movement.acceleration", self.movement.acceleration),
            ("movement.sprint_multiplier", self.movement.sprint_multiplier),
            ("movement.air_acceleration", self.movement.air_acceleration),
            ("movement.air_max_speed", self.movement.air_max_speed),
            ("movement.ground_friction", self.movement.ground_friction),
            ("movement.air_friction", self.movement.air_friction),
            ("movement.slope_friction", self.movement.slope_friction),
            ("movement.stop_speed", self.movement.stop_speed),
            ("movement.momentum_preservation", self.movement.momentum_preservation),
            ("movement.max_velocity", self.movement.max_velocity),
            ("movement.velocity_damping", self.movement.velocity_damping),
            ("movement.turn_smoothing", self.movement.turn_smoothing),
            ("crouch.crouch_speed_multiplier", self.crouch.crouch_speed_multiplier),
            ("crouch.slide_speed_multiplier", self.crouch.slide_speed_multiplier),
            ("crouch.slide_duration", self.crouch.slide_duration),
            ("crouch.slide_deceleration", self.crouch.slide_deceleration),
            ("crouch.slide_min_speed", self.crouch.slide_min_speed),
            ("jump.force", self.jump.force),
            ("jump.gravity", self.jump.gravity),
            ("jump.max_fall_speed", self.jump.max_fall_speed),
            ("jump.buffer_time", self.jump.buffer_time),
            ("jump.coyote_time", self.jump.coyote_time),
            ("camera.distance", camera.distance),
            ("camera.sensitivity", camera.sensitivity),
            ("camera.max_distance", camera.max_distance),
            ("camera.collision_margin", camera.collision_margin),
            ("camera.zoom_speed", camera.zoom_speed),
            ("physics.skin_offset", self.physics.skin_offset),
            ("physics.max_climb_angle", self.physics.max_climb_angle),
            ("physics.min_slide_angle", self.physics.min_slide_angle),
            ("physics.autostep_max_height", self.physics.autostep_max_height),
            ("physics.autostep_min_width", self.physics.autostep_min_width),
            ("physics.snap_to_ground", self.physics.snap_to_ground),
            ("physics.character_mass", self.physics.character_mass),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(invalid(field, format!("{value} must be a finite, non-negative number")));
            }
        }

        Ok(())
    }

    /// Settings for the physics engine's kinematic controller
    pub fn kinematic_settings(&self) -> KinematicSettings {
        let physics = &self.physics;
        KinematicSettings {
            skin_offset: physics.skin_offset,
            max_climb_angle: physics.max_climb_angle.to_radians(),
            min_slide_angle: physics.min_slide_angle.to_radians(),
            autostep_max_height: physics.autostep_max_height,
            autostep_min_width: physics.autostep_min_width,
            autostep_include_dynamic: physics.autostep_include_dynamic,
            snap_to_ground: physics.snap_to_ground,
            push_dynamic_bodies: physics.push_dynamic_bodies,
            character_mass: physics.character_mass,
        }
    }

    /// Parse and validate a full config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Overlay a partial TOML document (e.g. `[jump]\nforce = 9.0`) onto a copy
    pub fn merged_with_toml(&self, patch: &str) -> Result<Self, ConfigError> {
        let mut base = toml::Value::try_from(self)?;
        let patch: toml::Table = toml::from_str(patch)?;
        merge_tables(&mut base, toml::Value::Table(patch));

        let merged: Self = base.try_into()?;
        merged.validate()?;
        Ok(merged)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded character config from {:?}", path);
        Ok(config)
    }

    /// Write the config to disk, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::Io(dir.to_path_buf(), e))?;
        }
        let text = self.to_toml_string()?;
        fs::write(path, text).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!("Saved character config to {:?}", path);
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn merge_tables(base: &mut toml::Value, patch: toml::Value) {
    match (base, patch) {
        (toml::Value::Table(base), toml::Value::Table(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge_tables(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraMode;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CharacterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_pitch_limits_rejected() {
        let mut config = CharacterConfig::default();
        config.camera.pitch_down_limit = 30.0;
        config.camera.pitch_up_limit = -30.0;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "camera.pitch_down_limit",
                ..
            }
        ));
    }

    #[test]
    fn test_negative_speed_rejected() {
        let mut config = CharacterConfig::default();
        config.movement.max_speed = -1.0;
        assert!(config.validate().is_err());

        let mut config = CharacterConfig::default();
        config.jump.gravity = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_signed_offset_allowed() {
        let mut config = CharacterConfig::default();
        config.capsule.offset = -0.1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = CharacterConfig::default();
        config.camera.mode = CameraMode::FirstPerson;
        config.animations = Some(AnimationBindings {
            idle: Some("idle_loop".into()),
            ..Default::default()
        });

        let text = config.to_toml_string().unwrap();
        let parsed = CharacterConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CharacterConfig::from_toml_str("[jump]\nforce = 9.5\n").unwrap();
        assert_eq!(config.jump.force, 9.5);
        assert_eq!(config.movement, MovementConfig::default());
    }

    #[test]
    fn test_merge_patch_keeps_other_fields() {
        let mut base = CharacterConfig::default();
        base.movement.max_speed = 8.0;

        let merged = base
            .merged_with_toml("[jump]\nforce = 12.0\n[camera]\ndistance = 6.0\n")
            .unwrap();
        assert_eq!(merged.jump.force, 12.0);
        assert_eq!(merged.camera.distance, 6.0);
        assert_eq!(merged.movement.max_speed, 8.0);
        assert_eq!(merged.jump.coyote_time, base.jump.coyote_time);
    }

    #[test]
    fn test_merge_patch_validates() {
        let base = CharacterConfig::default();
        let result = base.merged_with_toml("[camera]\npitch_down_limit = 85.0\npitch_up_limit = 10.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_kinematic_settings_in_radians() {
        let config = CharacterConfig::default();
        let settings = config.kinematic_settings();
        assert!((settings.max_climb_angle - 45f32.to_radians()).abs() < 1e-6);
        assert_eq!(settings.snap_to_ground, config.physics.snap_to_ground);
    }

    #[test]
    fn test_animation_binding_lookup() {
        let bindings = AnimationBindings {
            slide: Some("slide".into()),
            ..Default::default()
        };
        assert_eq!(bindings.clip(AnimationTag::Slide), Some("slide"));
        assert_eq!(bindings.clip(AnimationTag::Idle), None);
    }
}
