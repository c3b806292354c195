//! Camera configuration

use serde::{Deserialize, Serialize};

use crate::input::LookSettings;

/// How the camera relates to the character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// Attached at eye height, rotation straight from look angles
    FirstPerson,
    /// Orbiting behind the character with collision avoidance
    #[default]
    ThirdPerson,
}

/// Camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera mode (fixed once a rig is built)
    pub mode: CameraMode,
    /// Ideal orbit distance in third person
    pub distance: f32,
    /// Orbit pivot height above the feet
    pub height: f32,
    /// Highest pitch in degrees
    pub pitch_up_limit: f32,
    /// Lowest pitch in degrees
    pub pitch_down_limit: f32,
    /// Mouse sensitivity (radians per pixel)
    pub sensitivity: f32,
    /// Invert vertical look
    pub invert_y: bool,
    /// Closest the orbit may be pulled in by obstacles or zoom (sign ignored)
    pub min_distance: f32,
    /// Farthest zoom distance
    pub max_distance: f32,
    /// Gap left between the camera and an obstruction
    pub collision_margin: f32,
    /// Eye-height smoothing in first person (0-1, lower = smoother)
    pub first_person_smoothing: f32,
    /// Look-at and height smoothing in third person (0-1, lower = smoother)
    pub third_person_smoothing: f32,
    /// Distance change per scroll notch
    pub zoom_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            mode: CameraMode::ThirdPerson,
            distance: 4.0,
            height: 1.6,
            pitch_up_limit: 80.0,
            pitch_down_limit: -80.0,
            sensitivity: 0.003,
            invert_y: false,
            min_distance: 1.0,
            max_distance: 10.0,
            collision_margin: 0.2,
            first_person_smoothing: 0.5,
            third_person_smoothing: 0.15,
            zoom_speed: 0.5,
        }
    }
}

impl CameraConfig {
    /// Pointer-look settings for the input sampler
    pub fn look_settings(&self) -> LookSettings {
        LookSettings {
            sensitivity: self.sensitivity,
            invert_y: self.invert_y,
            pitch_min: self.pitch_down_limit.to_radians(),
            pitch_max: self.pitch_up_limit.to_radians(),
        }
    }

    /// Smoothing factor for the given mode
    pub fn smoothing(&self, mode: CameraMode) -> f32 {
        match mode {
            CameraMode::FirstPerson => self.first_person_smoothing,
            CameraMode::ThirdPerson => self.third_person_smoothing,
        }
    }

    /// Clamp an orbit distance to the zoom range
    pub fn clamp_distance(&self, distance: f32) -> f32 {
        let min = self.min_distance.abs();
        distance.clamp(min, self.max_distance.max(min))
    }
}
