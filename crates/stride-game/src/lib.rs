//! Stride Game - Player movement core
//!
//! Turns raw input into physically consistent character motion and keeps a
//! camera rig framed on the character:
//! - `InputSampler`: per-tick input snapshots with pointer capture
//! - `player`: movement solver, jump controller, state tracker, animation tags
//! - `camera`: first/third-person rig with collision avoidance
//! - `PlayerController`: the facade that runs one tick end to end

pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod player;

pub use camera::{
    CameraConfig, CameraDirectory, CameraId, CameraMode, CameraPose, CameraRegistry, CameraRig,
    FollowDescriptor, RigInput,
};
pub use config::{AnimationBindings, CapsuleConfig, CharacterConfig, KinematicConfig};
pub use error::{ConfigError, ControllerError};
pub use events::{ControllerEvent, SlideEndReason};
pub use input::{
    CaptureNotice, InputAction, InputBinding, InputBindings, InputSampler, InputState, LookAngles,
    LookSettings,
};
pub use player::{
    AnimationSelector, AnimationTag, CharacterState, CrouchConfig, JumpConfig, MovementConfig,
    PlayerController, StateTracker, TickReport, VerticalController,
};
