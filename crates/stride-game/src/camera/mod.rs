//! Camera system module
//!
//! First-person (attached) and third-person (orbiting) rig with collision
//! avoidance, plus the id-keyed registry hosts publish follow data into.

mod config;
mod registry;
mod rig;

pub use config::{CameraConfig, CameraMode};
pub use registry::{CameraDirectory, CameraId, CameraRegistry, FollowDescriptor};
pub use rig::{CameraPose, CameraRig, RigInput};
