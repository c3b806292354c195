//! Events emitted by the controller during a tick

use crate::player::AnimationTag;

/// Why a slide ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideEndReason {
    /// The slide timer ran out
    Expired,
    /// The character left the ground
    LeftGround,
    /// Horizontal motion was blocked by an obstacle
    HitWall,
}

/// Something observable that happened during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// A jump fired this tick
    Jumped { vertical_velocity: f32 },
    /// The character touched down after `air_time` seconds airborne
    Landed { air_time: f32 },
    /// The character walked or fell off the ground
    LeftGround,
    /// Crouch started or ended
    CrouchChanged { crouching: bool },
    /// A slide started at the given horizontal speed
    SlideStarted { speed: f32 },
    /// A slide ended
    SlideEnded { reason: SlideEndReason },
    /// The selected animation tag changed
    AnimationChanged { tag: AnimationTag, clip: Option<String> },
    /// Pointer capture was entered or exited; the host should lock/unlock the cursor
    CaptureChanged { captured: bool },
}
