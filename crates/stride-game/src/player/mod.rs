//! Player movement module
//!
//! Per tick: input snapshot, horizontal solve, vertical/jump step, physics
//! move, state update, animation tag, camera.

mod animation;
mod controller;
mod jump;
mod movement;
mod state;

pub use animation::{select_tag, AnimationSelector, AnimationTag};
pub use controller::{PlayerController, TickReport};
pub use jump::{JumpConfig, VerticalController, VerticalInput, VerticalStep};
pub use movement::{
    accelerate_air, accelerate_ground, apply_ground_friction, solve, target_speed, wish_direction,
    CrouchConfig, MovementConfig, MovementContext, MovementOutput,
};
pub use state::{CharacterState, StateTracker, TickFeedback};
