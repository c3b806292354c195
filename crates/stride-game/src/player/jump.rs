//! Vertical motion with jump buffering and coyote time

use serde::{Deserialize, Serialize};

/// Timer remainders below this count as expired
const TIMER_EPSILON: f32 = 1e-4;

/// Jump and gravity tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Initial upward velocity of a jump
    pub force: f32,
    /// Downward acceleration (units/sec²)
    pub gravity: f32,
    /// Terminal fall speed
    pub max_fall_speed: f32,
    /// How long a jump press is remembered before landing (seconds)
    pub buffer_time: f32,
    /// How long after leaving the ground a jump still registers (seconds)
    pub coyote_time: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            force: 7.0,
            gravity: 20.0,
            max_fall_speed: 30.0,
            buffer_time: 0.15,
            coyote_time: 0.1,
        }
    }
}

/// Inputs for one vertical step
#[derive(Debug, Clone, Copy)]
pub struct VerticalInput {
    pub grounded: bool,
    pub jumping: bool,
    pub vertical_velocity: f32,
    /// Rising edge of the jump action this tick
    pub jump_pressed: bool,
    pub dt: f32,
}

/// Result of one vertical step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalStep {
    pub vertical_velocity: f32,
    /// Vertical translation to request from the physics bridge
    pub desired_y: f32,
    /// A jump fired this tick
    pub jumped: bool,
}

/// Owns the jump buffer and coyote timers
#[derive(Debug, Clone, Default)]
pub struct VerticalController {
    jump_buffer: f32,
    coyote_timer: f32,
    requested: bool,
}

impl VerticalController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a jump as if the jump key had just been pressed
    pub fn request_jump(&mut self) {
        self.requested = true;
    }

    pub fn jump_buffer(&self) -> f32 {
        self.jump_buffer
    }

    pub fn coyote_timer(&self) -> f32 {
        self.coyote_timer
    }

    /// Drop both windows (teleport, respawn)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn step(&mut self, config: &JumpConfig, input: VerticalInput) -> VerticalStep {
        let dt = input.dt;
        // A press still counts on the tick its window runs out
        let buffered = self.jump_buffer > TIMER_EPSILON;
        self.jump_buffer = (self.jump_buffer - dt).max(0.0);
        self.coyote_timer = (self.coyote_timer - dt).max(0.0);

        let pressed = input.jump_pressed || std::mem::take(&mut self.requested);
        if pressed {
            self.jump_buffer = config.buffer_time;
        }

        let mut vertical_velocity = input.vertical_velocity;
        if input.grounded {
            self.coyote_timer = config.coyote_time;
            if !input.jumping {
                vertical_velocity = 0.0;
            }
        }

        let can_jump =
            (pressed || buffered) && (input.grounded || self.coyote_timer > 0.0) && !input.jumping;

        if can_jump {
            vertical_velocity = config.force;
            self.jump_buffer = 0.0;
            self.coyote_timer = 0.0;
            return VerticalStep {
                vertical_velocity,
                desired_y: vertical_velocity * dt,
                jumped: true,
            };
        }

        if input.grounded && vertical_velocity <= 0.0 {
            // Small probe keeps the character pressed onto the ground
            return VerticalStep {
                vertical_velocity: 0.0,
                desired_y: -config.gravity * dt * dt,
                jumped: false,
            };
        }

        vertical_velocity = (vertical_velocity - config.gravity * dt).max(-config.max_fall_speed);
        VerticalStep {
            vertical_velocity,
            desired_y: vertical_velocity * dt,
            jumped: false,
        }
    }
}
