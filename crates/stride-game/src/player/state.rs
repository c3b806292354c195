//! Character state and the tracker that owns it
//!
//! `StateTracker` is the only writer of [`CharacterState`]. Every other stage
//! reads the previous tick's state and hands its results back through
//! [`TickFeedback`].

use glam::Vec3;
use stride_physics::MoveOutcome;
use tracing::debug;

use crate::config::CharacterConfig;
use crate::events::{ControllerEvent, SlideEndReason};
use crate::input::{InputState, LookAngles};

use super::jump::VerticalStep;
use super::movement::MovementOutput;

/// Horizontal speed above which the character counts as moving
const MOVING_THRESHOLD: f32 = 0.1;
/// Vertical motion below this counts as "stayed on the ground"
const STAY_EPSILON: f32 = 1e-3;
/// Fraction of the expected fall that still counts as blocked by the ground
const FELL_SHORT_FRACTION: f32 = 0.01;
/// Normals with a larger Y component are floor-like
const FLOOR_NORMAL_Y: f32 = 0.5;
/// Normals with a smaller |Y| component are walls
const WALL_NORMAL_Y: f32 = 0.7;

/// Everything observable about the character
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterState {
    pub is_grounded: bool,
    pub is_jumping: bool,
    pub is_sprinting: bool,
    pub is_moving: bool,
    pub is_crouching: bool,
    pub is_sliding: bool,
    /// Remaining slide time (seconds)
    pub slide_timer: f32,
    /// Horizontal velocity
    pub velocity: Vec3,
    pub vertical_velocity: f32,
    pub wish_direction: Vec3,
    /// Camera look angles used this tick
    pub look: LookAngles,
    /// Character yaw (model looks down its local -Z)
    pub facing_yaw: f32,
    pub surface_normal: Vec3,
    /// Seconds since leaving the ground
    pub air_time: f32,
    /// Simulation time of the last grounded tick
    pub last_grounded_time: f64,
    /// Simulation time of the last jump
    pub last_jump_time: Option<f64>,
    /// Horizontal speed
    pub current_speed: f32,
    /// Simulation time since the tracker was reset
    pub elapsed: f64,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            is_grounded: false,
            is_jumping: false,
            is_sprinting: false,
            is_moving: false,
            is_crouching: false,
            is_sliding: false,
            slide_timer: 0.0,
            velocity: Vec3::ZERO,
            vertical_velocity: 0.0,
            wish_direction: Vec3::ZERO,
            look: LookAngles::default(),
            facing_yaw: 0.0,
            surface_normal: Vec3::Y,
            air_time: 0.0,
            last_grounded_time: 0.0,
            last_jump_time: None,
            current_speed: 0.0,
            elapsed: 0.0,
        }
    }
}

impl CharacterState {
    /// Whether the collider should be in its lowered stance
    pub fn is_lowered(&self) -> bool {
        self.is_crouching || self.is_sliding
    }
}

/// Results of the other stages for one tick
#[derive(Debug, Clone, Copy)]
pub struct TickFeedback<'a> {
    pub input: &'a InputState,
    pub movement: &'a MovementOutput,
    pub vertical: &'a VerticalStep,
    /// Translation submitted to the physics bridge
    pub desired: Vec3,
    pub outcome: &'a MoveOutcome,
    pub dt: f32,
}

/// Single writer of `CharacterState`
#[derive(Debug, Clone, Default)]
pub struct StateTracker {
    state: CharacterState,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CharacterState {
        &self.state
    }

    /// Start over with the given look and facing (spawn, teleport)
    pub fn reset(&mut self, look: LookAngles, facing_yaw: f32) {
        self.state = CharacterState {
            look,
            facing_yaw,
            ..Default::default()
        };
    }

    /// Fold one tick of results into the state, returning transition events
    pub fn update(&mut self, config: &CharacterConfig, feedback: TickFeedback) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        let state = &mut self.state;
        let dt = feedback.dt;
        let outcome = feedback.outcome;
        let corrected = outcome.corrected;

        state.elapsed += dt as f64;
        state.look = feedback.input.look;
        state.wish_direction = feedback.movement.wish;
        state.facing_yaw = feedback.movement.facing_yaw;
        state.velocity = feedback.movement.velocity;
        state.vertical_velocity = feedback.vertical.vertical_velocity;

        if feedback.vertical.jumped {
            state.is_jumping = true;
            state.last_jump_time = Some(state.elapsed);
            events.push(ControllerEvent::Jumped {
                vertical_velocity: state.vertical_velocity,
            });
        }

        // Grounded: any of three signals, never while moving upward
        let was_grounded = state.is_grounded;
        let ascending = state.vertical_velocity > 0.0;
        let fell_short =
            feedback.desired.y < 0.0 && -corrected.y < FELL_SHORT_FRACTION * -feedback.desired.y;
        let stayed = was_grounded && corrected.y.abs() < STAY_EPSILON && state.vertical_velocity <= 0.0;
        state.is_grounded = !ascending && (outcome.grounded || fell_short || stayed);

        // Walls clip horizontal velocity; ceilings stop a rising jump
        let mut floor_normal: Option<Vec3> = None;
        for contact in &outcome.collisions {
            let normal = contact.normal;
            if normal.y > FLOOR_NORMAL_Y {
                if floor_normal.map_or(true, |n| normal.y > n.y) {
                    floor_normal = Some(normal);
                }
            } else if normal.y.abs() < WALL_NORMAL_Y {
                let wall = Vec3::new(normal.x, 0.0, normal.z).normalize_or_zero();
                let into = state.velocity.dot(wall);
                if into < 0.0 {
                    state.velocity -= wall * into;
                }
            } else if normal.y < -WALL_NORMAL_Y && state.vertical_velocity > 0.0 {
                state.vertical_velocity = 0.0;
            }
        }
        if let Some(normal) = floor_normal {
            state.surface_normal = normal;
        } else if !state.is_grounded {
            state.surface_normal = Vec3::Y;
        }

        if state.is_grounded && !was_grounded {
            let air_time = state.air_time;
            state.is_jumping = false;
            state.velocity *= config.movement.momentum_preservation;
            debug!(air_time, "Landed");
            events.push(ControllerEvent::Landed { air_time });
        } else if !state.is_grounded && was_grounded {
            debug!(jumped = feedback.vertical.jumped, "Left ground");
            events.push(ControllerEvent::LeftGround);
        }

        if state.is_grounded {
            state.air_time = 0.0;
            state.last_grounded_time = state.elapsed;
            state.vertical_velocity = state.vertical_velocity.max(0.0);
        } else {
            state.air_time += dt;
            if state.is_jumping && state.vertical_velocity <= 0.0 {
                state.is_jumping = false;
            }
        }

        state.current_speed = state.velocity.length();
        state.is_moving = state.current_speed > MOVING_THRESHOLD;

        // Crouch and slide are mutually exclusive
        let crouch_held = feedback.input.crouch;
        let crouch = &config.crouch;
        if state.is_sliding {
            state.slide_timer = (state.slide_timer - dt).max(0.0);

            let desired_horizontal = Vec3::new(feedback.desired.x, 0.0, feedback.desired.z).length();
            let moved_horizontal = Vec3::new(corrected.x, 0.0, corrected.z).length();
            let hit_wall = desired_horizontal > 1e-4 && moved_horizontal < 0.5 * desired_horizontal;

            let reason = if state.slide_timer <= 0.0 {
                Some(SlideEndReason::Expired)
            } else if !state.is_grounded {
                Some(SlideEndReason::LeftGround)
            } else if hit_wall {
                Some(SlideEndReason::HitWall)
            } else {
                None
            };

            if let Some(reason) = reason {
                state.is_sliding = false;
                state.slide_timer = 0.0;
                debug!(?reason, "Slide ended");
                events.push(ControllerEvent::SlideEnded { reason });
                if crouch_held {
                    state.is_crouching = true;
                    events.push(ControllerEvent::CrouchChanged { crouching: true });
                }
            }
        } else if crouch_held && !state.is_crouching {
            if state.is_grounded && state.current_speed >= crouch.slide_min_speed {
                state.is_sliding = true;
                state.slide_timer = crouch.slide_duration;
                debug!(speed = state.current_speed, "Slide started");
                events.push(ControllerEvent::SlideStarted {
                    speed: state.current_speed,
                });
            } else {
                state.is_crouching = true;
                events.push(ControllerEvent::CrouchChanged { crouching: true });
            }
        } else if !crouch_held && state.is_crouching {
            state.is_crouching = false;
            events.push(ControllerEvent::CrouchChanged { crouching: false });
        }

        state.is_sprinting = feedback.movement.sprinting && !state.is_lowered();

        events
    }
}
