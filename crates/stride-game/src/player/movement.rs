//! Horizontal movement solver
//!
//! Ground movement is friction-then-accelerate toward `wish * target_speed`.
//! Air movement uses the air-strafe model: only the velocity component along
//! the wish direction is topped up, capped at `air_max_speed`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::input::InputState;

/// Minimum dot product between velocity and wish direction for ground
/// friction to be skipped
const ALIGNED_DOT: f32 = 0.9;

/// Horizontal movement tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Ground speed target (units/sec)
    pub max_speed: f32,
    /// Ground acceleration (units/sec²)
    pub acceleration: f32,
    /// Sprint speed multiplier
    pub sprint_multiplier: f32,
    /// Air acceleration along the wish direction (units/sec²)
    pub air_acceleration: f32,
    /// Cap for the velocity component along the wish direction while airborne
    pub air_max_speed: f32,
    /// Ground friction coefficient
    pub ground_friction: f32,
    /// Air friction coefficient (applied to the whole vector)
    pub air_friction: f32,
    /// Extra friction on slopes, scaled by slope steepness
    pub slope_friction: f32,
    /// Speeds below this snap to zero under friction
    pub stop_speed: f32,
    /// Fraction of horizontal velocity kept on landing
    pub momentum_preservation: f32,
    /// Hard horizontal speed cap
    pub max_velocity: f32,
    /// Uniform velocity damping (per second)
    pub velocity_damping: f32,
    /// Third-person turn smoothing time constant in seconds (0 = snap)
    pub turn_smoothing: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed: 6.0,
            acceleration: 50.0,
            sprint_multiplier: 1.6,
            air_acceleration: 10.0,
            air_max_speed: 1.5,
            ground_friction: 6.0,
            air_friction: 0.2,
            slope_friction: 2.0,
            stop_speed: 0.1,
            momentum_preservation: 0.9,
            max_velocity: 20.0,
            velocity_damping: 0.1,
            turn_smoothing: 0.0,
        }
    }
}

/// Crouch and slide tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrouchConfig {
    /// Speed multiplier while crouched
    pub crouch_speed_multiplier: f32,
    /// Speed multiplier while sliding
    pub slide_speed_multiplier: f32,
    /// Slide length in seconds
    pub slide_duration: f32,
    /// Speed lost per second while sliding (replaces ground friction)
    pub slide_deceleration: f32,
    /// Fraction of the capsule half height removed while crouched or sliding
    pub height_reduction: f32,
    /// Minimum horizontal speed for crouch to start a slide
    pub slide_min_speed: f32,
}

impl Default for CrouchConfig {
    fn default() -> Self {
        Self {
            crouch_speed_multiplier: 0.5,
            slide_speed_multiplier: 1.3,
            slide_duration: 0.8,
            slide_deceleration: 4.0,
            height_reduction: 0.5,
            slide_min_speed: 5.0,
        }
    }
}

/// Everything the solver reads for one tick
#[derive(Debug, Clone, Copy)]
pub struct MovementContext<'a> {
    pub input: &'a InputState,
    pub movement: &'a MovementConfig,
    pub crouch: &'a CrouchConfig,
    /// Camera yaw (radians)
    pub yaw: f32,
    /// Horizontal velocity from the previous tick
    pub velocity: Vec3,
    pub grounded: bool,
    pub crouching: bool,
    pub sliding: bool,
    pub surface_normal: Vec3,
    /// Character facing yaw from the previous tick
    pub facing_yaw: f32,
    /// Orbiting camera: the character turns toward its wish direction
    pub third_person: bool,
    pub dt: f32,
}

/// Solver result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementOutput {
    /// New horizontal velocity
    pub velocity: Vec3,
    /// Horizontal translation to request from the physics bridge
    pub desired: Vec3,
    /// Unit wish direction, zero without input
    pub wish: Vec3,
    /// New facing yaw
    pub facing_yaw: f32,
    /// Whether sprint applied this tick
    pub sprinting: bool,
}

/// Unit wish direction from the movement flags, rotated by `yaw`
pub fn wish_direction(input: &InputState, yaw: f32) -> Vec3 {
    let forward = Vec3::new(-yaw.sin(), 0.0, -yaw.cos());
    let right = Vec3::new(yaw.cos(), 0.0, -yaw.sin());

    let mut wish = Vec3::ZERO;
    if input.forward {
        wish += forward;
    }
    if input.backward {
        wish -= forward;
    }
    if input.right {
        wish += right;
    }
    if input.left {
        wish -= right;
    }
    wish.normalize_or_zero()
}

/// Multiplicative target speed
pub fn target_speed(
    movement: &MovementConfig,
    crouch: &CrouchConfig,
    sprinting: bool,
    crouching: bool,
    sliding: bool,
) -> f32 {
    let mut speed = movement.max_speed;
    if sprinting {
        speed *= movement.sprint_multiplier;
    }
    if crouching {
        speed *= crouch.crouch_speed_multiplier;
    }
    if sliding {
        speed *= crouch.slide_speed_multiplier;
    }
    speed
}

/// Ground friction. Skipped when already moving along the wish direction.
pub fn apply_ground_friction(velocity: Vec3, wish: Vec3, friction: f32, stop_speed: f32, dt: f32) -> Vec3 {
    let speed = velocity.length();
    if speed <= stop_speed || speed <= f32::EPSILON {
        return Vec3::ZERO;
    }
    if wish != Vec3::ZERO && velocity.dot(wish) / speed >= ALIGNED_DOT {
        return velocity;
    }

    let drop = stop_speed.max(speed * friction * dt);
    let new_speed = (speed - drop).max(0.0);
    velocity * (new_speed / speed)
}

/// Step velocity toward `wish * target` by at most `acceleration * dt`.
/// Starting from rest or reversing doubles the step.
pub fn accelerate_ground(
    velocity: Vec3,
    wish: Vec3,
    target: f32,
    acceleration: f32,
    stop_speed: f32,
    dt: f32,
) -> Vec3 {
    let desired = wish * target;
    let starting = velocity.length() <= stop_speed;
    let reversing = wish != Vec3::ZERO && velocity.dot(wish) < 0.0;
    let multiplier = if starting || reversing { 2.0 } else { 1.0 };

    let max_step = acceleration * multiplier * dt;
    let diff = desired - velocity;
    let distance = diff.length();
    if distance <= max_step || distance <= f32::EPSILON {
        desired
    } else {
        velocity + diff / distance * max_step
    }
}

/// Air-strafe acceleration followed by air friction
pub fn accelerate_air(velocity: Vec3, wish: Vec3, movement: &MovementConfig, dt: f32) -> Vec3 {
    let mut velocity = velocity;
    if wish != Vec3::ZERO {
        let add_speed = movement.air_max_speed - velocity.dot(wish);
        if add_speed > 0.0 {
            velocity += wish * add_speed.min(movement.air_acceleration * dt);
        }
    }
    velocity * (1.0 - movement.air_friction * dt).max(0.0)
}

fn clamp_speed(velocity: Vec3, max_velocity: f32) -> Vec3 {
    let speed = velocity.length();
    if speed > max_velocity && speed > 0.0 {
        velocity * (max_velocity / speed)
    } else {
        velocity
    }
}

fn turn_toward(current: f32, target: f32, smoothing: f32, dt: f32) -> f32 {
    if smoothing <= 0.0 {
        return target;
    }
    let alpha = 1.0 - (-dt / smoothing).exp();
    let delta = crate::input::wrap_angle(target - current);
    crate::input::wrap_angle(current + delta * alpha)
}

/// Run one tick of horizontal movement
pub fn solve(ctx: &MovementContext) -> MovementOutput {
    let movement = ctx.movement;
    let dt = ctx.dt;
    let horizontal = Vec3::new(ctx.velocity.x, 0.0, ctx.velocity.z);

    let wish = wish_direction(ctx.input, ctx.yaw);
    let sprinting = ctx.input.sprint && wish != Vec3::ZERO && !ctx.crouching && !ctx.sliding;
    let target = target_speed(movement, ctx.crouch, sprinting, ctx.crouching, ctx.sliding);

    let mut velocity = if ctx.grounded {
        if ctx.sliding {
            let speed = horizontal.length();
            let slowed = (speed - ctx.crouch.slide_deceleration * dt).max(0.0);
            let mut velocity = horizontal.normalize_or_zero() * slowed;
            if wish != Vec3::ZERO && slowed < target {
                velocity = accelerate_ground(velocity, wish, target, movement.acceleration, movement.stop_speed, dt);
            }
            velocity
        } else {
            let steepness = 1.0 - ctx.surface_normal.normalize_or(Vec3::Y).y.clamp(0.0, 1.0);
            let friction = movement.ground_friction + movement.slope_friction * steepness;
            let velocity = apply_ground_friction(horizontal, wish, friction, movement.stop_speed, dt);
            accelerate_ground(velocity, wish, target, movement.acceleration, movement.stop_speed, dt)
        }
    } else {
        accelerate_air(horizontal, wish, movement, dt)
    };

    velocity = clamp_speed(velocity, movement.max_velocity);
    velocity *= (1.0 - movement.velocity_damping * dt).max(0.0);

    let facing_yaw = if !ctx.third_person {
        ctx.yaw
    } else if wish != Vec3::ZERO {
        // Facing uses the camera convention: the model looks down its local -Z
        let target = (-wish.x).atan2(-wish.z);
        turn_toward(ctx.facing_yaw, target, movement.turn_smoothing, dt)
    } else {
        ctx.facing_yaw
    };

    MovementOutput {
        velocity,
        desired: velocity * dt,
        wish,
        facing_yaw,
        sprinting,
    }
}
