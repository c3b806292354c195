//! Stride Core - Core types and utilities for the Stride movement core
//!
//! This crate provides the foundational types shared by the physics bridge
//! and the player controller:
//! - Mathematical primitives (re-exported from glam)
//! - `EntityId` for id-keyed external collaborators (camera registry, scene)
//! - `Transform` for visual sync of the character
//! - `GameTime` fixed-timestep accumulator for driving ticks

pub mod time;
pub mod types;

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use time::{GameTime, TimeConfig};
pub use types::{EntityId, Transform};
