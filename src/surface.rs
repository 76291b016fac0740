//! Surface queries and angle helpers.
//!
//! The controller never detects collisions itself. It asks a [`SurfaceQuery`]
//! (usually [`crate::backend::BackendSurfaces`]) for raycasts and collider
//! tags, and works in degrees measured counter-clockwise from world up:
//! 0° is flat floor, 90° a wall facing left, 180° a ceiling, 270° a wall
//! facing right.

use bevy::prelude::*;

use crate::collision::{CollisionModifier, Layers, SurfaceHit};

/// Synchronous world queries the controller needs.
///
/// A miss is `None`; callers treat it as a normal branch, never an error.
pub trait SurfaceQuery {
    /// Cast a ray and return the closest hit on any layer in `mask`.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: Layers,
    ) -> Option<SurfaceHit>;

    /// Grounding tag of a collider, if any.
    fn collision_modifier(&self, _collider: Entity) -> Option<CollisionModifier> {
        None
    }
}

/// A world without geometry: every query misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySurfaces;

impl SurfaceQuery for EmptySurfaces {
    fn raycast(&self, _: Vec3, _: Vec3, _: f32, _: Layers) -> Option<SurfaceHit> {
        None
    }
}

/// Angle in degrees `[0, 360)` of the rotation taking world up onto `normal`.
pub fn surface_angle(normal: Vec3) -> f32 {
    normalize_angle((-normal.x).atan2(normal.y).to_degrees())
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_angle(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Shortest signed difference from `current` to `target`, in `(-180, 180]`.
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let delta = (target - current).rem_euclid(360.0);
    if delta > 180.0 { delta - 360.0 } else { delta }
}

/// Move `current` toward `target` by at most `max_delta`.
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Round to the nearest integer, ties to even.
///
/// Surface angles are rounded before classification so tiny deviations
/// cannot let a character stick to walls.
pub fn round_angle(degrees: f32) -> f32 {
    degrees.round_ties_even()
}

/// Unit vector along the surface for a forward angle (local right).
pub fn forward_axis(degrees: f32) -> Vec3 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec3::new(cos, sin, 0.0)
}

/// Unit vector away from the surface for a forward angle (local up).
pub fn up_axis(degrees: f32) -> Vec3 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec3::new(-sin, cos, 0.0)
}
