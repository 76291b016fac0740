//! Tuning tables.
//!
//! Values follow the Sonic Physics Guide and are expressed per 1/60 s frame;
//! the controller scales them by `delta_time * 60` so any fixed timestep
//! keeps the 60 Hz feel.

use bevy::prelude::*;
use thiserror::Error;

use crate::input::Buttons;

/// Invalid tuning value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("gravity must point down, got {0}")]
    GravityNotDownward(f32),
    #[error("{field}: speed-up value {speed_up} is below the normal value {normal}")]
    InvertedVariant {
        field: &'static str,
        normal: f32,
        speed_up: f32,
    },
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

/// How the sprite is mirrored when facing left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlipMode {
    /// Negative horizontal scale.
    #[default]
    Scale,
    /// 180° rotation around the vertical axis.
    Rotation,
}

/// Character-independent physics settings.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicsConfig {
    /// Global scale applied to speeds and distances on top of the
    /// character's size scale.
    pub physics_scale: f32,

    /// Distance of solid probes (ground snap, contact re-probes),
    /// multiplied by the size scale.
    pub probe_distance: f32,

    /// Height of the character centre above a snapped surface,
    /// multiplied by the size scale.
    pub snap_height: f32,

    /// Sideways offset of the ledge probes, multiplied by the size scale twice.
    pub ledge_offset: f32,

    /// Largest angle (degrees) between surface and character that still grounds.
    pub grounding_angle_tolerance: f32,

    /// Rotate the sprite smoothly with the surface instead of in 45° steps.
    pub smooth_rotation: bool,

    /// Below this surface angle (degrees) the sprite stays upright.
    pub smooth_rotation_threshold: f32,

    pub flip_mode: FlipMode,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            physics_scale: 1.0,
            probe_distance: 0.8,
            snap_height: 0.5,
            ledge_offset: 0.375,
            grounding_angle_tolerance: 67.5,
            smooth_rotation: true,
            smooth_rotation_threshold: 45.0,
            flip_mode: FlipMode::Scale,
        }
    }
}

impl PhysicsConfig {
    /// Builder: set the global physics scale.
    pub fn with_physics_scale(mut self, scale: f32) -> Self {
        self.physics_scale = scale;
        self
    }

    /// Builder: set the solid probe distance.
    pub fn with_probe_distance(mut self, distance: f32) -> Self {
        self.probe_distance = distance;
        self
    }

    /// Builder: enable or disable smooth sprite rotation.
    pub fn with_smooth_rotation(mut self, enabled: bool) -> Self {
        self.smooth_rotation = enabled;
        self
    }

    /// Builder: set the sprite flip mode.
    pub fn with_flip_mode(mut self, mode: FlipMode) -> Self {
        self.flip_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("physics_scale", self.physics_scale)?;
        positive("probe_distance", self.probe_distance)?;
        non_negative("snap_height", self.snap_height)?;
        non_negative("ledge_offset", self.ledge_offset)?;
        positive("grounding_angle_tolerance", self.grounding_angle_tolerance)?;
        non_negative("smooth_rotation_threshold", self.smooth_rotation_threshold)
    }
}

/// A stat with a normal value and a value used while `speedUp` is active.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatVariant {
    pub normal: f32,
    pub speed_up: f32,
}

impl StatVariant {
    pub const fn new(normal: f32, speed_up: f32) -> Self {
        Self { normal, speed_up }
    }

    /// Same value in both variants.
    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value)
    }

    #[inline]
    pub fn select(&self, speed_up: bool) -> f32 {
        if speed_up { self.speed_up } else { self.normal }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        non_negative(field, self.normal)?;
        if self.speed_up < self.normal {
            return Err(ConfigError::InvertedVariant {
                field,
                normal: self.normal,
                speed_up: self.speed_up,
            });
        }
        Ok(())
    }
}

/// Airborne movement stats.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AirStats {
    /// Horizontal acceleration toward the input direction.
    pub acceleration: StatVariant,
    /// Horizontal acceleration against the current motion.
    pub deceleration: StatVariant,
    /// Horizontal slowdown without input.
    pub friction: StatVariant,
    /// Input acceleration stops above this horizontal speed.
    pub top_speed: StatVariant,
    /// Drag applies while rising slower than this.
    pub drag_threshold: f32,
    /// Vertical acceleration (negative is down).
    pub gravity: f32,
    /// Below this horizontal speed (times physics scale) friction snaps to zero.
    pub friction_snap_threshold: f32,
    /// Degrees per frame the character rotates back to upright.
    pub rotation_rate: f32,
}

impl Default for AirStats {
    fn default() -> Self {
        Self {
            acceleration: StatVariant::new(0.09375, 0.1875),
            deceleration: StatVariant::new(0.09375, 0.1875),
            friction: StatVariant::uniform(0.0),
            top_speed: StatVariant::new(6.0, 12.0),
            drag_threshold: 4.0,
            gravity: -0.21875,
            friction_snap_threshold: 0.05,
            rotation_rate: 2.0,
        }
    }
}

impl AirStats {
    /// Builder: set air friction (both variants).
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = StatVariant::uniform(friction);
        self
    }

    /// Builder: set gravity.
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set top speed variants.
    pub fn with_top_speed(mut self, normal: f32, speed_up: f32) -> Self {
        self.top_speed = StatVariant::new(normal, speed_up);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.acceleration.validate("acceleration")?;
        self.deceleration.validate("deceleration")?;
        self.friction.validate("friction")?;
        self.top_speed.validate("top_speed")?;
        non_negative("drag_threshold", self.drag_threshold)?;
        non_negative("friction_snap_threshold", self.friction_snap_threshold)?;
        non_negative("rotation_rate", self.rotation_rate)?;
        if self.gravity >= 0.0 {
            return Err(ConfigError::GravityNotDownward(self.gravity));
        }
        Ok(())
    }
}

/// Jump stats.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JumpStats {
    /// Launch speed along the surface normal (times physics scale).
    pub jump_speed: f32,
    /// Upward speed kept when the jump button is released early (times physics scale).
    pub release_speed: f32,
    /// Buttons that start a jump.
    #[reflect(ignore)]
    pub jump_buttons: Buttons,
    /// Buttons that sustain a full-height jump.
    #[reflect(ignore)]
    pub hold_buttons: Buttons,
}

impl Default for JumpStats {
    fn default() -> Self {
        Self {
            jump_speed: 6.5,
            release_speed: 4.0,
            jump_buttons: Buttons::SECONDARY | Buttons::TERTIARY,
            hold_buttons: Buttons::PRIMARY | Buttons::SECONDARY | Buttons::TERTIARY,
        }
    }
}

impl JumpStats {
    /// Builder: set jump speed.
    pub fn with_jump_speed(mut self, speed: f32) -> Self {
        self.jump_speed = speed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("jump_speed", self.jump_speed)?;
        non_negative("release_speed", self.release_speed)
    }
}
