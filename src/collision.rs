//! Collision data exchanged with the physics backend.
//!
//! These structures hold the results of surface queries (raycasts), the
//! contacts reported by the physics step, and the tags world geometry can
//! carry to alter grounding rules.

use std::sync::OnceLock;

use bevy::prelude::*;
use bitflags::bitflags;

/// Information about a raycast hit against world geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// Normal of the surface at the hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Collider that was hit.
    pub collider: Entity,
}

impl SurfaceHit {
    /// Create a hit result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, collider: Entity) -> Self {
        Self {
            distance,
            normal,
            point,
            collider,
        }
    }
}

/// Tag on world geometry that vetoes grounding.
///
/// Attach this component to a collider (or one of its ancestors) to stop
/// characters from landing on it, either entirely or for a band of surface
/// angles. Angles are measured like [`crate::surface::surface_angle`].
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq)]
#[reflect(Component)]
pub enum CollisionModifier {
    /// The surface never grounds a character.
    NoGrounding,
    /// Left, right and bottom faces (90° < angle < 270°) never ground.
    NoGroundingLeftRightBottom,
    /// Like [`CollisionModifier::NoGroundingLeftRightBottom`] but starting
    /// at 45°, so steep slopes are rejected too (45° < angle < 315°).
    NoGroundingLeftRightBottomHigher,
}

impl CollisionModifier {
    /// Whether this modifier rejects a landing at `angle` degrees.
    pub fn vetoes(self, angle: f32) -> bool {
        match self {
            Self::NoGrounding => true,
            Self::NoGroundingLeftRightBottom => angle > 90.0 && angle < 270.0,
            Self::NoGroundingLeftRightBottomHigher => angle > 45.0 && angle < 315.0,
        }
    }
}

bitflags! {
    /// Collision layers used to filter surface queries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Layers: u32 {
        const DEFAULT = 1 << 0;
        const IGNORE_RAYCAST = 1 << 1;
        const PLAYER_DEFAULT = 1 << 2;
        const PLAYER_IGNORE_TOP_SOLID = 1 << 3;
        const PLAYER_IGNORE_TOP_SOLID_AND_RAYCAST = 1 << 4;
        const PLAYER_ROLLING = 1 << 5;
        const PLAYER_ROLLING_IGNORE_TOP_SOLID = 1 << 6;
        const OBJECT_PLAYER_ONLY_IGNORE_RAYCAST = 1 << 7;
        const OBJECT_RING = 1 << 8;
        const OBJECT_TOP_SOLID_ONLY = 1 << 9;
    }
}

impl Layers {
    /// Layers skipped by solid raycasts unless configured otherwise.
    pub const SOLID_RAYCAST_IGNORED: Layers = Layers::IGNORE_RAYCAST
        .union(Layers::PLAYER_DEFAULT)
        .union(Layers::PLAYER_IGNORE_TOP_SOLID_AND_RAYCAST)
        .union(Layers::PLAYER_IGNORE_TOP_SOLID)
        .union(Layers::PLAYER_ROLLING)
        .union(Layers::PLAYER_ROLLING_IGNORE_TOP_SOLID)
        .union(Layers::OBJECT_PLAYER_ONLY_IGNORE_RAYCAST)
        .union(Layers::OBJECT_RING);
}

static SOLID_RAYCAST_IGNORED: OnceLock<Layers> = OnceLock::new();

/// Set the process-wide layers that solid raycasts skip.
///
/// Called once at startup (the plugin does this with
/// [`Layers::SOLID_RAYCAST_IGNORED`]). Returns `false` if the mask was
/// already initialised, in which case the first value is kept.
pub fn init_solid_raycast_mask(ignored: Layers) -> bool {
    SOLID_RAYCAST_IGNORED.set(ignored).is_ok()
}

/// Layer mask used by solid raycasts: everything except the ignored layers.
pub fn solid_raycast_mask() -> Layers {
    let ignored = SOLID_RAYCAST_IGNORED
        .get()
        .copied()
        .unwrap_or(Layers::SOLID_RAYCAST_IGNORED);
    ignored.complement()
}

/// A collision reported by the physics step, with its contact points.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    /// The collider the character touched.
    pub collider: Entity,
    /// World-space contact points, in the order the physics step reported them.
    pub contacts: Vec<Vec3>,
}

impl Collision {
    pub fn new(collider: Entity, contacts: impl IntoIterator<Item = Vec3>) -> Self {
        Self {
            collider,
            contacts: contacts.into_iter().collect(),
        }
    }
}

/// Lifecycle phase of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ContactPhase {
    Enter,
    Stay,
    Exit,
}

/// What a character touched.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactKind {
    /// Solid collision with contact points.
    Collision(Collision),
    /// Overlap with a trigger volume.
    Trigger(Entity),
}

/// Contact event sent by physics backends and fanned out through the
/// character's capability pipeline.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct CharacterContact {
    /// The character entity.
    pub character: Entity,
    pub phase: ContactPhase,
    pub kind: ContactKind,
}

impl CharacterContact {
    /// A solid collision event.
    pub fn collision(character: Entity, phase: ContactPhase, collision: Collision) -> Self {
        Self {
            character,
            phase,
            kind: ContactKind::Collision(collision),
        }
    }

    /// A trigger overlap event.
    pub fn trigger(character: Entity, phase: ContactPhase, other: Entity) -> Self {
        Self {
            character,
            phase,
            kind: ContactKind::Trigger(other),
        }
    }
}
