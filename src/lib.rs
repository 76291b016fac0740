//! # `spg_character_controller`
//!
//! A 2D/2.5D platformer character controller with Sonic Physics Guide
//! movement, built from composable capabilities.
//!
//! This crate provides:
//! - A capability pipeline: independent behaviour units run in a fixed order
//!   every tick, gated by state groups
//! - A state machine with re-entrant transitions (a nested transition raised
//!   while leaving a state wins)
//! - Timed effects (speed shoes, shields, invincibility, control lock)
//! - Angle-aware ground speed kept in sync with world velocity
//! - Ground reacquisition: landing classification by impact angle, ground
//!   snapping and ledge balancing
//! - The airborne movement model: acceleration, drag, gravity and rotation
//! - A physics backend abstraction (Rapier2D included)
//!
//! ## Architecture
//!
//! A [`Character`](character::Character) component holds the character's data
//! ([`CharacterBody`](character::CharacterBody)) and its capability pipeline.
//! Each fixed tick:
//! 1. Contacts reported by the physics backend are fanned out through the pipeline
//! 2. Effects update, then every capability updates in registration order
//! 3. Position, velocity and rotation are written back to the backend
//! 4. Presentation cues (sounds, sprite rotation, collider swaps) are sent as events
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use spg_character_controller::prelude::*;
//!
//! // Ground, jump and air capabilities with default tuning
//! let character = Character::classic(PhysicsConfig::default())
//!     .with_spawn(Vec3::new(0.0, 2.0, 0.0));
//! let input = CharacterInput::default();
//!
//! // These can be spawned together with the backend's physics components
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod capabilities;
pub mod capability;
pub mod character;
pub mod collision;
pub mod config;
pub mod effect;
pub mod ground;
pub mod input;
pub mod reacquire;
pub mod state;
pub mod surface;
pub mod systems;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{BackendSurfaces, CharacterPhysicsBackend, NoOpBackendPlugin};
    pub use crate::capabilities::{AirCapability, GroundCapability, JumpCapability};
    pub use crate::capability::{Capability, CapabilityContext, CapabilityPipeline, CharacterEnv};
    pub use crate::character::{
        AirLayer, BalanceState, Character, CharacterBody, CharacterCue, HurtOutcome, ModeGroup,
    };
    pub use crate::collision::{
        CharacterContact, Collision, CollisionModifier, ContactKind, ContactPhase, Layers,
        SurfaceHit,
    };
    pub use crate::config::{
        AirStats, ConfigError, FlipMode, JumpStats, PhysicsConfig, StatVariant,
    };
    pub use crate::effect::{Effect, EffectKind, Effects};
    pub use crate::input::{Buttons, CharacterInput, InputAxis, InputQuery, NoInput};
    pub use crate::reacquire::{Landing, LandingBand, LandingRejection, ReacquireOutcome};
    pub use crate::state::{Airborne, CharacterState, Grounded, StateGroup, StateGroups};
    pub use crate::surface::{EmptySurfaces, SurfaceQuery};
    pub use crate::systems::CharacterCueEvent;
    pub use crate::{CharacterControllerPlugin, CharacterControllerSet};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::Rapier2dBackend;
}

/// System sets of the controller, run in order in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterControllerSet {
    /// Contact events are dispatched to the characters.
    Contacts,
    /// Characters are updated.
    Simulation,
    /// Marker components are synced.
    Markers,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (raycasting, velocity access, contact reporting).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier2dBackend`)
///
/// # Examples
///
/// With Rapier2D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use spg_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(CharacterControllerPlugin::<Rapier2dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        if !collision::init_solid_raycast_mask(collision::Layers::SOLID_RAYCAST_IGNORED) {
            debug!("solid raycast mask already initialised");
        }

        // Register core types
        app.register_type::<config::PhysicsConfig>();
        app.register_type::<config::AirStats>();
        app.register_type::<config::JumpStats>();
        app.register_type::<collision::CollisionModifier>();
        app.register_type::<state::CharacterState>();
        app.register_type::<state::StateGroup>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();

        app.add_event::<collision::CharacterContact>();
        app.add_event::<systems::CharacterCueEvent>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            FixedUpdate,
            (
                CharacterControllerSet::Contacts,
                CharacterControllerSet::Simulation,
                CharacterControllerSet::Markers,
            )
                .chain(),
        );
        app.add_systems(
            FixedUpdate,
            (
                systems::dispatch_character_contacts::<B>.in_set(CharacterControllerSet::Contacts),
                systems::update_characters::<B>.in_set(CharacterControllerSet::Simulation),
                systems::sync_state_markers.in_set(CharacterControllerSet::Markers),
            ),
        );
    }
}
