//! Character states, state groups and state marker components.
//!
//! A character is always in exactly one [`CharacterState`]. Capabilities
//! gate their behaviour on [`StateGroup`] membership rather than on concrete
//! states, so a new state can opt into existing behaviour by joining groups
//! during capability initialisation.

use bevy::prelude::*;
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// Behaviour mode of a character.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Reflect,
    Display,
    AsRefStr,
    EnumString,
    EnumCount,
    EnumIter,
)]
#[strum(serialize_all = "camelCase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum CharacterState {
    #[default]
    Ground,
    Air,
    Jump,
    Rolling,
    RollingAir,
    Hurt,
    Dying,
    Victory,
}

/// Named bucket of states sharing a behavioural gate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Reflect,
    Display,
    AsRefStr,
    EnumString,
    EnumCount,
    EnumIter,
)]
#[strum(serialize_all = "camelCase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum StateGroup {
    /// Standing or running on a surface.
    Ground,
    /// Air movement (acceleration, drag, gravity) applies.
    Air,
    /// Air collision handling and ground reacquisition apply.
    AirCollision,
    /// Curled up; keeps the rolling collider.
    Rolling,
    /// Variable jump height applies.
    Jump,
    /// Touching enemies damages them.
    Harmful,
    /// Input is ignored.
    NoControl,
    /// Jumping is not allowed.
    NoJump,
    /// Damage is ignored.
    Ignore,
}

/// Registry mapping each group to the states that belong to it.
///
/// Populated once while capabilities initialise; read-only afterwards.
/// Membership is additive: there is no removal.
#[derive(Debug, Clone, PartialEq)]
pub struct StateGroups {
    groups: [Option<Vec<CharacterState>>; StateGroup::COUNT],
}

impl Default for StateGroups {
    fn default() -> Self {
        Self {
            groups: std::array::from_fn(|_| None),
        }
    }
}

impl StateGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `state` to `group`, registering the group on first use.
    ///
    /// Duplicates are kept; insertion order is preserved.
    pub fn add(&mut self, group: StateGroup, state: CharacterState) {
        self.groups[group as usize]
            .get_or_insert_with(Vec::new)
            .push(state);
    }

    /// Whether `state` belongs to `group`. Unregistered groups contain nothing.
    pub fn contains(&self, group: StateGroup, state: CharacterState) -> bool {
        self.groups[group as usize]
            .as_ref()
            .is_some_and(|states| states.contains(&state))
    }

    /// Whether any state was ever added to `group`.
    pub fn is_registered(&self, group: StateGroup) -> bool {
        self.groups[group as usize].is_some()
    }

    /// States in `group`, in insertion order.
    pub fn states(&self, group: StateGroup) -> &[CharacterState] {
        self.groups[group as usize].as_deref().unwrap_or(&[])
    }
}

/// Current and previous state of a character.
///
/// Transitions are driven by [`crate::capability::CapabilityContext::set_state`],
/// which notifies every capability; this type only records the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub struct StateMachine {
    current: CharacterState,
    previous: CharacterState,
    /// Number of committed transitions.
    generation: u64,
}

impl StateMachine {
    pub fn new(initial: CharacterState) -> Self {
        Self {
            current: initial,
            previous: initial,
            generation: 0,
        }
    }

    /// Bumped on every commit; lets a caller notice nested transitions.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn current(&self) -> CharacterState {
        self.current
    }

    #[inline]
    pub fn previous(&self) -> CharacterState {
        self.previous
    }

    /// Record a completed transition.
    pub(crate) fn commit(&mut self, next: CharacterState) {
        self.previous = self.current;
        self.current = next;
        self.generation += 1;
    }
}

/// Marker component indicating the character is in a grounded state.
///
/// Kept in sync with the [`StateGroup::Ground`] group by the controller.
/// Mutually exclusive with [`Airborne`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Present while the current state is in [`StateGroup::AirCollision`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;
