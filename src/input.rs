//! Input queries.
//!
//! Capabilities only ask boolean questions about input ("is the horizontal
//! axis pushed right", "did a jump button go down this tick"). The
//! [`CharacterInput`] component is a snapshot your game fills each frame from
//! keyboard, gamepad, AI or replay data.

use bevy::prelude::*;
use bitflags::bitflags;

/// Axis values beyond this magnitude count as pressed.
pub const AXIS_THRESHOLD: f32 = 0.5;

/// Named input axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum InputAxis {
    Horizontal,
    Vertical,
}

bitflags! {
    /// Named buttons.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Buttons: u8 {
        const PRIMARY = 1 << 0;
        const SECONDARY = 1 << 1;
        const TERTIARY = 1 << 2;
        const START = 1 << 3;
    }
}

/// Boolean input queries used by capabilities.
pub trait InputQuery {
    /// Whether `axis` is pushed in the positive direction.
    fn axis_positive(&self, axis: InputAxis) -> bool;
    /// Whether `axis` is pushed in the negative direction.
    fn axis_negative(&self, axis: InputAxis) -> bool;
    /// Whether any of `buttons` went down this tick (no auto-repeat).
    fn buttons_down(&self, buttons: Buttons) -> bool;
    /// Whether any of `buttons` is held.
    fn buttons_held(&self, buttons: Buttons) -> bool;
}

/// Per-character input snapshot.
///
/// # Example
///
/// ```rust
/// use spg_character_controller::prelude::*;
///
/// let mut input = CharacterInput::default();
/// input.set_horizontal(1.0);
/// input.set_held(Buttons::SECONDARY);
/// assert!(input.axis_positive(InputAxis::Horizontal));
/// assert!(input.buttons_down(Buttons::SECONDARY));
///
/// // Next tick the button is still held but no longer "down".
/// input.end_tick();
/// assert!(!input.buttons_down(Buttons::SECONDARY));
/// assert!(input.buttons_held(Buttons::SECONDARY));
/// ```
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct CharacterInput {
    /// Horizontal axis (-1.0 = left, 1.0 = right).
    pub horizontal: f32,
    /// Vertical axis (-1.0 = down, 1.0 = up).
    pub vertical: f32,
    /// Buttons held this tick.
    pub held: Buttons,
    /// Buttons held last tick (edge detection; managed by the controller).
    pub(crate) previous: Buttons,
}

impl CharacterInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the horizontal axis, clamped to `[-1, 1]`.
    pub fn set_horizontal(&mut self, value: f32) {
        self.horizontal = value.clamp(-1.0, 1.0);
    }

    /// Set the vertical axis, clamped to `[-1, 1]`.
    pub fn set_vertical(&mut self, value: f32) {
        self.vertical = value.clamp(-1.0, 1.0);
    }

    /// Replace the held button set.
    pub fn set_held(&mut self, buttons: Buttons) {
        self.held = buttons;
    }

    /// Release every axis and button.
    pub fn clear(&mut self) {
        self.horizontal = 0.0;
        self.vertical = 0.0;
        self.held = Buttons::empty();
    }

    /// Close the tick: what is held now becomes "previously held".
    pub fn end_tick(&mut self) {
        self.previous = self.held;
    }

    fn axis(&self, axis: InputAxis) -> f32 {
        match axis {
            InputAxis::Horizontal => self.horizontal,
            InputAxis::Vertical => self.vertical,
        }
    }
}

impl InputQuery for CharacterInput {
    fn axis_positive(&self, axis: InputAxis) -> bool {
        self.axis(axis) > AXIS_THRESHOLD
    }

    fn axis_negative(&self, axis: InputAxis) -> bool {
        self.axis(axis) < -AXIS_THRESHOLD
    }

    fn buttons_down(&self, buttons: Buttons) -> bool {
        (self.held & !self.previous).intersects(buttons)
    }

    fn buttons_held(&self, buttons: Buttons) -> bool {
        self.held.intersects(buttons)
    }
}

/// Input that reports nothing pressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputQuery for NoInput {
    fn axis_positive(&self, _: InputAxis) -> bool {
        false
    }

    fn axis_negative(&self, _: InputAxis) -> bool {
        false
    }

    fn buttons_down(&self, _: Buttons) -> bool {
        false
    }

    fn buttons_held(&self, _: Buttons) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_input_is_idle() {
        let input = CharacterInput::default();
        assert!(!input.axis_positive(InputAxis::Horizontal));
        assert!(!input.axis_negative(InputAxis::Horizontal));
        assert!(!input.buttons_held(Buttons::all()));
        assert!(!input.buttons_down(Buttons::all()));
    }

    #[test]
    fn axes_respect_threshold() {
        let mut input = CharacterInput::new();
        input.set_horizontal(0.4);
        assert!(!input.axis_positive(InputAxis::Horizontal));

        input.set_horizontal(1.0);
        assert!(input.axis_positive(InputAxis::Horizontal));

        input.set_vertical(-5.0);
        assert_eq!(input.vertical, -1.0);
        assert!(input.axis_negative(InputAxis::Vertical));
    }

    #[test]
    fn buttons_down_only_on_press_edge() {
        let mut input = CharacterInput::new();
        input.set_held(Buttons::SECONDARY);
        assert!(input.buttons_down(Buttons::SECONDARY | Buttons::TERTIARY));
        assert!(!input.buttons_down(Buttons::PRIMARY));

        input.end_tick();
        assert!(!input.buttons_down(Buttons::SECONDARY));
        assert!(input.buttons_held(Buttons::SECONDARY));

        // Pressing a second button is a new edge.
        input.set_held(Buttons::SECONDARY | Buttons::TERTIARY);
        assert!(input.buttons_down(Buttons::TERTIARY));
    }

    #[test]
    fn clear_releases_everything() {
        let mut input = CharacterInput::new();
        input.set_horizontal(-1.0);
        input.set_held(Buttons::PRIMARY);
        input.clear();
        assert_eq!(input.horizontal, 0.0);
        assert!(!input.buttons_held(Buttons::PRIMARY));
    }
}
