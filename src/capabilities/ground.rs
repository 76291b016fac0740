//! Keeping a grounded character on its surface.

use crate::capability::{Capability, CapabilityContext};
use crate::character::ModeGroup;
use crate::state::{CharacterState, StateGroup, StateGroups};

/// Sticks the character to the surface below while in `ground`.
///
/// Each tick snaps to the surface and re-projects velocity from ground
/// speed along the new slope. Losing the surface drops the character into
/// `air`. Ground acceleration and slope factors are left to game code.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundCapability;

impl GroundCapability {
    pub const NAME: &'static str = "ground";
}

impl Capability for GroundCapability {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn init(&self, groups: &mut StateGroups) {
        groups.add(StateGroup::Ground, CharacterState::Ground);
    }

    fn state_init(&self, ctx: &mut CapabilityContext, _state: CharacterState, _previous: CharacterState) {
        if !ctx.in_group(StateGroup::Ground) {
            return;
        }
        ctx.body.set_mode_group(Some(ModeGroup::Ground));
    }

    fn update(&self, ctx: &mut CapabilityContext, _delta_time: f32) {
        if !ctx.in_group(StateGroup::Ground) {
            return;
        }
        if ctx.ground_snap() {
            let ground_speed = ctx.body.ground_speed();
            ctx.body.set_ground_speed(ground_speed);
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::*;
    use crate::capabilities::AirCapability;
    use crate::capability::CharacterEnv;
    use crate::character::Character;
    use crate::collision::{Layers, SurfaceHit};
    use crate::config::PhysicsConfig;
    use crate::input::NoInput;
    use crate::surface::{EmptySurfaces, SurfaceQuery};

    const DT: f32 = 1.0 / 60.0;

    /// A 30° slope through the origin.
    struct Slope;

    impl SurfaceQuery for Slope {
        fn raycast(&self, origin: Vec3, direction: Vec3, max: f32, _: Layers) -> Option<SurfaceHit> {
            let (sin, cos) = 30.0_f32.to_radians().sin_cos();
            let normal = Vec3::new(-sin, cos, 0.0);
            let denom = direction.dot(normal);
            if denom >= 0.0 {
                return None;
            }
            let distance = -origin.dot(normal) / denom;
            (0.0..=max).contains(&distance)
                .then(|| SurfaceHit::new(distance, normal, origin + direction * distance, Entity::from_raw(3)))
        }
    }

    fn character() -> Character {
        Character::new(PhysicsConfig::default())
            .with_capability(GroundCapability)
            .with_capability(AirCapability::default())
    }

    #[test]
    fn follows_slope_and_keeps_ground_speed() {
        let mut character = character();
        character.body.position = Vec3::new(0.0, 0.55, 0.0);
        character.body.set_ground_speed(2.0);

        character.update(DT, CharacterEnv::new(&Slope, &NoInput));

        assert_eq!(character.state(), CharacterState::Ground);
        assert!((character.body.forward_angle() - 30.0).abs() < 1.0e-3);
        assert!((character.body.ground_speed() - 2.0).abs() < 1.0e-5);
        let direction = character.body.velocity.normalize();
        assert!((direction - character.body.forward()).length() < 1.0e-4);
    }

    #[test]
    fn losing_the_surface_falls() {
        let mut character = character();
        character.body.set_ground_speed(2.0);

        character.update(DT, CharacterEnv::new(&EmptySurfaces, &NoInput));

        assert_eq!(character.state(), CharacterState::Air);
        assert_eq!(character.body.mode_group(), Some(ModeGroup::Air));
    }

    #[test]
    fn landing_selects_ground_mode_group() {
        let mut character = character();
        character.set_state(CharacterState::Air, CharacterEnv::new(&EmptySurfaces, &NoInput));
        character.set_state(CharacterState::Ground, CharacterEnv::new(&EmptySurfaces, &NoInput));
        assert_eq!(character.body.mode_group(), Some(ModeGroup::Ground));
    }
}
