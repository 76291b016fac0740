//! Jumping and variable jump height.

use bevy::prelude::*;

use crate::capability::{Capability, CapabilityContext};
use crate::config::JumpStats;
use crate::state::{CharacterState, StateGroup, StateGroups};

/// Launches off the ground and cuts the jump short when released.
///
/// The `jump` state joins the airborne groups, so the air capability moves
/// the character while jumping.
#[derive(Debug, Clone, Default)]
pub struct JumpCapability {
    pub stats: JumpStats,
}

impl JumpCapability {
    pub const NAME: &'static str = "jump";

    pub fn new(stats: JumpStats) -> Self {
        if let Err(err) = stats.validate() {
            warn!("invalid jump stats: {err}");
        }
        Self { stats }
    }

    fn launch(&self, ctx: &mut CapabilityContext) {
        if ctx.in_group(StateGroup::NoJump) || !ctx.buttons_down(self.stats.jump_buttons) {
            return;
        }
        let impulse = ctx.body.up() * self.stats.jump_speed * ctx.body.physics_scale();
        ctx.body.velocity += impulse;
        ctx.body.play_sound("sfxJump");
        ctx.set_state(CharacterState::Jump);
    }

    fn limit_height(&self, ctx: &mut CapabilityContext) {
        let release_speed = self.stats.release_speed * ctx.body.physics_scale();
        if !ctx.buttons_held(self.stats.hold_buttons) && ctx.body.velocity.y > release_speed {
            ctx.body.velocity.y = release_speed;
        }
    }
}

impl Capability for JumpCapability {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn init(&self, groups: &mut StateGroups) {
        for group in [
            StateGroup::AirCollision,
            StateGroup::Air,
            StateGroup::Rolling,
            StateGroup::Jump,
            StateGroup::Harmful,
        ] {
            groups.add(group, CharacterState::Jump);
        }
    }

    fn update(&self, ctx: &mut CapabilityContext, _delta_time: f32) {
        if ctx.in_group(StateGroup::Ground) {
            self.launch(ctx);
        } else if ctx.in_group(StateGroup::Jump) {
            self.limit_height(ctx);
        }
    }
}
