//! Airborne movement, rotation, gravity and ground reacquisition.

use bevy::prelude::*;

use crate::capability::{Capability, CapabilityContext};
use crate::character::{AirLayer, ModeGroup};
use crate::collision::{Collision, Layers};
use crate::config::AirStats;
use crate::effect::EffectKind;
use crate::reacquire::ReacquireOutcome;
use crate::state::{CharacterState, StateGroup, StateGroups};
use crate::surface::{move_towards, round_angle, surface_angle};

/// Horizontal velocity after one tick of air acceleration.
///
/// `input` is -1, 0 or 1. Without input, friction pulls toward zero
/// without crossing it and snaps to zero below the snap threshold.
pub fn air_acceleration(
    stats: &AirStats,
    speed_up: bool,
    physics_scale: f32,
    input: i8,
    vx: f32,
    delta_time: f32,
) -> f32 {
    let frames = delta_time * 60.0;
    let acceleration = stats.acceleration.select(speed_up) * physics_scale;
    let deceleration = stats.deceleration.select(speed_up) * physics_scale;
    let top_speed = stats.top_speed.select(speed_up) * physics_scale;

    match input {
        1 if vx < 0.0 => vx + deceleration * frames,
        1 if vx < top_speed => vx + acceleration * frames,
        -1 if vx > 0.0 => vx - deceleration * frames,
        -1 if vx > -top_speed => vx - acceleration * frames,
        1 | -1 => vx,
        _ => {
            if vx.abs() <= stats.friction_snap_threshold * physics_scale {
                return 0.0;
            }
            let friction = stats.friction.select(speed_up) * physics_scale * frames;
            if friction >= vx.abs() {
                0.0
            } else {
                vx - vx.signum() * friction
            }
        }
    }
}

/// Horizontal velocity after air drag.
///
/// Applies only while rising slower than `threshold`. The step is quantised
/// to 1/256 of whole 0.125 units, truncated toward zero.
pub fn air_drag(vx: f32, vy: f32, threshold: f32, delta_time: f32) -> f32 {
    if vy > 0.0 && vy < threshold {
        vx - (vx / 0.125).trunc() / 256.0 * delta_time * 60.0
    } else {
        vx
    }
}

/// Airborne behaviour for the `air` state.
///
/// Registers `air` in the `air` and `airCollision` groups. Other capabilities
/// add their airborne states (`jump`, `rollingAir`) to those groups to reuse it.
#[derive(Debug, Clone, Default)]
pub struct AirCapability {
    pub stats: AirStats,
}

impl AirCapability {
    pub const NAME: &'static str = "air";

    pub fn new(stats: AirStats) -> Self {
        if let Err(err) = stats.validate() {
            warn!("invalid air stats: {err}");
        }
        Self { stats }
    }

    fn update_air_layer(&self, ctx: &mut CapabilityContext) {
        let layer = if ctx.body.velocity.y > 0.0 {
            AirLayer::IgnoreTopSolid
        } else {
            AirLayer::Default
        };
        ctx.body.set_air_layer(layer);
    }

    fn update_move(&self, ctx: &mut CapabilityContext, delta_time: f32) {
        let speed_up = ctx.body.effects.has(EffectKind::SpeedUp);
        let velocity = ctx.body.velocity;
        let vx = air_acceleration(
            &self.stats,
            speed_up,
            ctx.body.physics_scale(),
            ctx.input_direction(),
            velocity.x,
            delta_time,
        );
        ctx.body.velocity.x = air_drag(vx, velocity.y, self.stats.drag_threshold, delta_time);
    }

    fn update_rotation(&self, ctx: &mut CapabilityContext, delta_time: f32) {
        let angle = ctx.body.forward_angle();
        let target = if angle <= 180.0 { 0.0 } else { 360.0 };
        let rate = self.stats.rotation_rate * delta_time * 60.0;
        ctx.body.set_forward_angle(move_towards(angle, target, rate));
    }

    fn update_gravity(&self, ctx: &mut CapabilityContext, delta_time: f32) {
        ctx.body.velocity.y += self.stats.gravity * ctx.body.physics_scale() * delta_time * 60.0;
    }

    fn update_facing(&self, ctx: &mut CapabilityContext) {
        if ctx.pressing_left() {
            ctx.body.facing_right = false;
        } else if ctx.pressing_right() {
            ctx.body.facing_right = true;
        }
        // flip before rotation: rotation-based flipping reads it
        let flip = !ctx.body.facing_right;
        ctx.body.set_flip_x(flip);
        ctx.body.push_sprite_rotation();
    }

    /// Probe for top-solid platforms straight below.
    fn probe_top_solid(&self, ctx: &mut CapabilityContext) {
        let hit = ctx.surfaces().raycast(
            ctx.body.position,
            Vec3::NEG_Y,
            ctx.probe_distance(),
            Layers::OBJECT_TOP_SOLID_ONLY,
        );
        if let Some(hit) = hit {
            ctx.reacquire_ground(round_angle(surface_angle(hit.normal)));
        }
    }
}

impl Capability for AirCapability {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn init(&self, groups: &mut StateGroups) {
        groups.add(StateGroup::Air, CharacterState::Air);
        groups.add(StateGroup::AirCollision, CharacterState::Air);
    }

    fn state_init(&self, ctx: &mut CapabilityContext, _state: CharacterState, _previous: CharacterState) {
        if !ctx.in_group(StateGroup::AirCollision) {
            return;
        }
        self.update_air_layer(ctx);
        ctx.body.set_ground_collider(None);
        if ctx.in_group(StateGroup::Rolling) {
            return;
        }
        ctx.body.set_mode_group(Some(ModeGroup::Air));
    }

    fn update(&self, ctx: &mut CapabilityContext, delta_time: f32) {
        if !ctx.in_group(StateGroup::AirCollision) {
            return;
        }
        self.update_air_layer(ctx);
        if !ctx.in_group(StateGroup::Air) {
            return;
        }
        self.update_move(ctx, delta_time);
        self.update_rotation(ctx, delta_time);
        self.update_gravity(ctx, delta_time);
        self.update_facing(ctx);
        ctx.body.sync_ground_speed();
        self.probe_top_solid(ctx);
    }

    fn on_collision_enter(&self, ctx: &mut CapabilityContext, collision: &Collision) {
        if !ctx.in_group(StateGroup::AirCollision) {
            return;
        }

        // Contact normals are unreliable; raycast toward each contact point instead.
        for &contact in &collision.contacts {
            let Some(hit) = ctx.solid_raycast(contact - ctx.body.position, ctx.probe_distance())
            else {
                return;
            };

            let angle = round_angle(surface_angle(hit.normal));
            if let Some(modifier) = ctx.surfaces().collision_modifier(collision.collider) {
                if modifier.vetoes(angle) {
                    return;
                }
            }

            let outcome = ctx.reacquire_ground(angle);
            if outcome.is_final() {
                return;
            }
            if let ReacquireOutcome::Rejected(reason) = outcome {
                trace!("contact at {contact} ignored: {reason:?}");
            }
        }
    }

    fn on_collision_stay(&self, ctx: &mut CapabilityContext, collision: &Collision) {
        self.on_collision_enter(ctx, collision);
    }
}
