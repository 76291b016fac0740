//! The character component and its per-tick shell.

use bevy::prelude::*;

use crate::capability::{Capability, CapabilityContext, CapabilityPipeline, CharacterEnv};
use crate::collision::{ContactKind, ContactPhase, Layers};
use crate::config::{ConfigError, FlipMode, PhysicsConfig};
use crate::effect::{EffectKind, Effects};
use crate::state::{CharacterState, StateGroup, StateGroups, StateMachine};
use crate::surface::{delta_angle, forward_axis, normalize_angle, up_axis};

/// Which side of a ledge the character is teetering over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum BalanceState {
    #[default]
    None,
    Left,
    Right,
}

/// Collider/hitbox set the character should currently use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum ModeGroup {
    Ground,
    Air,
    Rolling,
    RollingAir,
}

/// Collision layer used while airborne.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum AirLayer {
    #[default]
    Default,
    /// Rising through top-solid platforms.
    IgnoreTopSolid,
}

impl AirLayer {
    pub fn layers(self) -> Layers {
        match self {
            AirLayer::Default => Layers::PLAYER_DEFAULT,
            AirLayer::IgnoreTopSolid => Layers::PLAYER_IGNORE_TOP_SOLID,
        }
    }
}

/// Presentation side effects queued during a tick.
///
/// The simulation never reads these back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharacterCue {
    PlaySound(&'static str),
    /// Sprite z rotation in degrees.
    SpriteRotation(f32),
    FlipX(bool),
    ModeGroupChanged(Option<ModeGroup>),
    GroundColliderChanged {
        left: Option<Entity>,
        entered: Option<Entity>,
    },
    AirLayerChanged(AirLayer),
}

/// Result of [`Character::hurt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HurtOutcome {
    /// Invulnerable; nothing happened.
    Ignored,
    /// The shield absorbed the hit.
    ShieldLost,
    /// Rings were dropped.
    RingsLost(u32),
    /// No rings and no shield.
    Died,
}

/// Mutable data of one character.
///
/// `velocity` and `ground_speed` are two views of the same motion while
/// grounded: `ground_speed` is the component along [`Self::forward`]. Use
/// [`Self::set_ground_speed`] to change it; that rewrites `velocity` too.
#[derive(Debug, Clone)]
pub struct CharacterBody {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Velocity at the end of the previous tick.
    pub velocity_prev: Vec3,
    ground_speed: f32,
    /// Ground speed at the start of the current tick.
    pub ground_speed_prev: f32,
    forward_angle: f32,

    pub(crate) states: StateMachine,
    groups: StateGroups,
    pub effects: Effects,

    pub config: PhysicsConfig,
    /// Character scale; multiplies physics and probe distances.
    pub size_scale: f32,

    pub facing_right: bool,
    flip_x: bool,
    pub horizontal_input_lock_timer: f32,
    pub balance: BalanceState,
    ground_collider: Option<Entity>,
    mode_group: Option<ModeGroup>,
    air_layer: AirLayer,
    input_enabled: bool,

    pub rings: u32,
    pub spawn_position: Vec3,
    /// Position limits (xy).
    pub position_min: Vec2,
    pub position_max: Vec2,

    cues: Vec<CharacterCue>,
}

impl Default for CharacterBody {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            velocity_prev: Vec3::ZERO,
            ground_speed: 0.0,
            ground_speed_prev: 0.0,
            forward_angle: 0.0,
            states: StateMachine::default(),
            groups: StateGroups::default(),
            effects: Effects::default(),
            config: PhysicsConfig::default(),
            size_scale: 1.0,
            facing_right: true,
            flip_x: false,
            horizontal_input_lock_timer: 0.0,
            balance: BalanceState::None,
            ground_collider: None,
            mode_group: None,
            air_layer: AirLayer::Default,
            input_enabled: true,
            rings: 0,
            spawn_position: Vec3::ZERO,
            position_min: Vec2::splat(f32::NEG_INFINITY),
            position_max: Vec2::splat(f32::INFINITY),
            cues: Vec::new(),
        }
    }
}

impl CharacterBody {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            ..default()
        }
    }

    /// Size scale times the global physics scale.
    #[inline]
    pub fn physics_scale(&self) -> f32 {
        self.size_scale * self.config.physics_scale
    }

    // ==================== Orientation ====================

    /// Surface-forward angle in degrees, `[0, 360)`.
    #[inline]
    pub fn forward_angle(&self) -> f32 {
        self.forward_angle
    }

    pub fn set_forward_angle(&mut self, degrees: f32) {
        self.forward_angle = normalize_angle(degrees);
    }

    /// Local right.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        forward_axis(self.forward_angle)
    }

    /// Local up.
    #[inline]
    pub fn up(&self) -> Vec3 {
        up_axis(self.forward_angle)
    }

    // ==================== Ground Speed ====================

    #[inline]
    pub fn ground_speed(&self) -> f32 {
        self.ground_speed
    }

    /// Set ground speed and rewrite velocity along the forward axis.
    ///
    /// The z component of velocity is left alone.
    pub fn set_ground_speed(&mut self, value: f32) {
        self.ground_speed = value;
        let forward = self.forward();
        self.velocity = Vec3::new(forward.x * value, forward.y * value, self.velocity.z);
        self.debug_check_ground_speed();
    }

    /// Velocity projected onto the forward axis.
    pub fn projected_ground_speed(&self) -> f32 {
        let forward = self.forward();
        self.velocity.x * forward.x + self.velocity.y * forward.y
    }

    /// Recompute ground speed from velocity (after velocity was changed directly).
    pub fn sync_ground_speed(&mut self) {
        self.ground_speed = self.projected_ground_speed();
    }

    fn debug_check_ground_speed(&self) {
        debug_assert!(
            (self.projected_ground_speed() - self.ground_speed).abs()
                <= 1.0e-3 * self.ground_speed.abs().max(1.0),
            "ground speed {} does not match projected velocity {}",
            self.ground_speed,
            self.projected_ground_speed()
        );
    }

    // ==================== States ====================

    #[inline]
    pub fn state(&self) -> CharacterState {
        self.states.current()
    }

    #[inline]
    pub fn previous_state(&self) -> CharacterState {
        self.states.previous()
    }

    pub fn groups(&self) -> &StateGroups {
        &self.groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut StateGroups {
        &mut self.groups
    }

    /// Whether the current state belongs to `group`.
    #[inline]
    pub fn in_group(&self, group: StateGroup) -> bool {
        self.groups.contains(group, self.states.current())
    }

    /// State `noControl` or a `controlLock` effect.
    pub fn control_lock(&self) -> bool {
        self.in_group(StateGroup::NoControl) || self.effects.has(EffectKind::ControlLock)
    }

    /// State `ignore`, or an `invulnerable`/`invincible` effect.
    pub fn is_invulnerable(&self) -> bool {
        self.in_group(StateGroup::Ignore)
            || self.effects.has(EffectKind::Invulnerable)
            || self.effects.has(EffectKind::Invincible)
    }

    /// State `harmful` or an `invincible` effect.
    pub fn is_harmful(&self) -> bool {
        self.in_group(StateGroup::Harmful) || self.effects.has(EffectKind::Invincible)
    }

    #[inline]
    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub(crate) fn refresh_input_gate(&mut self) {
        self.input_enabled = !self.control_lock();
    }

    // ==================== Presentation ====================

    #[inline]
    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn set_flip_x(&mut self, flip: bool) {
        if self.flip_x != flip {
            self.flip_x = flip;
            self.cues.push(CharacterCue::FlipX(flip));
        }
    }

    pub fn ground_collider(&self) -> Option<Entity> {
        self.ground_collider
    }

    pub fn set_ground_collider(&mut self, collider: Option<Entity>) {
        if self.ground_collider != collider {
            self.cues.push(CharacterCue::GroundColliderChanged {
                left: self.ground_collider,
                entered: collider,
            });
            self.ground_collider = collider;
        }
    }

    pub fn mode_group(&self) -> Option<ModeGroup> {
        self.mode_group
    }

    pub fn set_mode_group(&mut self, group: Option<ModeGroup>) {
        if self.mode_group != group {
            self.mode_group = group;
            self.cues.push(CharacterCue::ModeGroupChanged(group));
        }
    }

    pub fn air_layer(&self) -> AirLayer {
        self.air_layer
    }

    pub fn set_air_layer(&mut self, layer: AirLayer) {
        if self.air_layer != layer {
            self.air_layer = layer;
            self.cues.push(CharacterCue::AirLayerChanged(layer));
        }
    }

    pub fn play_sound(&mut self, name: &'static str) {
        self.cues.push(CharacterCue::PlaySound(name));
    }

    /// Queue the sprite rotation for the current orientation.
    pub fn push_sprite_rotation(&mut self) {
        let rotation = self.sprite_rotation();
        self.cues.push(CharacterCue::SpriteRotation(rotation));
    }

    /// Sprite z rotation in degrees for the current forward angle.
    pub fn sprite_rotation(&self) -> f32 {
        if !self.config.smooth_rotation {
            return normalize_angle((self.forward_angle / 45.0).round() * 45.0);
        }

        let rotation =
            if delta_angle(0.0, self.forward_angle).abs() > self.config.smooth_rotation_threshold {
                self.forward_angle
            } else {
                0.0
            };

        if self.config.flip_mode == FlipMode::Rotation && self.flip_x {
            -rotation
        } else {
            rotation
        }
    }

    /// Cues queued since the last drain.
    pub fn cues(&self) -> &[CharacterCue] {
        &self.cues
    }

    pub fn drain_cues(&mut self) -> std::vec::Drain<'_, CharacterCue> {
        self.cues.drain(..)
    }

    // ==================== Limits ====================

    /// Clamp position into the limits; clamping stops the character.
    pub fn limit_position(&mut self) {
        let clamped = self
            .position
            .truncate()
            .clamp(self.position_min, self.position_max);
        if clamped != self.position.truncate() {
            self.position = clamped.extend(self.position.z);
            self.ground_speed = 0.0;
        }
    }

    /// Restrict movement to a rectangle.
    pub fn set_position_limits(&mut self, min: Vec2, max: Vec2) {
        self.position_min = min.min(max);
        self.position_max = min.max(max);
    }
}

/// A character controlled by a capability pipeline.
///
/// # Example
///
/// ```rust
/// use spg_character_controller::prelude::*;
///
/// let character = Character::new(PhysicsConfig::default())
///     .with_capability(GroundCapability::default())
///     .with_capability(JumpCapability::default())
///     .with_capability(AirCapability::default());
///
/// assert_eq!(character.state(), CharacterState::Ground);
/// assert!(character.capability("jump").is_some());
/// ```
#[derive(Component, Debug, Default)]
pub struct Character {
    pub body: CharacterBody,
    pipeline: CapabilityPipeline,
}

impl Character {
    pub fn new(config: PhysicsConfig) -> Self {
        if let Err(err) = config.validate() {
            warn!("invalid physics config: {err}");
        }
        Self {
            body: CharacterBody::new(config),
            pipeline: CapabilityPipeline::new(),
        }
    }

    /// Builder: append a capability to the pipeline.
    pub fn with_capability(mut self, capability: impl Capability) -> Self {
        self.push_capability(Box::new(capability));
        self
    }

    /// Builder: set the spawn point and place the character there.
    pub fn with_spawn(mut self, position: Vec3) -> Self {
        self.body.spawn_position = position;
        self.body.position = position;
        self
    }

    /// Builder: set the size scale.
    pub fn with_size_scale(mut self, scale: f32) -> Self {
        self.body.size_scale = scale;
        self
    }

    pub fn push_capability(&mut self, capability: Box<dyn Capability>) {
        self.pipeline.push(capability, self.body.groups_mut());
    }

    pub fn capability(&self, name: &str) -> Option<&dyn Capability> {
        self.pipeline.get(name)
    }

    /// First capability of concrete type `T`.
    pub fn find_capability<T: Capability>(&self) -> Option<&T> {
        self.pipeline.find::<T>()
    }

    pub fn capabilities(&self) -> &CapabilityPipeline {
        &self.pipeline
    }

    #[inline]
    pub fn state(&self) -> CharacterState {
        self.body.state()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.body.config.validate()
    }

    /// Context for running hooks outside the regular tick.
    pub fn context<'a>(&'a mut self, env: CharacterEnv<'a>) -> CapabilityContext<'a> {
        CapabilityContext::new(&mut self.body, &self.pipeline, env)
    }

    /// Transition to `state`, notifying every capability.
    pub fn set_state(&mut self, state: CharacterState, env: CharacterEnv) {
        self.context(env).set_state(state);
    }

    /// Advance one tick.
    ///
    /// Effects update first, then each capability in order with the input
    /// gate refreshed after each one. Ends by recording `velocity_prev` and
    /// clamping position.
    pub fn update(&mut self, delta_time: f32, env: CharacterEnv) {
        self.body.effects.update(delta_time);
        self.body.ground_speed_prev = self.body.ground_speed;

        self.context(env).run_update(delta_time);

        self.body.velocity_prev = self.body.velocity;
        self.body.limit_position();
    }

    /// Fan a contact out to every capability.
    pub fn on_contact(&mut self, phase: ContactPhase, kind: &ContactKind, env: CharacterEnv) {
        let mut ctx = self.context(env);
        match kind {
            ContactKind::Collision(collision) => ctx.for_each(|capability, ctx| match phase {
                ContactPhase::Enter => capability.on_collision_enter(ctx, collision),
                ContactPhase::Stay => capability.on_collision_stay(ctx, collision),
                ContactPhase::Exit => capability.on_collision_exit(ctx, collision),
            }),
            ContactKind::Trigger(other) => ctx.for_each(|capability, ctx| match phase {
                ContactPhase::Enter => capability.on_trigger_enter(ctx, *other),
                ContactPhase::Stay => capability.on_trigger_stay(ctx, *other),
                ContactPhase::Exit => capability.on_trigger_exit(ctx, *other),
            }),
        }
    }

    /// Take a hit. `move_left` is the knockback direction.
    pub fn hurt(&mut self, move_left: bool, env: CharacterEnv) -> HurtOutcome {
        if self.body.is_invulnerable() {
            return HurtOutcome::Ignored;
        }

        let outcome = if self.body.effects.has(EffectKind::Shield) {
            self.body.play_sound("sfxHurt");
            self.body.effects.remove(EffectKind::Shield);
            HurtOutcome::ShieldLost
        } else if self.body.rings == 0 {
            self.body.play_sound("sfxDie");
            self.set_state(CharacterState::Dying, env);
            return HurtOutcome::Died;
        } else {
            self.body.play_sound("sfxHurtRings");
            HurtOutcome::RingsLost(std::mem::take(&mut self.body.rings))
        };

        self.set_state(CharacterState::Hurt, env);
        let scale = self.body.physics_scale();
        let direction = if move_left { -1.0 } else { 1.0 };
        self.body.velocity = Vec3::new(2.0 * direction * scale, 4.0 * scale, self.body.velocity.z);
        self.body.position += self.body.velocity / 30.0;
        debug!("hurt: {outcome:?}");
        outcome
    }

    /// Return to the spawn point on the ground, standing still.
    pub fn respawn(&mut self, env: CharacterEnv) {
        self.body.rings = 0;
        self.body.effects.clear();
        self.body.position = self.body.spawn_position;
        self.set_state(CharacterState::Ground, env);
        self.body.velocity = Vec3::ZERO;
        self.body.ground_speed = 0.0;
        self.body.set_forward_angle(0.0);
        self.body.facing_right = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::input::NoInput;
    use crate::surface::EmptySurfaces;

    const EPS: f32 = 1.0e-4;

    fn env() -> CharacterEnv<'static> {
        CharacterEnv::new(&EmptySurfaces, &NoInput)
    }

    /// Registers the groups hurt/respawn care about.
    struct Groups;

    impl Capability for Groups {
        fn name(&self) -> &'static str {
            "groups"
        }

        fn init(&self, groups: &mut StateGroups) {
            groups.add(StateGroup::Ground, CharacterState::Ground);
            groups.add(StateGroup::NoControl, CharacterState::Hurt);
            groups.add(StateGroup::Ignore, CharacterState::Hurt);
            groups.add(StateGroup::Harmful, CharacterState::Jump);
        }
    }

    fn character() -> Character {
        Character::new(PhysicsConfig::default()).with_capability(Groups)
    }

    // ==================== Ground Speed Tests ====================

    #[test]
    fn ground_speed_rewrites_velocity_at_cardinal_angles() {
        let mut body = CharacterBody::default();
        for (angle, expected) in [
            (0.0, Vec2::new(5.0, 0.0)),
            (90.0, Vec2::new(0.0, 5.0)),
            (180.0, Vec2::new(-5.0, 0.0)),
            (270.0, Vec2::new(0.0, -5.0)),
        ] {
            body.set_forward_angle(angle);
            body.set_ground_speed(5.0);
            assert!((body.velocity.truncate() - expected).length() < EPS, "angle {angle}");
            assert!((body.projected_ground_speed() - 5.0).abs() < EPS);
        }
    }

    #[test]
    fn ground_speed_keeps_z() {
        let mut body = CharacterBody::default();
        body.velocity.z = 3.0;
        body.set_ground_speed(2.0);
        assert_eq!(body.velocity.z, 3.0);
    }

    #[test]
    fn sync_recovers_ground_speed_from_velocity() {
        let mut body = CharacterBody::default();
        body.set_forward_angle(45.0);
        body.velocity = Vec3::new(1.0, 1.0, 0.0);
        body.sync_ground_speed();
        assert!((body.ground_speed() - 2.0_f32.sqrt()).abs() < EPS);
    }

    #[test]
    fn forward_angle_is_normalized() {
        let mut body = CharacterBody::default();
        body.set_forward_angle(-90.0);
        assert_eq!(body.forward_angle(), 270.0);
        body.set_forward_angle(360.0);
        assert_eq!(body.forward_angle(), 0.0);
    }

    // ==================== Presentation Tests ====================

    #[test]
    fn sprite_rotation_snaps_without_smoothing() {
        let mut body = CharacterBody::new(PhysicsConfig::default().with_smooth_rotation(false));
        body.set_forward_angle(30.0);
        assert_eq!(body.sprite_rotation(), 45.0);
        body.set_forward_angle(350.0);
        assert_eq!(body.sprite_rotation(), 0.0);
    }

    #[test]
    fn sprite_rotation_ignores_shallow_slopes() {
        let mut body = CharacterBody::default();
        body.set_forward_angle(30.0);
        assert_eq!(body.sprite_rotation(), 0.0);
        body.set_forward_angle(300.0);
        assert_eq!(body.sprite_rotation(), 300.0);
    }

    #[test]
    fn sprite_rotation_flips_in_rotation_mode() {
        let mut body =
            CharacterBody::new(PhysicsConfig::default().with_flip_mode(FlipMode::Rotation));
        body.set_forward_angle(90.0);
        body.set_flip_x(true);
        assert_eq!(body.sprite_rotation(), -90.0);
    }

    #[test]
    fn setters_queue_cues_only_on_change() {
        let mut body = CharacterBody::default();
        body.set_mode_group(Some(ModeGroup::Air));
        body.set_mode_group(Some(ModeGroup::Air));
        body.set_air_layer(AirLayer::Default);
        body.set_flip_x(true);

        let cues: Vec<_> = body.drain_cues().collect();
        assert_eq!(
            cues,
            vec![
                CharacterCue::ModeGroupChanged(Some(ModeGroup::Air)),
                CharacterCue::FlipX(true)
            ]
        );
        assert!(body.cues().is_empty());
    }

    // ==================== Limit Tests ====================

    #[test]
    fn clamped_position_stops_ground_speed() {
        let mut body = CharacterBody::default();
        body.set_position_limits(Vec2::new(10.0, -10.0), Vec2::new(-10.0, 10.0));
        body.set_ground_speed(4.0);
        body.position = Vec3::new(12.0, 0.0, 2.0);

        body.limit_position();

        assert_eq!(body.position, Vec3::new(10.0, 0.0, 2.0));
        assert_eq!(body.ground_speed(), 0.0);
    }

    #[test]
    fn position_inside_limits_is_untouched() {
        let mut body = CharacterBody::default();
        body.set_ground_speed(4.0);
        body.position = Vec3::new(1.0, 2.0, 0.0);
        body.limit_position();
        assert_eq!(body.ground_speed(), 4.0);
    }

    // ==================== Flag Tests ====================

    #[test]
    fn flags_follow_groups_and_effects() {
        let mut character = character();
        assert!(!character.body.control_lock());
        assert!(!character.body.is_harmful());

        character.body.effects.add(Effect::indefinite(EffectKind::ControlLock));
        assert!(character.body.control_lock());

        character.body.effects.add(Effect::indefinite(EffectKind::Invincible));
        assert!(character.body.is_harmful());
        assert!(character.body.is_invulnerable());
    }

    #[test]
    fn update_gates_input_after_control_lock() {
        let mut character = character();
        character.body.effects.add(Effect::timed(EffectKind::ControlLock, 1.0));
        character.update(1.0 / 60.0, env());
        assert!(!character.body.input_enabled());

        character.body.effects.clear();
        character.update(1.0 / 60.0, env());
        assert!(character.body.input_enabled());
    }

    #[test]
    fn update_records_previous_values() {
        let mut character = character();
        character.body.set_ground_speed(3.0);
        character.update(1.0 / 60.0, env());
        assert_eq!(character.body.ground_speed_prev, 3.0);
        assert_eq!(character.body.velocity_prev, character.body.velocity);
    }

    // ==================== Hurt Tests ====================

    #[test]
    fn hurt_without_rings_dies() {
        let mut character = character();
        assert_eq!(character.hurt(false, env()), HurtOutcome::Died);
        assert_eq!(character.state(), CharacterState::Dying);
        assert_eq!(character.body.cues(), &[CharacterCue::PlaySound("sfxDie")]);
    }

    #[test]
    fn hurt_drops_rings_with_knockback() {
        let mut character = character().with_spawn(Vec3::ZERO);
        character.body.rings = 12;

        assert_eq!(character.hurt(true, env()), HurtOutcome::RingsLost(12));
        assert_eq!(character.state(), CharacterState::Hurt);
        assert_eq!(character.body.rings, 0);
        assert_eq!(character.body.velocity, Vec3::new(-2.0, 4.0, 0.0));
        assert!((character.body.position - Vec3::new(-2.0, 4.0, 0.0) / 30.0).length() < EPS);

        // The hurt state ignores further damage.
        assert_eq!(character.hurt(true, env()), HurtOutcome::Ignored);
    }

    #[test]
    fn shield_absorbs_a_hit() {
        let mut character = character();
        character.body.effects.add(Effect::indefinite(EffectKind::Shield));

        assert_eq!(character.hurt(false, env()), HurtOutcome::ShieldLost);
        assert!(!character.body.effects.has(EffectKind::Shield));
        assert_eq!(character.state(), CharacterState::Hurt);
    }

    #[test]
    fn respawn_resets_everything() {
        let mut character = character().with_spawn(Vec3::new(5.0, 5.0, 0.0));
        character.body.rings = 3;
        character.body.effects.add(Effect::indefinite(EffectKind::SpeedUp));
        character.hurt(true, env());
        character.body.set_forward_angle(90.0);
        character.body.facing_right = false;

        character.respawn(env());

        assert_eq!(character.state(), CharacterState::Ground);
        assert_eq!(character.body.position, Vec3::new(5.0, 5.0, 0.0));
        assert_eq!(character.body.velocity, Vec3::ZERO);
        assert_eq!(character.body.ground_speed(), 0.0);
        assert_eq!(character.body.forward_angle(), 0.0);
        assert!(character.body.facing_right);
        assert!(character.body.effects.is_empty());
        assert_eq!(character.body.rings, 0);
    }
}
