//! Capability pipeline and state transitions.
//!
//! A character's behaviour is composed from independent [`Capability`]
//! units executed in registration order. Each hook receives a
//! [`CapabilityContext`] giving exclusive access to the character's data
//! plus the world and input queries, and may change state re-entrantly.
//!
//! Capabilities hold tuning data only; hooks take `&self`. Anything that
//! changes during play lives on [`CharacterBody`], so a hook can trigger a
//! transition that calls back into every capability, itself included.

use std::any::Any;

use bevy::prelude::*;

use crate::character::CharacterBody;
use crate::collision::Collision;
use crate::input::{Buttons, InputAxis, InputQuery};
use crate::state::{CharacterState, StateGroup, StateGroups};
use crate::surface::SurfaceQuery;

/// Upcast helper so capabilities can be looked up by concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A self-contained behaviour unit composed into a character.
///
/// Every hook has an empty default. Hooks are called for every state,
/// including ones the capability knows nothing about, and should start with
/// a state-group guard:
///
/// ```rust
/// use spg_character_controller::prelude::*;
///
/// struct Hover;
///
/// impl Capability for Hover {
///     fn name(&self) -> &'static str {
///         "hover"
///     }
///
///     fn update(&self, ctx: &mut CapabilityContext, _delta_time: f32) {
///         if !ctx.in_group(StateGroup::Air) {
///             return;
///         }
///         ctx.body.velocity.y = ctx.body.velocity.y.max(-1.0);
///     }
/// }
/// ```
pub trait Capability: AsAny + Send + Sync {
    /// Unique name used for lookups.
    fn name(&self) -> &'static str;

    /// Called once when the capability is added; registers state groups.
    fn init(&self, _groups: &mut StateGroups) {}

    /// Called on every capability after the state changed to `state`.
    fn state_init(
        &self,
        _ctx: &mut CapabilityContext,
        _state: CharacterState,
        _previous: CharacterState,
    ) {
    }

    /// Called on every capability before the state leaves `state` for `next`.
    ///
    /// Changing state here overrides the pending transition.
    fn state_deinit(
        &self,
        _ctx: &mut CapabilityContext,
        _state: CharacterState,
        _next: CharacterState,
    ) {
    }

    /// Per-tick update.
    fn update(&self, _ctx: &mut CapabilityContext, _delta_time: f32) {}

    fn on_collision_enter(&self, _ctx: &mut CapabilityContext, _collision: &Collision) {}

    fn on_collision_stay(&self, _ctx: &mut CapabilityContext, _collision: &Collision) {}

    fn on_collision_exit(&self, _ctx: &mut CapabilityContext, _collision: &Collision) {}

    fn on_trigger_enter(&self, _ctx: &mut CapabilityContext, _other: Entity) {}

    fn on_trigger_stay(&self, _ctx: &mut CapabilityContext, _other: Entity) {}

    fn on_trigger_exit(&self, _ctx: &mut CapabilityContext, _other: Entity) {}
}

/// Ordered collection of capabilities.
#[derive(Default)]
pub struct CapabilityPipeline {
    capabilities: Vec<Box<dyn Capability>>,
}

impl CapabilityPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a capability, running its `init` against `groups`.
    pub fn push(&mut self, capability: Box<dyn Capability>, groups: &mut StateGroups) {
        debug_assert!(
            self.get(capability.name()).is_none(),
            "capability {} registered twice",
            capability.name()
        );
        capability.init(groups);
        self.capabilities.push(capability);
    }

    /// Capability by name.
    pub fn get(&self, name: &str) -> Option<&dyn Capability> {
        self.capabilities
            .iter()
            .map(|capability| capability.as_ref())
            .find(|capability| capability.name() == name)
    }

    /// First capability of concrete type `T`.
    pub fn find<T: Capability>(&self) -> Option<&T> {
        self.capabilities.iter().find_map(|capability| {
            let capability: &dyn Capability = capability.as_ref();
            capability.as_any().downcast_ref::<T>()
        })
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.capabilities.iter().map(|capability| capability.name())
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub(crate) fn as_slice(&self) -> &[Box<dyn Capability>] {
        &self.capabilities
    }
}

impl std::fmt::Debug for CapabilityPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// World and input access for one character update.
#[derive(Clone, Copy)]
pub struct CharacterEnv<'a> {
    pub surfaces: &'a dyn SurfaceQuery,
    pub input: &'a dyn InputQuery,
}

impl<'a> CharacterEnv<'a> {
    pub fn new(surfaces: &'a dyn SurfaceQuery, input: &'a dyn InputQuery) -> Self {
        Self { surfaces, input }
    }
}

/// Everything a capability hook may touch.
pub struct CapabilityContext<'a> {
    /// The character's mutable data.
    pub body: &'a mut CharacterBody,
    capabilities: &'a [Box<dyn Capability>],
    env: CharacterEnv<'a>,
}

impl<'a> CapabilityContext<'a> {
    pub fn new(
        body: &'a mut CharacterBody,
        pipeline: &'a CapabilityPipeline,
        env: CharacterEnv<'a>,
    ) -> Self {
        Self {
            body,
            capabilities: pipeline.as_slice(),
            env,
        }
    }

    /// World queries.
    #[inline]
    pub fn surfaces(&self) -> &'a dyn SurfaceQuery {
        self.env.surfaces
    }

    #[inline]
    pub fn state(&self) -> CharacterState {
        self.body.state()
    }

    /// Whether the current state belongs to `group`.
    #[inline]
    pub fn in_group(&self, group: StateGroup) -> bool {
        self.body.in_group(group)
    }

    /// Transition to `next`, notifying every capability.
    ///
    /// No-op when already in `next`. Otherwise every capability gets
    /// `state_deinit`; if one of those hooks transitions elsewhere, that
    /// nested transition wins and this one is abandoned without an init
    /// pass. Otherwise the state is committed and every capability gets
    /// `state_init`.
    pub fn set_state(&mut self, next: CharacterState) {
        let current = self.body.state();
        if current == next {
            return;
        }

        let generation = self.body.states.generation();
        let capabilities = self.capabilities;
        for capability in capabilities {
            let state = self.body.state();
            capability.state_deinit(self, state, next);
        }

        if self.body.states.generation() != generation {
            debug!(
                "transition {current} -> {next} overridden by {}",
                self.body.state()
            );
            return;
        }

        self.body.states.commit(next);
        debug!("state {current} -> {next}");

        for capability in capabilities {
            let (state, previous) = (self.body.state(), self.body.previous_state());
            capability.state_init(self, state, previous);
        }
    }

    // ==================== Input ====================

    /// Horizontal input as -1, 0 or 1; left wins when both are held.
    pub fn input_direction(&self) -> i8 {
        if self.pressing_left() {
            -1
        } else if self.pressing_right() {
            1
        } else {
            0
        }
    }

    pub fn pressing_left(&self) -> bool {
        self.body.input_enabled() && self.env.input.axis_negative(InputAxis::Horizontal)
    }

    pub fn pressing_right(&self) -> bool {
        self.body.input_enabled() && self.env.input.axis_positive(InputAxis::Horizontal)
    }

    pub fn buttons_down(&self, buttons: Buttons) -> bool {
        self.body.input_enabled() && self.env.input.buttons_down(buttons)
    }

    pub fn buttons_held(&self, buttons: Buttons) -> bool {
        self.body.input_enabled() && self.env.input.buttons_held(buttons)
    }

    // ==================== Dispatch ====================

    /// Run every capability's update in order, re-evaluating the control
    /// lock after each one.
    pub(crate) fn run_update(&mut self, delta_time: f32) {
        let capabilities = self.capabilities;
        for capability in capabilities {
            capability.update(self, delta_time);
            self.body.refresh_input_gate();
        }
    }

    pub(crate) fn for_each(&mut self, mut hook: impl FnMut(&dyn Capability, &mut Self)) {
        let capabilities = self.capabilities;
        for capability in capabilities {
            hook(capability.as_ref(), self);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::input::NoInput;
    use crate::surface::EmptySurfaces;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Records every transition hook it sees; optionally redirects one.
    struct Recorder {
        name: &'static str,
        log: Log,
        redirect: Option<(CharacterState, CharacterState)>,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                redirect: None,
            }
        }

        fn redirecting(mut self, from_next: CharacterState, to: CharacterState) -> Self {
            self.redirect = Some((from_next, to));
            self
        }
    }

    impl Capability for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn init(&self, groups: &mut StateGroups) {
            groups.add(StateGroup::Air, CharacterState::Air);
        }

        fn state_init(
            &self,
            _ctx: &mut CapabilityContext,
            state: CharacterState,
            previous: CharacterState,
        ) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:init:{state}<-{previous}", self.name));
        }

        fn state_deinit(&self, ctx: &mut CapabilityContext, state: CharacterState, next: CharacterState) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:deinit:{state}->{next}", self.name));
            if let Some((pending, redirect)) = self.redirect {
                if next == pending {
                    ctx.set_state(redirect);
                }
            }
        }
    }

    fn pipeline(capabilities: Vec<Box<dyn Capability>>) -> (CharacterBody, CapabilityPipeline) {
        let mut body = CharacterBody::default();
        let mut pipeline = CapabilityPipeline::new();
        for capability in capabilities {
            pipeline.push(capability, body.groups_mut());
        }
        (body, pipeline)
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    // ==================== Pipeline Tests ====================

    #[test]
    fn push_runs_init() {
        let log = Log::default();
        let (body, pipeline) = pipeline(vec![Box::new(Recorder::new("a", &log))]);
        assert!(body.groups().contains(StateGroup::Air, CharacterState::Air));
        assert_eq!(pipeline.names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn lookup_by_name_and_type() {
        let log = Log::default();
        let (_, pipeline) = pipeline(vec![
            Box::new(Recorder::new("a", &log)),
            Box::new(Recorder::new("b", &log)),
        ]);
        assert_eq!(pipeline.get("b").map(|c| c.name()), Some("b"));
        assert!(pipeline.get("missing").is_none());
        assert_eq!(pipeline.find::<Recorder>().map(|r| r.name), Some("a"));
    }

    // ==================== State Machine Tests ====================

    #[test]
    fn same_state_is_a_noop() {
        let log = Log::default();
        let (mut body, pipeline) = pipeline(vec![Box::new(Recorder::new("a", &log))]);
        let mut ctx = CapabilityContext::new(&mut body, &pipeline, CharacterEnv::new(&EmptySurfaces, &NoInput));

        ctx.set_state(CharacterState::Ground);
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn transition_runs_deinit_then_init_in_order() {
        let log = Log::default();
        let (mut body, pipeline) = pipeline(vec![
            Box::new(Recorder::new("a", &log)),
            Box::new(Recorder::new("b", &log)),
        ]);
        let mut ctx = CapabilityContext::new(&mut body, &pipeline, CharacterEnv::new(&EmptySurfaces, &NoInput));

        ctx.set_state(CharacterState::Jump);

        assert_eq!(
            entries(&log),
            vec![
                "a:deinit:ground->jump",
                "b:deinit:ground->jump",
                "a:init:jump<-ground",
                "b:init:jump<-ground",
            ]
        );
        assert_eq!(body.state(), CharacterState::Jump);
        assert_eq!(body.previous_state(), CharacterState::Ground);
    }

    #[test]
    fn nested_transition_in_deinit_wins() {
        let log = Log::default();
        let (mut body, pipeline) = pipeline(vec![
            Box::new(Recorder::new("a", &log).redirecting(CharacterState::Jump, CharacterState::Hurt)),
            Box::new(Recorder::new("b", &log)),
        ]);
        let mut ctx = CapabilityContext::new(&mut body, &pipeline, CharacterEnv::new(&EmptySurfaces, &NoInput));

        ctx.set_state(CharacterState::Jump);

        let log = entries(&log);
        assert!(log.iter().all(|entry| !entry.contains("init:jump")));
        assert!(log.contains(&"a:init:hurt<-ground".to_string()));
        assert!(log.contains(&"b:init:hurt<-ground".to_string()));
        assert_eq!(body.state(), CharacterState::Hurt);
        assert_eq!(body.previous_state(), CharacterState::Ground);
    }

    #[test]
    fn late_deinit_hooks_see_the_nested_state() {
        let log = Log::default();
        let (mut body, pipeline) = pipeline(vec![
            Box::new(Recorder::new("a", &log).redirecting(CharacterState::Jump, CharacterState::Dying)),
            Box::new(Recorder::new("b", &log)),
        ]);
        let mut ctx = CapabilityContext::new(&mut body, &pipeline, CharacterEnv::new(&EmptySurfaces, &NoInput));

        ctx.set_state(CharacterState::Jump);

        assert_eq!(entries(&log).last().map(String::as_str), Some("b:deinit:dying->jump"));
        assert_eq!(body.state(), CharacterState::Dying);
    }
}
