//! Time-boxed modifiers attached to a character.
//!
//! Effects are looked up by kind (`speedUp`, `shield`, ...). Stat selection
//! elsewhere is a simple `has` check between a normal and a modified value.
//!
//! An effect completes when its timer runs out or when whoever owns its
//! condition calls [`Effect::finish`] (or [`Effects::finish`]). Either way
//! it is dropped on the next [`Effects::update`]. Effects do not evaluate
//! conditions themselves.

use bevy::prelude::*;
use strum::{AsRefStr, Display, EnumString};

/// Kind of effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum EffectKind {
    /// Speed shoes: air and ground stats use their speed-up variant.
    SpeedUp,
    /// Temporary damage immunity (after being hurt).
    Invulnerable,
    /// Invincibility power-up: immune and harmful.
    Invincible,
    /// Absorbs one hit.
    Shield,
    /// Input is ignored while active.
    ControlLock,
}

/// A single effect instance.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Effect {
    kind: EffectKind,
    /// Seconds left; `None` lasts until finished or removed.
    remaining: Option<f32>,
    elapsed: f32,
    finished: bool,
}

impl Effect {
    /// An effect that expires after `seconds`.
    pub fn timed(kind: EffectKind, seconds: f32) -> Self {
        Self {
            kind,
            remaining: Some(seconds.max(0.0)),
            elapsed: 0.0,
            finished: false,
        }
    }

    /// An effect that lasts until finished or removed.
    ///
    /// Use this for condition-bound effects: the capability tracking the
    /// condition calls [`Effect::finish`] once it holds.
    pub fn indefinite(kind: EffectKind) -> Self {
        Self {
            kind,
            remaining: None,
            elapsed: 0.0,
            finished: false,
        }
    }

    #[inline]
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Seconds until expiry, if timed.
    #[inline]
    pub fn remaining(&self) -> Option<f32> {
        self.remaining
    }

    /// Seconds since the effect was added.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Restart the timer with a new duration.
    pub fn refresh(&mut self, seconds: f32) {
        self.remaining = Some(seconds.max(0.0));
    }

    /// Mark the effect complete regardless of its timer.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Advance the effect. Returns `false` once it has completed.
    pub fn update(&mut self, delta_time: f32) -> bool {
        self.elapsed += delta_time;
        if self.finished {
            return false;
        }
        match self.remaining.as_mut() {
            Some(remaining) => {
                *remaining -= delta_time;
                *remaining > 0.0
            }
            None => true,
        }
    }
}

/// Collection of effects on one character.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    effects: Vec<Effect>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an effect. Duplicates of the same kind may coexist.
    pub fn add(&mut self, effect: Effect) {
        debug!("effect {} added", effect.kind);
        self.effects.push(effect);
    }

    /// Update every effect once and drop the ones that completed.
    pub fn update(&mut self, delta_time: f32) {
        self.effects.retain_mut(|effect| {
            let alive = effect.update(delta_time);
            if !alive {
                debug!("effect {} expired after {:.2}s", effect.kind, effect.elapsed);
            }
            alive
        });
    }

    /// Finish every effect of `kind` matching `condition`; they are dropped
    /// on the next update. Returns how many were finished.
    pub fn finish(&mut self, kind: EffectKind, mut condition: impl FnMut(&Effect) -> bool) -> usize {
        let mut count = 0;
        for effect in self.effects.iter_mut().filter(|effect| effect.kind == kind) {
            if !effect.finished && condition(effect) {
                effect.finish();
                count += 1;
            }
        }
        count
    }

    /// Remove every effect of `kind`. Returns how many were removed.
    pub fn remove(&mut self, kind: EffectKind) -> usize {
        let before = self.effects.len();
        self.effects.retain(|effect| effect.kind != kind);
        before - self.effects.len()
    }

    /// First effect of `kind`.
    pub fn get(&self, kind: EffectKind) -> Option<&Effect> {
        self.effects.iter().find(|effect| effect.kind == kind)
    }

    /// First effect of `kind`, mutably.
    pub fn get_mut(&mut self, kind: EffectKind) -> Option<&mut Effect> {
        self.effects.iter_mut().find(|effect| effect.kind == kind)
    }

    #[inline]
    pub fn has(&self, kind: EffectKind) -> bool {
        self.get(kind).is_some()
    }

    /// Remove all effects.
    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
