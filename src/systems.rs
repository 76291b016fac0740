//! Core controller systems.
//!
//! The simulation systems are exclusive: a character's capabilities raycast
//! against the whole world while mutating the character, so the
//! [`Character`] component is taken out of the world for the duration of its
//! update and put back afterwards.

use bevy::prelude::*;

use crate::backend::{BackendSurfaces, CharacterPhysicsBackend};
use crate::capability::CharacterEnv;
use crate::character::{Character, CharacterCue};
use crate::collision::CharacterContact;
use crate::input::CharacterInput;
use crate::state::{Airborne, Grounded, StateGroup};

/// A presentation cue raised by a character this tick.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct CharacterCueEvent {
    pub character: Entity,
    pub cue: CharacterCue,
}

fn take_character(world: &mut World, entity: Entity) -> Option<Character> {
    world
        .get_mut::<Character>(entity)
        .map(|mut character| std::mem::take(&mut *character))
}

fn put_character(world: &mut World, entity: Entity, character: Character) {
    if let Some(mut slot) = world.get_mut::<Character>(entity) {
        *slot = character;
    }
}

/// Load position and velocity from the backend into the character.
fn pull_body<B: CharacterPhysicsBackend>(world: &World, entity: Entity, character: &mut Character) {
    character.body.position = B::get_position(world, entity);
    character.body.velocity = B::get_velocity(world, entity);
}

/// Write position, velocity and rotation back and collect queued cues.
fn push_body<B: CharacterPhysicsBackend>(
    world: &mut World,
    entity: Entity,
    character: &mut Character,
    cues: &mut Vec<CharacterCueEvent>,
) {
    B::set_position(world, entity, character.body.position);
    B::set_velocity(world, entity, character.body.velocity);
    B::set_rotation(world, entity, character.body.forward_angle());
    cues.extend(
        character
            .body
            .drain_cues()
            .map(|cue| CharacterCueEvent { character: entity, cue }),
    );
}

/// Fan queued contact events out through each character's pipeline.
pub fn dispatch_character_contacts<B: CharacterPhysicsBackend>(world: &mut World) {
    let contacts: Vec<CharacterContact> = match world.get_resource_mut::<Events<CharacterContact>>() {
        Some(mut events) => events.drain().collect(),
        None => return,
    };
    if contacts.is_empty() {
        return;
    }

    let mut cues = Vec::new();
    for contact in contacts {
        let entity = contact.character;
        let Some(mut character) = take_character(world, entity) else {
            trace!("contact for {entity} without a character");
            continue;
        };
        let input = world.get::<CharacterInput>(entity).copied().unwrap_or_default();

        pull_body::<B>(world, entity, &mut character);
        {
            let surfaces = BackendSurfaces::<B>::new(world, entity);
            character.on_contact(contact.phase, &contact.kind, CharacterEnv::new(&surfaces, &input));
        }
        push_body::<B>(world, entity, &mut character, &mut cues);
        put_character(world, entity, character);
    }

    world.send_event_batch(cues);
}

/// Advance every character by one fixed tick.
pub fn update_characters<B: CharacterPhysicsBackend>(world: &mut World) {
    let delta_time = B::get_fixed_timestep(world);
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<Character>>()
        .iter(world)
        .collect();

    let mut cues = Vec::new();
    for entity in entities {
        let Some(mut character) = take_character(world, entity) else {
            continue;
        };
        let input = world.get::<CharacterInput>(entity).copied().unwrap_or_default();

        pull_body::<B>(world, entity, &mut character);
        {
            let surfaces = BackendSurfaces::<B>::new(world, entity);
            character.update(delta_time, CharacterEnv::new(&surfaces, &input));
        }
        push_body::<B>(world, entity, &mut character, &mut cues);
        put_character(world, entity, character);

        if let Some(mut input) = world.get_mut::<CharacterInput>(entity) {
            input.end_tick();
        }
    }

    world.send_event_batch(cues);
}

/// Sync state marker components from the characters' state groups.
pub fn sync_state_markers(
    mut commands: Commands,
    q_characters: Query<(Entity, &Character, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, character, has_grounded, has_airborne) in &q_characters {
        let grounded = character.body.in_group(StateGroup::Ground);
        let airborne = character.body.in_group(StateGroup::AirCollision);

        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded);
        } else if !grounded && has_grounded {
            commands.entity(entity).remove::<Grounded>();
        }

        if airborne && !has_airborne {
            commands.entity(entity).insert(Airborne);
        } else if !airborne && has_airborne {
            commands.entity(entity).remove::<Airborne>();
        }
    }
}
