//! Backend over `bevy_rapier2d` (feature `rapier2d`).
//!
//! Character colliders need [`ActiveEvents::COLLISION_EVENTS`] so contacts
//! reach the capability pipeline. Colliders opt into [`Layers`] through
//! their [`CollisionGroups`] memberships; colliders without groups are hit
//! by every probe.

use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::prelude::*;
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;

use crate::backend::CharacterPhysicsBackend;
use crate::character::Character;
use crate::collision::{CharacterContact, Collision, ContactPhase, Layers, SurfaceHit};

/// Characters simulated by Rapier.
///
/// Raycasts go through Rapier's query pipeline; velocity is read from and
/// written to the [`Velocity`] component. Contacts are translated from
/// Rapier [`CollisionEvent`]s by [`Rapier2dBackendPlugin`].
pub struct Rapier2dBackend;

impl CharacterPhysicsBackend for Rapier2dBackend {
    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }

    fn raycast(
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude_entity: Entity,
        mask: Layers,
    ) -> Option<SurfaceHit> {
        let mut state = world.try_query::<(
            &RapierContextSimulation,
            &RapierContextColliders,
            &RapierContextJoints,
            &RapierQueryPipeline,
            &RapierRigidBodySet,
        )>()?;
        let (simulation, colliders, joints, query_pipeline, rigidbody_set) = state.single(world).ok()?;
        let context = RapierContext {
            simulation,
            colliders,
            joints,
            query_pipeline,
            rigidbody_set,
        };
        rapier_raycast(&context, origin, direction, max_distance, exclude_entity, mask)
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel.extend(0.0))
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity.truncate();
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }
}

/// Closest solid hit in `mask`, ignoring the character and sensors.
fn rapier_raycast(
    context: &RapierContext,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    exclude_entity: Entity,
    mask: Layers,
) -> Option<SurfaceHit> {
    let filter = QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(mask.bits()),
        ));

    context
        .cast_ray_and_get_normal(
            origin.truncate(),
            direction.truncate(),
            max_distance,
            true,
            filter,
        )
        .map(|(hit_entity, hit)| {
            SurfaceHit::new(
                hit.time_of_impact,
                hit.normal.extend(0.0),
                hit.point.extend(origin.z),
                hit_entity,
            )
        })
}

/// Collider pairs currently touching a character: `(character, other)`.
#[derive(Resource, Debug, Default)]
pub struct ActiveCharacterContacts {
    pairs: Vec<(Entity, Entity)>,
}

impl ActiveCharacterContacts {
    /// Colliders currently touching `character`.
    pub fn touching(&self, character: Entity) -> impl Iterator<Item = Entity> + '_ {
        self.pairs
            .iter()
            .filter(move |(c, _)| *c == character)
            .map(|(_, other)| *other)
    }
}

/// Feeds Rapier contacts into the controller.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::CharacterControllerSet;

        app.init_resource::<ActiveCharacterContacts>();
        app.add_systems(
            FixedUpdate,
            rapier_character_contacts.before(CharacterControllerSet::Contacts),
        );
    }
}

/// Solver contact points between two colliders, in world space.
fn contact_points(context: &RapierContext, character: Entity, other: Entity, z: f32) -> Vec<Vec3> {
    let Some(pair) = context.contact_pair(character, other) else {
        return Vec::new();
    };
    let mut points = Vec::new();
    for manifold in pair.manifolds() {
        points.extend(manifold.solver_contacts().map(|contact| contact.point().extend(z)));
    }
    points
}

/// Translate Rapier collision events into [`CharacterContact`] events.
///
/// `Started` and `Stopped` become `Enter` and `Exit`; every other tick a
/// touching pair produces `Stay` with fresh contact points. Sensor overlaps
/// become trigger contacts.
fn rapier_character_contacts(
    rapier_context: ReadRapierContext,
    mut collision_events: EventReader<CollisionEvent>,
    mut active: ResMut<ActiveCharacterContacts>,
    q_characters: Query<&Transform, With<Character>>,
    mut contacts: EventWriter<CharacterContact>,
) {
    let Ok(context) = rapier_context.single() else {
        collision_events.clear();
        return;
    };

    let mut entered = Vec::new();
    for event in collision_events.read() {
        let (a, b, flags, phase) = match *event {
            CollisionEvent::Started(a, b, flags) => (a, b, flags, ContactPhase::Enter),
            CollisionEvent::Stopped(a, b, flags) => (a, b, flags, ContactPhase::Exit),
        };

        for (character, other) in [(a, b), (b, a)] {
            let Ok(transform) = q_characters.get(character) else {
                continue;
            };

            if flags.contains(CollisionEventFlags::SENSOR) {
                contacts.write(CharacterContact::trigger(character, phase, other));
                continue;
            }

            match phase {
                ContactPhase::Enter => {
                    active.pairs.push((character, other));
                    entered.push((character, other));
                }
                _ => active.pairs.retain(|pair| *pair != (character, other)),
            }

            let points = contact_points(&context, character, other, transform.translation.z);
            contacts.write(CharacterContact::collision(
                character,
                phase,
                Collision::new(other, points),
            ));
        }
    }

    // Characters may have been despawned since their contact started.
    active.pairs.retain(|(character, _)| q_characters.contains(*character));

    for &(character, other) in &active.pairs {
        if entered.contains(&(character, other)) {
            continue;
        }
        let z = q_characters
            .get(character)
            .map(|t| t.translation.z)
            .unwrap_or_default();
        let points = contact_points(&context, character, other, z);
        contacts.write(CharacterContact::collision(
            character,
            ContactPhase::Stay,
            Collision::new(other, points),
        ));
    }
}

/// Physics components for a character driven by this controller.
///
/// The controller owns velocity and rotation, so the body ignores Rapier's
/// gravity and rotational dynamics.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use spg_character_controller::prelude::*;
/// use spg_character_controller::rapier::Rapier2dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         Character::classic(PhysicsConfig::default()),
///         CharacterInput::default(),
///         Rapier2dCharacterBundle::new(),
///         Collider::ball(0.5),
///     ));
/// }
/// ```
#[derive(Bundle)]
pub struct Rapier2dCharacterBundle {
    /// The rigid body type.
    pub rigid_body: RigidBody,
    /// Linear velocity, written by the controller each tick.
    pub velocity: Velocity,
    /// Rotation is set by the controller, never simulated.
    pub locked_axes: LockedAxes,
    /// Rapier gravity is disabled; air capabilities apply their own.
    pub gravity_scale: GravityScale,
    /// Collision events feed the capability pipeline.
    pub active_events: ActiveEvents,
    /// Membership in [`Layers::PLAYER_DEFAULT`].
    pub collision_groups: CollisionGroups,
}

impl Default for Rapier2dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier2dCharacterBundle {
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(0.0),
            active_events: ActiveEvents::COLLISION_EVENTS,
            collision_groups: CollisionGroups::new(
                Group::from_bits_truncate(Layers::PLAYER_DEFAULT.bits()),
                Group::ALL,
            ),
        }
    }

    /// Set the rigid body type for the character.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }
}
