//! Physics backend abstraction.
//!
//! The controller owns no physics. A backend supplies raycasts and reads and
//! writes rigidbody state, so the same character logic runs on Rapier or on
//! anything else that can answer a ray query.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::collision::{CollisionModifier, Layers, SurfaceHit};
use crate::surface::SurfaceQuery;

/// Trait for physics backend implementations.
///
/// All functions are static and take the ECS world, so backends can reach
/// whatever resources their physics engine keeps.
///
/// Position, velocity and rotation have `Transform`-based defaults; a
/// backend only overrides the ones its engine stores elsewhere.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Cast a ray and return the closest hit on any layer in `mask`.
    ///
    /// # Arguments
    /// * `world` - The ECS world for queries
    /// * `origin` - Ray origin in world space
    /// * `direction` - Ray direction (normalized)
    /// * `max_distance` - Maximum cast distance
    /// * `exclude_entity` - Entity to exclude from the cast (the character)
    /// * `mask` - Layers the ray may hit
    fn raycast(
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude_entity: Entity,
        mask: Layers,
    ) -> Option<SurfaceHit>;

    /// Grounding tag of a collider.
    ///
    /// Looks for a [`CollisionModifier`] on the collider, then on its ancestors.
    fn collision_modifier(world: &World, collider: Entity) -> Option<CollisionModifier> {
        let mut current = Some(collider);
        while let Some(entity) = current {
            if let Some(modifier) = world.get::<CollisionModifier>(entity) {
                return Some(*modifier);
            }
            current = world.get::<ChildOf>(entity).map(ChildOf::parent);
        }
        None
    }

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|transform| transform.translation)
            .unwrap_or_default()
    }

    /// Set the position of an entity.
    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    /// Set the z rotation of an entity, in degrees.
    fn set_rotation(world: &mut World, entity: Entity, degrees: f32) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = Quat::from_rotation_z(degrees.to_radians());
        }
    }

    /// Get the current velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|time| time.timestep().as_secs_f32())
            .filter(|dt| *dt > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// [`SurfaceQuery`] over a backend, excluding the character itself.
pub struct BackendSurfaces<'w, B> {
    world: &'w World,
    exclude: Entity,
    _marker: PhantomData<B>,
}

impl<'w, B: CharacterPhysicsBackend> BackendSurfaces<'w, B> {
    pub fn new(world: &'w World, exclude: Entity) -> Self {
        Self {
            world,
            exclude,
            _marker: PhantomData,
        }
    }
}

impl<B: CharacterPhysicsBackend> SurfaceQuery for BackendSurfaces<'_, B> {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: Layers,
    ) -> Option<SurfaceHit> {
        B::raycast(self.world, origin, direction, max_distance, self.exclude, mask)
    }

    fn collision_modifier(&self, collider: Entity) -> Option<CollisionModifier> {
        B::collision_modifier(self.world, collider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TransformOnly;

    impl CharacterPhysicsBackend for TransformOnly {
        fn plugin() -> impl Plugin {
            NoOpBackendPlugin
        }

        fn raycast(_: &World, _: Vec3, _: Vec3, _: f32, _: Entity, _: Layers) -> Option<SurfaceHit> {
            None
        }

        fn get_velocity(_: &World, _: Entity) -> Vec3 {
            Vec3::ZERO
        }

        fn set_velocity(_: &mut World, _: Entity, _: Vec3) {}
    }

    #[test]
    fn modifier_is_found_on_ancestor() {
        let mut world = World::new();
        let parent = world.spawn(CollisionModifier::NoGroundingLeftRightBottom).id();
        let child = world.spawn(ChildOf(parent)).id();
        let untagged = world.spawn_empty().id();

        assert_eq!(
            TransformOnly::collision_modifier(&world, child),
            Some(CollisionModifier::NoGroundingLeftRightBottom)
        );
        assert_eq!(TransformOnly::collision_modifier(&world, untagged), None);
    }

    #[test]
    fn transform_defaults() {
        let mut world = World::new();
        let entity = world.spawn(Transform::default()).id();

        TransformOnly::set_position(&mut world, entity, Vec3::new(1.0, 2.0, 3.0));
        TransformOnly::set_rotation(&mut world, entity, 90.0);

        assert_eq!(TransformOnly::get_position(&world, entity), Vec3::new(1.0, 2.0, 3.0));
        let (_, _, z) = world
            .get::<Transform>(entity)
            .map(|t| t.rotation.to_euler(EulerRot::XYZ))
            .unwrap_or_default();
        assert!((z - std::f32::consts::FRAC_PI_2).abs() < 1.0e-5);
    }

    #[test]
    fn timestep_falls_back_to_sixty_hertz() {
        let world = World::new();
        assert_eq!(TransformOnly::get_fixed_timestep(&world), 1.0 / 60.0);
    }
}
