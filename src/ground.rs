//! Solid raycasts, grounding test and ground snap.

use bevy::prelude::*;

use crate::capability::CapabilityContext;
use crate::character::BalanceState;
use crate::collision::{SurfaceHit, solid_raycast_mask};
use crate::state::{CharacterState, StateGroup};
use crate::surface::{delta_angle, surface_angle};

impl CapabilityContext<'_> {
    /// Probe distance for solid raycasts, in world units.
    pub fn probe_distance(&self) -> f32 {
        self.body.config.probe_distance * self.body.size_scale
    }

    /// Raycast from the character against everything solid.
    pub fn solid_raycast(&self, direction: Vec3, max_distance: f32) -> Option<SurfaceHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        self.surfaces()
            .raycast(self.body.position, direction, max_distance, solid_raycast_mask())
    }

    /// Solid raycast along the character's local down.
    pub fn ground_raycast(&self) -> Option<SurfaceHit> {
        self.solid_raycast(-self.body.up(), self.probe_distance())
    }

    /// Whether `hit` is a surface the character can stand on at its current angle.
    pub fn is_grounded_hit(&self, hit: Option<&SurfaceHit>) -> bool {
        let Some(hit) = hit else {
            return false;
        };
        let angle = surface_angle(hit.normal);
        if let Some(modifier) = self.surfaces().collision_modifier(hit.collider) {
            if modifier.vetoes(angle) {
                return false;
            }
        }
        delta_angle(angle, self.body.forward_angle()).abs()
            < self.body.config.grounding_angle_tolerance
    }

    /// Place the character onto the surface below it.
    ///
    /// Casts from the centre first, then from each ledge edge.
    /// On total failure the character falls: `rollingAir` from `rolling`
    /// (when some capability registered `rollingAir` as airborne), `air`
    /// otherwise. Returns whether the character is still on the ground.
    pub fn ground_snap(&mut self) -> bool {
        let hit = self.ground_raycast();
        if let Some(hit) = hit.filter(|hit| self.is_grounded_hit(Some(hit))) {
            self.body.set_forward_angle(surface_angle(hit.normal));
            let position = hit.point + self.body.up() * self.body.config.snap_height * self.body.size_scale;
            self.body.position = position.truncate().extend(self.body.position.z);
            self.body.set_ground_collider(Some(hit.collider));
            self.body.balance = BalanceState::None;
            return true;
        }

        for (direction, balance) in [(-1.0, BalanceState::Left), (1.0, BalanceState::Right)] {
            if self.snap_to_ledge(direction) {
                self.body.balance = balance;
                return true;
            }
        }

        trace!("ground snap failed at {}", self.body.position);
        self.body.balance = BalanceState::None;
        let rolling_air = self
            .body
            .groups()
            .contains(StateGroup::AirCollision, CharacterState::RollingAir);
        let next = if self.state() == CharacterState::Rolling && rolling_air {
            CharacterState::RollingAir
        } else {
            CharacterState::Air
        };
        self.set_state(next);
        false
    }

    fn snap_to_ledge(&mut self, direction: f32) -> bool {
        let size = self.body.size_scale;
        let side = self.body.forward() * direction * self.body.config.ledge_offset;
        let origin = self.body.position + side * size * size;
        let down = -self.body.up();

        let hit = self
            .surfaces()
            .raycast(origin, down, self.probe_distance(), solid_raycast_mask());
        let Some(hit) = hit.filter(|hit| self.is_grounded_hit(Some(hit))) else {
            return false;
        };

        let position = hit.point - side * size + self.body.up() * self.body.config.snap_height * size;
        self.body.position = Vec3::new(self.body.position.x, position.y, self.body.position.z);
        self.body.set_ground_collider(Some(hit.collider));
        true
    }
}
