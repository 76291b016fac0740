//! Landing: converting airborne velocity into ground speed.
//!
//! [`classify_landing`] is a pure function of the impact angle and the
//! velocity before the tick. [`CapabilityContext::reacquire_ground`] applies
//! an accepted landing: it commits ground speed and orientation, snaps to the
//! surface and enters `ground`.
//!
//! Bands (degrees from flat floor, either side):
//!
//! | falling      | band  | ground speed                                   |
//! |--------------|-------|------------------------------------------------|
//! | ≤ 20.5       | flat  | `vx`                                           |
//! | ≤ 45         | steep | `vx` if `abs(vx) > abs(vy)`, else `vy·sign(sin a)/2` |
//! | < 90         | wall  | `vx` if `abs(vx) > abs(vy)`, else `vy·sign(sin a)`   |
//!
//! While rising only walls and slanted ceilings in `(90, 135)` or
//! `(225, 270)` accept, with `vy·sign(sin a)`.

use bevy::prelude::*;

use crate::capability::CapabilityContext;
use crate::state::CharacterState;

const FLAT_LIMIT: f32 = 20.5;
const STEEP_LIMIT: f32 = 45.0;
const WALL_LIMIT: f32 = 90.0;
const CEILING_MIN: f32 = 135.0;
const CEILING_MAX: f32 = 225.0;

/// Which band an accepted landing fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingBand {
    Flat,
    Steep,
    Wall,
    /// Rising into a wall or slanted ceiling.
    Rising,
}

/// Why a landing was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingRejection {
    /// Falling onto a surface at 90° or steeper.
    TooSteep,
    /// Rising into a ceiling.
    Ceiling,
    /// Rising into a floor-like surface.
    Underside,
}

/// Classification of an impact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Landing {
    Accept { band: LandingBand, ground_speed: f32 },
    Reject(LandingRejection),
}

impl Landing {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Landing::Accept { .. })
    }

    pub fn ground_speed(&self) -> Option<f32> {
        match self {
            Landing::Accept { ground_speed, .. } => Some(*ground_speed),
            Landing::Reject(_) => None,
        }
    }
}

/// `1` for zero and positive values, `-1` otherwise.
fn sign(value: f32) -> f32 {
    if value >= 0.0 { 1.0 } else { -1.0 }
}

/// Classify an impact at `angle` (degrees, `[0, 360)`) given the velocity
/// before the tick.
pub fn classify_landing(angle: f32, velocity_prev: Vec3) -> Landing {
    let Vec3 { x: vx, y: vy, .. } = velocity_prev;
    let slope_sign = sign(angle.to_radians().sin());

    if vy <= 0.0 {
        let steep_speed = |damping: f32| {
            if vx.abs() > vy.abs() {
                vx
            } else {
                vy * slope_sign * damping
            }
        };

        let (band, ground_speed) = if angle <= FLAT_LIMIT || angle >= 360.0 - FLAT_LIMIT {
            (LandingBand::Flat, vx)
        } else if angle <= STEEP_LIMIT || angle >= 360.0 - STEEP_LIMIT {
            (LandingBand::Steep, steep_speed(0.5))
        } else if angle < WALL_LIMIT || angle > 360.0 - WALL_LIMIT {
            (LandingBand::Wall, steep_speed(1.0))
        } else {
            return Landing::Reject(LandingRejection::TooSteep);
        };
        return Landing::Accept { band, ground_speed };
    }

    if (CEILING_MIN..=CEILING_MAX).contains(&angle) {
        Landing::Reject(LandingRejection::Ceiling)
    } else if angle > WALL_LIMIT && angle < 360.0 - WALL_LIMIT {
        Landing::Accept {
            band: LandingBand::Rising,
            ground_speed: vy * slope_sign,
        }
    } else {
        Landing::Reject(LandingRejection::Underside)
    }
}

/// What [`CapabilityContext::reacquire_ground`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReacquireOutcome {
    /// Landed; the state is now `ground`.
    Grounded(LandingBand),
    /// Accepted but no surface to snap to; velocity restored.
    SnapFailed,
    Rejected(LandingRejection),
}

impl ReacquireOutcome {
    /// Whether later contacts of the same collision should be skipped.
    pub fn is_final(&self) -> bool {
        !matches!(self, ReacquireOutcome::Rejected(_))
    }
}

impl CapabilityContext<'_> {
    /// Try to land on a surface at `angle`.
    pub fn reacquire_ground(&mut self, angle: f32) -> ReacquireOutcome {
        let landing = classify_landing(angle, self.body.velocity_prev);
        let (band, ground_speed) = match landing {
            Landing::Accept { band, ground_speed } => (band, ground_speed),
            Landing::Reject(reason) => {
                trace!("landing at {angle} rejected: {reason:?}");
                return ReacquireOutcome::Rejected(reason);
            }
        };

        self.body.set_ground_speed(ground_speed);
        self.body.set_forward_angle(angle);

        if !self.ground_snap() {
            trace!("landing at {angle} accepted but snap failed");
            self.body.velocity = self.body.velocity_prev;
            return ReacquireOutcome::SnapFailed;
        }

        trace!("landed at {angle} ({band:?}), ground speed {ground_speed}");
        self.body.horizontal_input_lock_timer = 0.0;
        self.set_state(CharacterState::Ground);
        self.body.push_sprite_rotation();
        ReacquireOutcome::Grounded(band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLING: Vec3 = Vec3::new(3.0, -1.0, 0.0);
    const RISING: Vec3 = Vec3::new(0.0, 5.0, 0.0);

    fn band(landing: Landing) -> Option<LandingBand> {
        match landing {
            Landing::Accept { band, .. } => Some(band),
            Landing::Reject(_) => None,
        }
    }

    // ==================== Falling Tests ====================

    #[test]
    fn flat_band_keeps_horizontal_speed() {
        let landing = classify_landing(10.0, FALLING);
        assert_eq!(
            landing,
            Landing::Accept {
                band: LandingBand::Flat,
                ground_speed: 3.0
            }
        );
    }

    #[test]
    fn flat_band_edges_are_closed() {
        assert_eq!(band(classify_landing(20.5, FALLING)), Some(LandingBand::Flat));
        assert_eq!(band(classify_landing(339.5, FALLING)), Some(LandingBand::Flat));
        assert_eq!(band(classify_landing(20.5001, FALLING)), Some(LandingBand::Steep));
        assert_eq!(band(classify_landing(339.4999, FALLING)), Some(LandingBand::Steep));
    }

    #[test]
    fn steep_band_damps_vertical_speed() {
        // Mostly vertical fall onto a 30° slope.
        let landing = classify_landing(30.0, Vec3::new(1.0, -4.0, 0.0));
        assert_eq!(landing.ground_speed(), Some(-2.0));

        // Mostly horizontal keeps vx.
        let landing = classify_landing(30.0, Vec3::new(5.0, -4.0, 0.0));
        assert_eq!(landing.ground_speed(), Some(5.0));

        // Slope facing the other way flips the sign.
        let landing = classify_landing(330.0, Vec3::new(1.0, -4.0, 0.0));
        assert_eq!(landing.ground_speed(), Some(2.0));
    }

    #[test]
    fn wall_band_is_undamped() {
        let landing = classify_landing(60.0, Vec3::new(1.0, -4.0, 0.0));
        assert_eq!(band(landing), Some(LandingBand::Wall));
        assert_eq!(landing.ground_speed(), Some(-4.0));
        assert_eq!(band(classify_landing(45.0001, FALLING)), Some(LandingBand::Wall));
    }

    #[test]
    fn falling_onto_walls_and_ceilings_is_rejected() {
        for angle in [90.0, 135.0, 180.0, 270.0] {
            assert_eq!(
                classify_landing(angle, FALLING),
                Landing::Reject(LandingRejection::TooSteep),
                "angle {angle}"
            );
        }
        assert!(classify_landing(89.9, FALLING).is_accepted());
        assert!(classify_landing(270.1, FALLING).is_accepted());
    }

    #[test]
    fn level_velocity_counts_as_falling() {
        let landing = classify_landing(0.0, Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(landing.ground_speed(), Some(-2.0));
    }

    // ==================== Rising Tests ====================

    #[test]
    fn ceiling_band_is_closed() {
        for angle in [135.0, 180.0, 225.0] {
            assert_eq!(
                classify_landing(angle, RISING),
                Landing::Reject(LandingRejection::Ceiling),
                "angle {angle}"
            );
        }
    }

    #[test]
    fn rising_into_walls_uses_vertical_speed() {
        let landing = classify_landing(90.0001, RISING);
        assert_eq!(
            landing,
            Landing::Accept {
                band: LandingBand::Rising,
                ground_speed: 5.0
            }
        );
        assert_eq!(classify_landing(269.9999, RISING).ground_speed(), Some(-5.0));
        assert_eq!(classify_landing(134.9, RISING).ground_speed(), Some(5.0));
    }

    #[test]
    fn rising_into_floors_is_rejected() {
        for angle in [0.0, 45.0, 90.0, 270.0, 300.0] {
            assert_eq!(
                classify_landing(angle, RISING),
                Landing::Reject(LandingRejection::Underside),
                "angle {angle}"
            );
        }
    }

    // ==================== Idempotence Tests ====================

    #[test]
    fn classification_is_deterministic() {
        let velocities = [
            FALLING,
            RISING,
            Vec3::new(-7.5, -0.25, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.3, 11.0, 2.0),
        ];
        for velocity in velocities {
            for step in 0..720 {
                let angle = step as f32 * 0.5;
                assert_eq!(
                    classify_landing(angle, velocity),
                    classify_landing(angle, velocity),
                    "angle {angle}, velocity {velocity}"
                );
            }
        }
    }
}
