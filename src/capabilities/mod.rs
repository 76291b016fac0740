//! Built-in capabilities.

mod air;
mod ground;
mod jump;

pub use air::{AirCapability, air_acceleration, air_drag};
pub use ground::GroundCapability;
pub use jump::JumpCapability;

use crate::character::Character;
use crate::config::{AirStats, JumpStats, PhysicsConfig};

impl Character {
    /// A character with the built-in pipeline: ground, jump, air.
    pub fn classic(config: PhysicsConfig) -> Self {
        Self::classic_with(config, AirStats::default(), JumpStats::default())
    }

    /// Like [`Character::classic`] with custom stats.
    pub fn classic_with(config: PhysicsConfig, air: AirStats, jump: JumpStats) -> Self {
        Character::new(config)
            .with_capability(GroundCapability)
            .with_capability(JumpCapability::new(jump))
            .with_capability(AirCapability::new(air))
    }
}
