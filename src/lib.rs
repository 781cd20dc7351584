//! Hand Catch - catch falling objects with tracked hands
//!
//! Core modules:
//! - `sim`: Fixed-timestep catch loop (spawning, fall/catch lifecycle, hand detectors)
//! - `tuning`: Data-driven configuration loaded before a round starts
//! - `error`: Configuration errors

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::{CatchError, Result};
pub use tuning::{Archetype, Tuning};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Seconds a landed object stays on the floor before removal
    pub const LANDED_DESPAWN_DELAY: f32 = 2.0;
    /// Seconds a caught object stays in the hand before removal
    pub const CAUGHT_DESPAWN_DELAY: f32 = 1.0;

    /// Mass applied to every spawned object
    pub const FALLING_MASS: f32 = 0.1;

    /// Delay before hand detectors look for their anchor (skeleton needs time to appear)
    pub const HAND_SETTLE_DELAY: f32 = 0.5;
}

/// Convert a duration in seconds to whole simulation ticks (at least one)
#[inline]
pub fn secs_to_ticks(secs: f32) -> u32 {
    ((secs / consts::SIM_DT).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_ticks() {
        assert_eq!(secs_to_ticks(2.0), 240);
        assert_eq!(secs_to_ticks(0.5), 60);
        assert_eq!(secs_to_ticks(0.0), 1);
    }
}
