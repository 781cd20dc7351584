//! Catch loop simulation
//!
//! All gameplay logic lives here:
//! - Fixed timestep only, suspensions counted in ticks
//! - Seeded RNG only
//! - Stable iteration order (by node id)
//! - The engine is reached only through the [`Host`] trait

pub mod falling;
pub mod game;
pub mod hand;
pub mod host;
pub mod random;
pub mod scheduler;
pub mod timer;
pub mod world;

pub use falling::{CaptureState, FallingObject, SchedulerId};
pub use game::{CatchGame, GameEvent, HandPose, TickInput};
pub use hand::{Attachment, HandDetector, Handedness, find_descendant, find_first_named};
pub use host::{Collider, Host, NodeId, RigidBody, Shape, SimEvent, Tag};
pub use random::RandomSource;
pub use scheduler::SpawnScheduler;
pub use timer::{Delay, RepeatingTask};
pub use world::World;
