//! Spawn scheduler
//!
//! Drops a new object every spawn interval while the round is active. A
//! floor hit ends the round through [`SpawnScheduler::stop_spawning`]; only
//! [`SpawnScheduler::restart_round`] brings it back.

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::falling::{FallingObject, SchedulerId};
use super::host::{Host, NodeId};
use super::random::RandomSource;
use super::timer::RepeatingTask;
use crate::tuning::{Archetype, Tuning};

/// Periodic spawner of falling objects
#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    id: SchedulerId,
    archetypes: [Archetype; 2],
    /// Node marking the spawn area center
    origin: Option<NodeId>,
    spawn_height: f32,
    spawn_radius: f32,
    round_active: bool,
    spawning: bool,
    task: RepeatingTask,
    rng: Pcg32,
}

impl SpawnScheduler {
    pub fn new(id: SchedulerId, tuning: &Tuning, origin: Option<NodeId>) -> Self {
        Self {
            id,
            archetypes: tuning.archetypes.clone(),
            origin,
            spawn_height: tuning.spawn_height,
            spawn_radius: tuning.spawn_radius,
            round_active: true,
            spawning: false,
            task: RepeatingTask::new(tuning.spawn_interval),
            rng: Pcg32::seed_from_u64(tuning.seed),
        }
    }

    pub fn id(&self) -> SchedulerId {
        self.id
    }

    pub fn is_round_active(&self) -> bool {
        self.round_active
    }

    pub fn is_spawning(&self) -> bool {
        self.spawning
    }

    /// Ticks between spawns
    pub fn interval_ticks(&self) -> u32 {
        self.task.period_ticks()
    }

    /// Begin the spawn loop if the round is active and it is not already running
    pub fn start_spawning(&mut self) {
        if self.spawning || !self.round_active {
            return;
        }
        if self.origin.is_none() {
            log::error!("Spawn area center is not assigned, round cannot start");
            return;
        }
        self.spawning = true;
        self.task.start();
        log::info!("Spawning started (every {} ticks)", self.task.period_ticks());
    }

    /// End the round and cancel the spawn loop. Safe to call repeatedly.
    pub fn stop_spawning(&mut self) {
        let was_active = self.round_active || self.spawning;
        self.spawning = false;
        self.round_active = false;
        self.task.stop();
        if was_active {
            log::info!("Round over - missed a catch");
        }
    }

    /// Reactivate the round, clear out `live` objects and start spawning again
    pub fn restart_round<H, I>(&mut self, host: &mut H, live: I)
    where
        H: Host + ?Sized,
        I: IntoIterator<Item = NodeId>,
    {
        self.round_active = true;
        let mut cleared = 0;
        for node in live {
            host.destroy(node);
            cleared += 1;
        }
        log::info!("Round restarted, cleared {cleared} objects");
        self.start_spawning();
    }

    /// Advance the spawn loop one tick, returning the object spawned on this tick
    pub fn tick<H: Host + ?Sized>(&mut self, host: &mut H) -> Option<FallingObject> {
        if !(self.round_active && self.spawning) {
            return None;
        }
        if !self.task.advance() {
            return None;
        }
        self.spawn(host)
    }

    fn spawn<H: Host + ?Sized>(&mut self, host: &mut H) -> Option<FallingObject> {
        let Some(center) = self.origin.and_then(|o| host.world_position(o)) else {
            log::error!("Spawn area center is gone, stopping spawns");
            self.spawning = false;
            self.task.stop();
            return None;
        };

        let archetype = if self.rng.unit() < 0.5 {
            &self.archetypes[0]
        } else {
            &self.archetypes[1]
        };
        let offset = spawn_offset(self.rng.in_unit_disk(), self.spawn_radius, self.spawn_height);
        let rotation = self.rng.rotation();

        let node = host.instantiate(archetype, center + offset, rotation);
        let object = FallingObject::new(node, self.id);
        object.arm(host);
        log::debug!("Spawned {} {} at {:?}", archetype.name, node, center + offset);
        Some(object)
    }
}

/// Disk sample on the horizontal plane, raised by the spawn height
fn spawn_offset(disk: Vec2, radius: f32, height: f32) -> Vec3 {
    let d = disk * radius;
    Vec3::new(d.x, height, d.y)
}
