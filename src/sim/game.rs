//! Round driver
//!
//! Owns the host scene, the spawn scheduler, the live object table and the
//! hand detectors, and advances all of them by one fixed timestep per
//! [`CatchGame::tick`]. Host events are drained after each physics step and
//! dispatched to the objects and detectors they concern.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use super::falling::{CaptureState, FallingObject, SchedulerId};
use super::hand::{HandDetector, Handedness};
use super::host::{Host, NodeId, SimEvent};
use super::scheduler::SpawnScheduler;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::tuning::Tuning;

/// Tracked pose of a hand root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub pos: Vec3,
    pub rot: Quat,
}

impl HandPose {
    pub fn at(pos: Vec3) -> Self {
        Self {
            pos,
            rot: Quat::IDENTITY,
        }
    }
}

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Left hand root pose (`None` keeps the last pose)
    pub left_hand: Option<HandPose>,
    /// Right hand root pose (`None` keeps the last pose)
    pub right_hand: Option<HandPose>,
    /// Start a new round if the current one is over
    pub restart: bool,
}

impl TickInput {
    pub fn hand(&self, handedness: Handedness) -> Option<HandPose> {
        match handedness {
            Handedness::Left => self.left_hand,
            Handedness::Right => self.right_hand,
        }
    }
}

/// Lifecycle transitions reported to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Spawned { node: NodeId, archetype: String },
    Caught { node: NodeId, hand: Option<Handedness> },
    Landed { node: NodeId },
    Despawned { node: NodeId },
    RoundOver,
    RoundRestarted,
    HandReady { hand: Handedness, fallback: bool },
}

/// A catch round running against a host
pub struct CatchGame<H: Host> {
    host: H,
    scheduler: SpawnScheduler,
    /// Live objects keyed by node; each carries its owning scheduler's id
    objects: BTreeMap<NodeId, FallingObject>,
    hands: Vec<HandDetector>,
    events: Vec<GameEvent>,
    time_ticks: u64,
    accumulator: f32,
}

impl<H: Host> CatchGame<H> {
    /// Set up a round. The hand roots must already exist in `host`.
    pub fn new(mut host: H, tuning: &Tuning, hand_roots: &[(Handedness, NodeId)]) -> Self {
        let origin = tuning.spawn_origin.map(|pos| {
            let id = host.create_node("SpawnAreaCenter", None);
            host.set_local_pose(id, pos, Quat::IDENTITY);
            id
        });

        let mut scheduler = SpawnScheduler::new(SchedulerId(1), tuning, origin);
        scheduler.start_spawning();

        let hands = hand_roots
            .iter()
            .map(|&(handedness, root)| HandDetector::from_tuning(handedness, root, tuning))
            .collect();

        Self {
            host,
            scheduler,
            objects: BTreeMap::new(),
            hands,
            events: Vec::new(),
            time_ticks: 0,
            accumulator: 0.0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scheduler(&self) -> &SpawnScheduler {
        &self.scheduler
    }

    pub fn hands(&self) -> &[HandDetector] {
        &self.hands
    }

    pub fn object(&self, node: NodeId) -> Option<&FallingObject> {
        self.objects.get(&node)
    }

    /// Live objects in id order
    pub fn objects(&self) -> impl Iterator<Item = &FallingObject> {
        self.objects.values()
    }

    /// Live objects still up for grabs
    pub fn falling(&self) -> impl Iterator<Item = &FallingObject> {
        self.objects.values().filter(|o| o.state() == CaptureState::Falling)
    }

    pub fn is_round_active(&self) -> bool {
        self.scheduler.is_round_active()
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    /// Take all lifecycle events since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run as many fixed ticks as `frame_dt` covers, returning how many ran
    pub fn update(&mut self, frame_dt: f32, input: &TickInput) -> u32 {
        self.accumulator += frame_dt.min(0.1);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            // One-shot inputs only apply to the first substep
            let step_input = if substeps == 0 {
                input.clone()
            } else {
                TickInput {
                    restart: false,
                    ..input.clone()
                }
            };
            self.tick(&step_input);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        substeps
    }

    /// Advance the round by one fixed timestep
    pub fn tick(&mut self, input: &TickInput) {
        self.time_ticks += 1;

        for hand in &self.hands {
            if let Some(pose) = input.hand(hand.handedness()) {
                self.host.set_local_pose(hand.root(), pose.pos, pose.rot);
            }
        }

        if input.restart && !self.scheduler.is_round_active() {
            self.restart_round();
        }

        for hand in &mut self.hands {
            if let Some(attachment) = hand.tick(&mut self.host) {
                self.events.push(GameEvent::HandReady {
                    hand: hand.handedness(),
                    fallback: attachment.is_fallback(),
                });
            }
        }

        if let Some(object) = self.scheduler.tick(&mut self.host) {
            let archetype = self.host.name(object.node()).unwrap_or_default().to_string();
            self.events.push(GameEvent::Spawned {
                node: object.node(),
                archetype,
            });
            self.objects.insert(object.node(), object);
        }

        self.host.advance(SIM_DT);
        self.pump_events();
    }

    /// Start a fresh round: clear every live object and resume spawning
    pub fn restart_round(&mut self) {
        let id = self.scheduler.id();
        let live: Vec<NodeId> = self
            .objects
            .values()
            .filter(|o| o.owner() == id)
            .map(|o| o.node())
            .collect();
        self.scheduler.restart_round(&mut self.host, live);
        self.events.push(GameEvent::RoundRestarted);
        self.pump_events();
    }

    fn pump_events(&mut self) {
        for event in self.host.drain_events() {
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: SimEvent) {
        match event {
            SimEvent::Contact { node, other_tag, .. } => {
                let Some(object) = self.objects.get_mut(&node) else {
                    return;
                };
                if let Some(owner) = object.on_boundary_contact(&mut self.host, other_tag) {
                    self.events.push(GameEvent::Landed { node });
                    self.stop_owner(owner);
                }
            }
            SimEvent::TriggerEnter {
                volume,
                volume_tag,
                other,
            } => {
                let Some(object) = self.objects.get_mut(&other) else {
                    return;
                };
                let detector = self.hands.iter().find(|h| h.owns_volume(volume));
                let hand = detector.map(|h| h.handedness());

                let mut caught = object.on_volume_entry(&mut self.host, volume, volume_tag);
                if let Some(detector) = detector {
                    caught |= detector.on_volume_entry(&mut self.host, Some(object));
                }
                if caught {
                    self.events.push(GameEvent::Caught { node: other, hand });
                }
            }
            SimEvent::Despawned { node } => {
                if self.objects.remove(&node).is_some() {
                    self.events.push(GameEvent::Despawned { node });
                }
            }
        }
    }

    fn stop_owner(&mut self, owner: SchedulerId) {
        if owner != self.scheduler.id() {
            log::warn!("Landed object belongs to unknown scheduler {owner:?}");
            return;
        }
        let was_active = self.scheduler.is_round_active();
        self.scheduler.stop_spawning();
        if was_active {
            self.events.push(GameEvent::RoundOver);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::host::Tag;
    use crate::sim::world::World;

    /// Floor plus a right hand root at `hand_pos` with an optional wrist bone
    fn world_with_hand(hand_pos: Vec3, wrist: bool) -> (World, NodeId) {
        let mut world = World::new(-9.81);
        world.add_floor(0.0);
        let root = world.create_node("RightHandAnchor", None);
        world.set_local_pose(root, hand_pos, Quat::IDENTITY);
        if wrist {
            let bones = world.create_node("Bones", Some(root));
            world.create_node("b_r_wrist", Some(bones));
        }
        (world, root)
    }

    fn straight_down() -> Tuning {
        Tuning {
            spawn_radius: 0.0,
            ..Default::default()
        }
    }

    fn run(game: &mut CatchGame<World>, ticks: u32) -> Vec<GameEvent> {
        let input = TickInput::default();
        (0..ticks).flat_map(|_| {
            game.tick(&input);
            game.drain_events()
        })
        .collect()
    }

    #[test]
    fn test_missed_object_ends_round() {
        let (world, root) = world_with_hand(Vec3::new(5.0, 1.0, 5.0), true);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);

        let events = run(&mut game, 700);
        let spawned = events.iter().filter(|e| matches!(e, GameEvent::Spawned { .. })).count();
        assert_eq!(spawned, 1);
        assert!(events.iter().any(|e| matches!(e, GameEvent::Landed { .. })));
        assert_eq!(events.iter().filter(|e| **e == GameEvent::RoundOver).count(), 1);
        assert!(events.iter().any(|e| matches!(e, GameEvent::Despawned { .. })));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Caught { .. })));
        assert!(!game.is_round_active());
        assert!(!game.scheduler().is_spawning());
        assert_eq!(game.objects().count(), 0);
    }

    #[test]
    fn test_hand_under_spawn_catches() {
        let (world, root) = world_with_hand(Vec3::new(0.0, 1.5, 0.0), true);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);

        let events = run(&mut game, 600);
        assert!(events.contains(&GameEvent::HandReady {
            hand: Handedness::Right,
            fallback: false
        }));
        let caught: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Caught { node, hand } => Some((*node, *hand)),
                _ => None,
            })
            .collect();
        assert_eq!(caught.len(), 2);
        assert!(caught.iter().all(|(_, hand)| *hand == Some(Handedness::Right)));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Landed { .. })));
        assert!(game.is_round_active());

        // The first catch has been held for its grace period and removed
        assert!(events.contains(&GameEvent::Despawned { node: caught[0].0 }));
        let second = game.object(caught[1].0).unwrap();
        assert_eq!(second.state(), CaptureState::Caught);
        let volume = game.hands()[0].attachment().unwrap().volume();
        assert_eq!(game.host().parent(second.node()), Some(volume));
    }

    #[test]
    fn test_fallback_hand_still_catches() {
        let (world, root) = world_with_hand(Vec3::new(0.0, 1.5, 0.0), false);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);

        let events = run(&mut game, 400);
        assert!(events.contains(&GameEvent::HandReady {
            hand: Handedness::Right,
            fallback: true
        }));
        assert!(events.iter().any(|e| matches!(e, GameEvent::Caught { hand: Some(Handedness::Right), .. })));
        assert_eq!(game.host().tag(root), Tag::Hand);
    }

    #[test]
    fn test_restart_after_loss() {
        let (world, root) = world_with_hand(Vec3::new(5.0, 1.0, 5.0), true);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);
        // Lose the round but keep the landed object around
        let events = run(&mut game, 400);
        assert!(events.contains(&GameEvent::RoundOver));
        assert_eq!(game.objects().count(), 1);

        game.tick(&TickInput {
            restart: true,
            ..Default::default()
        });
        let events = game.drain_events();
        assert!(events.contains(&GameEvent::RoundRestarted));
        assert!(events.iter().any(|e| matches!(e, GameEvent::Despawned { .. })));
        assert_eq!(game.objects().count(), 0);
        assert!(game.is_round_active());

        let interval = game.scheduler().interval_ticks();
        let events = run(&mut game, interval - 1);
        assert_eq!(events.iter().filter(|e| matches!(e, GameEvent::Spawned { .. })).count(), 1);
    }

    #[test]
    fn test_restart_ignored_while_active() {
        let (world, root) = world_with_hand(Vec3::new(5.0, 1.0, 5.0), true);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);
        game.tick(&TickInput {
            restart: true,
            ..Default::default()
        });
        assert!(!game.drain_events().contains(&GameEvent::RoundRestarted));
    }

    #[test]
    fn test_missing_origin_never_spawns() {
        let (world, root) = world_with_hand(Vec3::new(0.0, 1.5, 0.0), true);
        let tuning = Tuning {
            spawn_origin: None,
            ..Default::default()
        };
        let mut game = CatchGame::new(world, &tuning, &[(Handedness::Right, root)]);
        let events = run(&mut game, 1000);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Spawned { .. })));
        assert!(game.is_round_active());
    }

    #[test]
    fn test_floor_then_hand_stays_landed() {
        let (world, root) = world_with_hand(Vec3::new(5.0, 1.0, 5.0), true);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);
        run(&mut game, 240);
        let node = game.objects().next().unwrap().node();
        let volume = game.hands()[0].attachment().unwrap().volume();
        let floor = NodeId(1);

        game.dispatch(SimEvent::Contact {
            node,
            other: floor,
            other_tag: Tag::Floor,
        });
        for _ in 0..3 {
            game.dispatch(SimEvent::TriggerEnter {
                volume,
                volume_tag: Tag::Hand,
                other: node,
            });
        }
        let events = game.drain_events();
        assert_eq!(events, vec![GameEvent::Landed { node }, GameEvent::RoundOver]);
        assert_eq!(game.object(node).unwrap().state(), CaptureState::Landed);
    }

    #[test]
    fn test_hand_then_floor_stays_caught() {
        let (world, root) = world_with_hand(Vec3::new(5.0, 1.0, 5.0), true);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);
        run(&mut game, 240);
        let node = game.objects().next().unwrap().node();
        let volume = game.hands()[0].attachment().unwrap().volume();

        game.dispatch(SimEvent::TriggerEnter {
            volume,
            volume_tag: Tag::Hand,
            other: node,
        });
        for _ in 0..3 {
            game.dispatch(SimEvent::Contact {
                node,
                other: NodeId(1),
                other_tag: Tag::Floor,
            });
        }
        let events = game.drain_events();
        assert_eq!(
            events,
            vec![GameEvent::Caught {
                node,
                hand: Some(Handedness::Right)
            }]
        );
        assert!(game.is_round_active());
    }

    #[test]
    fn test_update_runs_fixed_substeps() {
        let (world, root) = world_with_hand(Vec3::new(5.0, 1.0, 5.0), true);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);
        assert_eq!(game.update(SIM_DT * 3.5, &TickInput::default()), 3);
        assert_eq!(game.update(SIM_DT * 0.6, &TickInput::default()), 1);
        // Long stalls are capped
        assert_eq!(game.update(1.0, &TickInput::default()), MAX_SUBSTEPS);
        assert_eq!(game.time_ticks(), 4 + u64::from(MAX_SUBSTEPS));
    }

    #[test]
    fn test_update_at_headset_rate_restarts_once() {
        let (world, root) = world_with_hand(Vec3::new(5.0, 1.0, 5.0), true);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);
        run(&mut game, 400);
        assert!(!game.is_round_active());

        let input = TickInput {
            restart: true,
            ..Default::default()
        };
        assert_eq!(game.update(SIM_DT * 3.5, &input), 3);
        let restarts = game
            .drain_events()
            .into_iter()
            .filter(|e| *e == GameEvent::RoundRestarted)
            .count();
        assert_eq!(restarts, 1);

        // One second of 90 Hz frames covers about 120 ticks
        let start = game.time_ticks();
        for _ in 0..90 {
            game.update(1.0 / 90.0, &TickInput::default());
        }
        assert!((119..=121).contains(&(game.time_ticks() - start)));
    }

    #[test]
    fn test_hand_input_moves_root() {
        let (world, root) = world_with_hand(Vec3::ZERO, true);
        let mut game = CatchGame::new(world, &straight_down(), &[(Handedness::Right, root)]);
        game.tick(&TickInput {
            right_hand: Some(HandPose::at(Vec3::new(0.2, 1.1, -0.3))),
            ..Default::default()
        });
        assert_eq!(game.host().world_position(root), Some(Vec3::new(0.2, 1.1, -0.3)));
    }

    #[test]
    fn test_same_seed_same_events() {
        let log = || {
            let (world, root) = world_with_hand(Vec3::new(0.3, 1.2, 0.0), true);
            let mut game = CatchGame::new(world, &Tuning::default(), &[(Handedness::Right, root)]);
            run(&mut game, 2000)
        };
        assert_eq!(log(), log());
    }
}
