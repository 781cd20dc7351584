//! Hand Catch entry point
//!
//! Runs the catch loop headless against the reference world. An autopilot
//! stands in for the tracked hands, steering each one under the nearest
//! falling object on its side.
//!
//! Usage: `hand-catch [tuning.json]`

#[cfg(not(target_arch = "wasm32"))]
use glam::{Quat, Vec3};

#[cfg(not(target_arch = "wasm32"))]
use hand_catch::{
    Tuning,
    consts::SIM_DT,
    sim::{CatchGame, GameEvent, HandPose, Handedness, Host, NodeId, TickInput, World},
};

/// Rounds to play before exiting
#[cfg(not(target_arch = "wasm32"))]
const ROUNDS: u32 = 3;
/// Hard stop (ten minutes of simulated time)
#[cfg(not(target_arch = "wasm32"))]
const MAX_TICKS: u64 = 120 * 600;
/// Headset refresh interval the runner feeds to the fixed-step loop
#[cfg(not(target_arch = "wasm32"))]
const FRAME_DT: f32 = 1.0 / 90.0;
/// Autopilot hand speed (m/s)
#[cfg(not(target_arch = "wasm32"))]
const HAND_SPEED: f32 = 2.0;
/// Height the autopilot holds the hands at
#[cfg(not(target_arch = "wasm32"))]
const HAND_HEIGHT: f32 = 1.2;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let tuning = match std::env::args().nth(1) {
        Some(path) => match Tuning::load(&path) {
            Ok(tuning) => tuning,
            Err(err) => {
                log::error!("{err}");
                std::process::exit(1);
            }
        },
        None => Tuning::default(),
    };
    log::info!("Hand Catch (native) starting, seed {:#x}", tuning.seed);

    let mut world = World::new(tuning.gravity);
    world.add_floor(tuning.floor_height);
    let rest = [Vec3::new(-0.3, HAND_HEIGHT, 0.0), Vec3::new(0.3, HAND_HEIGHT, 0.0)];
    let left = build_hand(&mut world, Handedness::Left, rest[0]);
    let right = build_hand(&mut world, Handedness::Right, rest[1]);

    let mut game = CatchGame::new(world, &tuning, &[(Handedness::Left, left), (Handedness::Right, right)]);
    let mut autopilot = Autopilot { hands: rest, rest };

    let mut rounds = 1;
    let mut caught = 0u32;
    let mut landed = 0u32;

    while game.time_ticks() < MAX_TICKS {
        let round_lost = !game.is_round_active() && game.objects().next().is_none();
        if round_lost && rounds >= ROUNDS {
            break;
        }

        let mut input = autopilot.steer(&game);
        input.restart = round_lost;
        // Restart is one-shot and only lands on a frame that runs a tick
        if game.update(FRAME_DT, &input) > 0 && round_lost {
            rounds += 1;
        }

        for event in game.drain_events() {
            match event {
                GameEvent::Caught { .. } => caught += 1,
                GameEvent::Landed { .. } => landed += 1,
                GameEvent::RoundOver => log::info!("Round {rounds} over after {caught} catches so far"),
                _ => {}
            }
        }
    }

    let secs = game.time_ticks() as f32 * SIM_DT;
    println!("Played {rounds} round(s) in {secs:.1}s: {caught} caught, {landed} dropped");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No browser front end
}

/// Hand root with a tracking-runtime style bone chain below it
#[cfg(not(target_arch = "wasm32"))]
fn build_hand(world: &mut World, handedness: Handedness, pos: Vec3) -> NodeId {
    let side = match handedness {
        Handedness::Left => 'l',
        Handedness::Right => 'r',
    };
    let root = world.create_node(&format!("{}HandAnchor", handedness.label()), None);
    world.set_local_pose(root, pos, Quat::IDENTITY);

    let prefab = world.create_node("OVRHandPrefab", Some(root));
    let bones = world.create_node("Bones", Some(prefab));
    let wrist = world.create_node(&format!("hands:b_{side}_wrist"), Some(bones));
    for finger in ["thumb0", "index1", "middle1", "ring1", "pinky0"] {
        world.create_node(&format!("hands:b_{side}_{finger}"), Some(wrist));
    }
    root
}

/// Steers each hand toward the lowest falling object on its side
#[cfg(not(target_arch = "wasm32"))]
struct Autopilot {
    /// Current left/right hand positions
    hands: [Vec3; 2],
    rest: [Vec3; 2],
}

#[cfg(not(target_arch = "wasm32"))]
impl Autopilot {
    fn steer(&mut self, game: &CatchGame<World>) -> TickInput {
        let falling: Vec<Vec3> = game
            .falling()
            .filter_map(|o| game.host().world_position(o.node()))
            .filter(|p| p.y > HAND_HEIGHT)
            .collect();

        for (i, hand) in self.hands.iter_mut().enumerate() {
            let on_side = |p: &&Vec3| if i == 0 { p.x < 0.0 } else { p.x >= 0.0 };
            let target = falling
                .iter()
                .filter(on_side)
                .min_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
                .map(|p| Vec3::new(p.x, HAND_HEIGHT, p.z))
                .unwrap_or(self.rest[i]);

            let delta = target - *hand;
            let max_step = HAND_SPEED * FRAME_DT;
            *hand += delta.clamp_length_max(max_step);
        }

        TickInput {
            left_hand: Some(HandPose::at(self.hands[0])),
            right_hand: Some(HandPose::at(self.hands[1])),
            restart: false,
        }
    }
}
