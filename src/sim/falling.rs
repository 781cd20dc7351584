//! Falling object capture state machine
//!
//! Two host events race for every object: touching the floor and entering a
//! hand's detector volume. The single [`CaptureState`] field decides the
//! winner. Whichever event arrives while the object is still `Falling`
//! claims it, and every later event is dropped by the same check.

use serde::{Deserialize, Serialize};

use super::host::{Collider, Host, NodeId, Shape, Tag};
use crate::consts::{CAUGHT_DESPAWN_DELAY, FALLING_MASS, LANDED_DESPAWN_DELAY};

/// Key of the scheduler that spawned an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchedulerId(pub u32);

/// Where a falling object is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureState {
    /// Under gravity, still up for grabs
    #[default]
    Falling,
    /// Held by a hand, removal scheduled
    Caught,
    /// Reached the floor, removal scheduled
    Landed,
}

impl CaptureState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CaptureState::Falling)
    }
}

/// A spawned object and its capture state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallingObject {
    node: NodeId,
    owner: SchedulerId,
    state: CaptureState,
}

impl FallingObject {
    pub fn new(node: NodeId, owner: SchedulerId) -> Self {
        Self {
            node,
            owner,
            state: CaptureState::Falling,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Scheduler to notify when this object hits the floor
    pub fn owner(&self) -> SchedulerId {
        self.owner
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Make the node behave like a falling object: gravity on, light, solid
    pub fn arm<H: Host + ?Sized>(&self, host: &mut H) {
        let mut body = host.body(self.node).copied().unwrap_or_default();
        body.use_gravity = true;
        body.kinematic = false;
        body.mass = FALLING_MASS;
        host.set_body(self.node, body);

        if let Some(collider) = host.collider(self.node).copied() {
            host.set_collider(self.node, Collider { trigger: false, ..collider });
        } else {
            log::warn!("{} spawned without a collider, adding a default sphere", self.node);
            host.set_collider(self.node, Collider { shape: Shape::Sphere { radius: 0.05 }, trigger: false });
        }
    }

    /// Handle a solid contact. Returns the owning scheduler when this contact
    /// ends the round (first floor touch while still falling).
    pub fn on_boundary_contact<H: Host + ?Sized>(&mut self, host: &mut H, surface: Tag) -> Option<SchedulerId> {
        if surface != Tag::Floor || self.state != CaptureState::Falling {
            return None;
        }
        self.state = CaptureState::Landed;
        log::info!("{} {} hit the floor", name_of(host, self.node), self.node);
        host.destroy_after(self.node, LANDED_DESPAWN_DELAY);
        Some(self.owner)
    }

    /// Handle entering a trigger volume. Hand-tagged volumes catch the object.
    pub fn on_volume_entry<H: Host + ?Sized>(&mut self, host: &mut H, volume: NodeId, volume_tag: Tag) -> bool {
        if volume_tag != Tag::Hand {
            return false;
        }
        self.attach_to_hand(host, volume)
    }

    /// Catch the object and pin it to `anchor`. No-op unless still falling.
    pub fn attach_to_hand<H: Host + ?Sized>(&mut self, host: &mut H, anchor: NodeId) -> bool {
        if self.state != CaptureState::Falling {
            return false;
        }
        self.state = CaptureState::Caught;
        log::info!("{} {} caught by {}", name_of(host, self.node), self.node, name_of(host, anchor));

        host.set_parent(self.node, anchor);
        if let Some(body) = host.body_mut(self.node) {
            body.kinematic = true;
            body.use_gravity = false;
            body.vel = glam::Vec3::ZERO;
        }
        host.destroy_after(self.node, CAUGHT_DESPAWN_DELAY);
        true
    }
}

/// Armed banana at (0, 3, 0) for tests
#[cfg(test)]
pub(crate) fn falling_fixture(world: &mut super::world::World, owner: SchedulerId) -> FallingObject {
    use glam::{Quat, Vec3};
    let archetype = crate::tuning::Archetype::new("Banana", 0.06);
    let node = world.instantiate(&archetype, Vec3::new(0.0, 3.0, 0.0), Quat::IDENTITY);
    let object = FallingObject::new(node, owner);
    object.arm(world);
    object
}

fn name_of<H: Host + ?Sized>(host: &H, node: NodeId) -> String {
    host.name(node).unwrap_or("<gone>").to_string()
}
