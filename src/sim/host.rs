//! Host simulation interface
//!
//! The catch loop never integrates physics itself. Everything it needs from
//! the engine (spawning nodes, bodies and colliders, hierarchy, timed
//! destruction, contact/trigger events) goes through [`Host`].

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::tuning::Archetype;

/// Opaque handle to a node in the host scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Surface category used to tell floors and hands apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tag {
    #[default]
    Untagged,
    Floor,
    Hand,
}

/// Rigid body attributes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub vel: Vec3,
    pub mass: f32,
    pub use_gravity: bool,
    /// Kinematic bodies are moved only by their transform, never by forces
    pub kinematic: bool,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            vel: Vec3::ZERO,
            mass: 1.0,
            use_gravity: true,
            kinematic: false,
        }
    }
}

impl RigidBody {
    /// Body that never moves on its own (trigger carriers)
    pub fn kinematic() -> Self {
        Self {
            use_gravity: false,
            kinematic: true,
            ..Default::default()
        }
    }
}

/// Collision shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    /// Infinite horizontal plane at the node's world height
    Plane,
}

/// Collider attributes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: Shape,
    /// Triggers report overlaps but never block
    pub trigger: bool,
}

impl Collider {
    pub fn solid_sphere(radius: f32) -> Self {
        Self {
            shape: Shape::Sphere { radius },
            trigger: false,
        }
    }

    pub fn trigger_sphere(radius: f32) -> Self {
        Self {
            shape: Shape::Sphere { radius },
            trigger: true,
        }
    }

    pub fn plane() -> Self {
        Self {
            shape: Shape::Plane,
            trigger: false,
        }
    }
}

/// Events delivered by the host after a physics step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    /// `node` started touching the solid collider of `other`
    Contact { node: NodeId, other: NodeId, other_tag: Tag },
    /// `other` entered the trigger volume `volume`
    TriggerEnter { volume: NodeId, volume_tag: Tag, other: NodeId },
    /// `node` was removed from the scene
    Despawned { node: NodeId },
}

/// The engine collaborator the catch loop runs against
pub trait Host {
    /// Create a root node from an archetype at the given pose
    fn instantiate(&mut self, archetype: &Archetype, pos: Vec3, rot: Quat) -> NodeId;

    /// Create an empty named node, optionally under `parent` at its origin
    fn create_node(&mut self, name: &str, parent: Option<NodeId>) -> NodeId;

    /// Remove a node and its descendants now
    fn destroy(&mut self, node: NodeId);

    /// Remove a node and its descendants after `delay` seconds
    fn destroy_after(&mut self, node: NodeId, delay: f32);

    /// Reparent `node`, keeping its world pose
    fn set_parent(&mut self, node: NodeId, parent: NodeId);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Direct children in insertion order
    fn children(&self, node: NodeId) -> &[NodeId];

    fn name(&self, node: NodeId) -> Option<&str>;

    fn contains(&self, node: NodeId) -> bool;

    fn world_position(&self, node: NodeId) -> Option<Vec3>;

    /// Set the pose relative to the parent (or world, for roots)
    fn set_local_pose(&mut self, node: NodeId, pos: Vec3, rot: Quat);

    fn body(&self, node: NodeId) -> Option<&RigidBody>;

    fn body_mut(&mut self, node: NodeId) -> Option<&mut RigidBody>;

    fn set_body(&mut self, node: NodeId, body: RigidBody);

    fn collider(&self, node: NodeId) -> Option<&Collider>;

    fn set_collider(&mut self, node: NodeId, collider: Collider);

    fn tag(&self, node: NodeId) -> Tag;

    fn set_tag(&mut self, node: NodeId, tag: Tag);

    /// Run one physics step
    fn advance(&mut self, dt: f32);

    /// Take all events produced since the last call
    fn drain_events(&mut self) -> Vec<SimEvent>;
}
