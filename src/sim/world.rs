//! Reference host
//!
//! A deliberately small deterministic scene used by the native runner and by
//! tests: a transform hierarchy, point-sphere gravity integration, horizontal
//! floor planes and sphere trigger volumes. Nodes live in a `BTreeMap` so all
//! iteration (and therefore event order) is stable by id.

use std::collections::{BTreeMap, BTreeSet};

use glam::{Quat, Vec3};

use super::host::{Collider, Host, NodeId, RigidBody, Shape, SimEvent, Tag};
use crate::secs_to_ticks;
use crate::tuning::Archetype;

/// A scene node
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub local_pos: Vec3,
    pub local_rot: Quat,
    pub tag: Tag,
    pub body: Option<RigidBody>,
    pub collider: Option<Collider>,
    /// Tick at which the node is removed
    pub despawn_at: Option<u64>,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            local_pos: Vec3::ZERO,
            local_rot: Quat::IDENTITY,
            tag: Tag::Untagged,
            body: None,
            collider: None,
            despawn_at: None,
        }
    }
}

/// Deterministic reference scene
#[derive(Debug, Clone)]
pub struct World {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u32,
    gravity: Vec3,
    time_ticks: u64,
    /// (mover, floor) pairs touching after the last step
    contacts: BTreeSet<(NodeId, NodeId)>,
    /// (mover, volume) pairs overlapping after the last step
    overlaps: BTreeSet<(NodeId, NodeId)>,
    events: Vec<SimEvent>,
}

impl World {
    /// Create an empty world with gravity along Y
    pub fn new(gravity_y: f32) -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_id: 1,
            gravity: Vec3::new(0.0, gravity_y, 0.0),
            time_ticks: 0,
            contacts: BTreeSet::new(),
            overlaps: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    /// Add a floor plane at the given height
    pub fn add_floor(&mut self, height: f32) -> NodeId {
        let id = self.create_node("Floor", None);
        self.set_local_pose(id, Vec3::new(0.0, height, 0.0), Quat::IDENTITY);
        self.set_collider(id, Collider::plane());
        self.set_tag(id, Tag::Floor);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// World pose, composed up the parent chain
    pub fn world_pose(&self, id: NodeId) -> Option<(Vec3, Quat)> {
        let node = self.nodes.get(&id)?;
        let mut pos = node.local_pos;
        let mut rot = node.local_rot;
        let mut parent = node.parent;
        while let Some(pid) = parent {
            let p = self.nodes.get(&pid)?;
            pos = p.local_rot * pos + p.local_pos;
            rot = p.local_rot * rot;
            parent = p.parent;
        }
        Some((pos, rot))
    }

    fn is_ancestor(&self, ancestor: NodeId, of: NodeId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Free root bodies that physics moves
    fn movers(&self) -> Vec<(NodeId, Vec3, f32)> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .filter(|(_, n)| n.body.is_some_and(|b| !b.kinematic))
            .filter_map(|(id, n)| match n.collider {
                Some(Collider {
                    shape: Shape::Sphere { radius },
                    trigger: false,
                }) => Some((*id, n.local_pos, radius)),
                _ => None,
            })
            .collect()
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        for node in self.nodes.values_mut() {
            if node.parent.is_some() {
                continue;
            }
            if let Some(body) = node.body.as_mut() {
                if body.kinematic {
                    continue;
                }
                if body.use_gravity {
                    body.vel += gravity * dt;
                }
                node.local_pos += body.vel * dt;
            }
        }
    }

    fn detect_floor_contacts(&mut self, movers: &[(NodeId, Vec3, f32)]) {
        let floors: Vec<(NodeId, f32, Tag)> = self
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n.collider, Some(Collider { shape: Shape::Plane, trigger: false })))
            .filter_map(|(id, n)| self.world_pose(*id).map(|(pos, _)| (*id, pos.y, n.tag)))
            .collect();

        let mut touching = BTreeSet::new();
        for &(mover, pos, radius) in movers {
            for &(floor, height, tag) in &floors {
                if pos.y - radius > height {
                    continue;
                }
                // Rest on the plane
                if let Some(node) = self.nodes.get_mut(&mover) {
                    node.local_pos.y = height + radius;
                    if let Some(body) = node.body.as_mut() {
                        body.vel = Vec3::ZERO;
                    }
                }
                if !self.contacts.contains(&(mover, floor)) {
                    self.events.push(SimEvent::Contact {
                        node: mover,
                        other: floor,
                        other_tag: tag,
                    });
                }
                touching.insert((mover, floor));
            }
        }
        self.contacts = touching;
    }

    fn detect_trigger_entries(&mut self, movers: &[(NodeId, Vec3, f32)]) {
        let volumes: Vec<(NodeId, Vec3, f32, Tag)> = self
            .nodes
            .iter()
            .filter_map(|(id, n)| match n.collider {
                Some(Collider {
                    shape: Shape::Sphere { radius },
                    trigger: true,
                }) => self.world_pose(*id).map(|(pos, _)| (*id, pos, radius, n.tag)),
                _ => None,
            })
            .collect();

        let mut inside = BTreeSet::new();
        for &(mover, pos, radius) in movers {
            // Positions may have moved during floor resolution
            let pos = self.nodes.get(&mover).map_or(pos, |n| n.local_pos);
            for &(volume, center, volume_radius, tag) in &volumes {
                if volume == mover || pos.distance(center) > radius + volume_radius {
                    continue;
                }
                if !self.overlaps.contains(&(mover, volume)) {
                    self.events.push(SimEvent::TriggerEnter {
                        volume,
                        volume_tag: tag,
                        other: mover,
                    });
                }
                inside.insert((mover, volume));
            }
        }
        self.overlaps = inside;
    }

    fn run_despawns(&mut self) {
        let now = self.time_ticks;
        let due: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.despawn_at.is_some_and(|t| t <= now))
            .map(|(id, _)| *id)
            .collect();
        for id in due {
            self.destroy(id);
        }
    }
}

impl Host for World {
    fn instantiate(&mut self, archetype: &Archetype, pos: Vec3, rot: Quat) -> NodeId {
        let id = self.allocate_id();
        let mut node = Node::new(&archetype.name, None);
        node.local_pos = pos;
        node.local_rot = rot;
        node.body = Some(RigidBody::default());
        node.collider = Some(Collider::solid_sphere(archetype.radius));
        self.nodes.insert(id, node);
        id
    }

    fn create_node(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = self.allocate_id();
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        self.nodes.insert(id, Node::new(name, parent));
        if let Some(pid) = parent {
            if let Some(p) = self.nodes.get_mut(&pid) {
                p.children.push(id);
            }
        }
        id
    }

    fn destroy(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get(&node).map(|n| n.parent) else {
            return;
        };
        if let Some(p) = parent.and_then(|pid| self.nodes.get_mut(&pid)) {
            p.children.retain(|c| *c != node);
        }

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&id) {
                stack.extend(removed.children);
                self.events.push(SimEvent::Despawned { node: id });
            }
        }
        let nodes = &self.nodes;
        self.contacts.retain(|(a, b)| nodes.contains_key(a) && nodes.contains_key(b));
        self.overlaps.retain(|(a, b)| nodes.contains_key(a) && nodes.contains_key(b));
    }

    fn destroy_after(&mut self, node: NodeId, delay: f32) {
        let at = self.time_ticks + u64::from(secs_to_ticks(delay));
        if let Some(n) = self.nodes.get_mut(&node) {
            n.despawn_at = Some(n.despawn_at.map_or(at, |t| t.min(at)));
        }
    }

    fn set_parent(&mut self, node: NodeId, parent: NodeId) {
        if !self.nodes.contains_key(&parent) || self.is_ancestor(node, parent) {
            log::warn!("Refusing to parent {node} under {parent}");
            return;
        }
        let (Some((wp, wr)), Some((pp, pr))) = (self.world_pose(node), self.world_pose(parent)) else {
            return;
        };

        let old_parent = self.nodes.get(&node).and_then(|n| n.parent);
        if let Some(old) = old_parent.and_then(|pid| self.nodes.get_mut(&pid)) {
            old.children.retain(|c| *c != node);
        }
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            let inv = pr.inverse();
            n.parent = Some(parent);
            n.local_pos = inv * (wp - pp);
            n.local_rot = inv * wr;
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(&node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.name.as_str())
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn world_position(&self, node: NodeId) -> Option<Vec3> {
        self.world_pose(node).map(|(pos, _)| pos)
    }

    fn set_local_pose(&mut self, node: NodeId, pos: Vec3, rot: Quat) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.local_pos = pos;
            n.local_rot = rot;
        }
    }

    fn body(&self, node: NodeId) -> Option<&RigidBody> {
        self.nodes.get(&node).and_then(|n| n.body.as_ref())
    }

    fn body_mut(&mut self, node: NodeId) -> Option<&mut RigidBody> {
        self.nodes.get_mut(&node).and_then(|n| n.body.as_mut())
    }

    fn set_body(&mut self, node: NodeId, body: RigidBody) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.body = Some(body);
        }
    }

    fn collider(&self, node: NodeId) -> Option<&Collider> {
        self.nodes.get(&node).and_then(|n| n.collider.as_ref())
    }

    fn set_collider(&mut self, node: NodeId, collider: Collider) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.collider = Some(collider);
        }
    }

    fn tag(&self, node: NodeId) -> Tag {
        self.nodes.get(&node).map_or(Tag::Untagged, |n| n.tag)
    }

    fn set_tag(&mut self, node: NodeId, tag: Tag) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.tag = tag;
        }
    }

    fn advance(&mut self, dt: f32) {
        self.time_ticks += 1;
        self.integrate(dt);
        let movers = self.movers();
        self.detect_floor_contacts(&movers);
        self.detect_trigger_entries(&movers);
        self.run_despawns();
    }

    fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}
