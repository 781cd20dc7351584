//! Hand detectors
//!
//! Each tracked hand gets a spherical trigger volume. Hand skeletons are
//! generated by the tracking runtime some time after the hand root exists,
//! so discovery waits a settle delay, then looks for a wrist/palm anchor in
//! the hand hierarchy. If no anchor turns up the volume goes on the hand root
//! instead. Discovery runs once and is never retried.

use serde::{Deserialize, Serialize};

use super::falling::FallingObject;
use super::host::{Collider, Host, NodeId, RigidBody, Tag};
use super::timer::Delay;
use crate::consts::HAND_SETTLE_DELAY;
use crate::tuning::Tuning;

const LEFT_ANCHORS: &[&str] = &["hands:b_l_wrist", "b_l_wrist", "l_wrist", "LeftWrist"];
const RIGHT_ANCHORS: &[&str] = &["hands:b_r_wrist", "b_r_wrist", "r_wrist", "RightWrist"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }

    /// Anchor names tried in priority order when no override is configured
    pub fn default_anchor_names(&self) -> &'static [&'static str] {
        match self {
            Handedness::Left => LEFT_ANCHORS,
            Handedness::Right => RIGHT_ANCHORS,
        }
    }
}

/// How a detector ended up attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// Volume lives on its own child node under a discovered anchor
    Anchor { anchor: NodeId, volume: NodeId },
    /// No anchor found; the hand root itself carries the volume
    Root { root: NodeId },
}

impl Attachment {
    /// Node carrying the trigger volume
    pub fn volume(&self) -> NodeId {
        match *self {
            Attachment::Anchor { volume, .. } => volume,
            Attachment::Root { root } => root,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Attachment::Root { .. })
    }
}

/// Catch volume for one tracked hand
#[derive(Debug, Clone)]
pub struct HandDetector {
    handedness: Handedness,
    root: NodeId,
    radius: f32,
    anchor_override: Option<String>,
    settle: Delay,
    attachment: Option<Attachment>,
}

impl HandDetector {
    pub fn new(handedness: Handedness, root: NodeId, radius: f32, anchor_override: Option<String>) -> Self {
        Self {
            handedness,
            root,
            radius,
            anchor_override,
            settle: Delay::new(HAND_SETTLE_DELAY),
            attachment: None,
        }
    }

    pub fn from_tuning(handedness: Handedness, root: NodeId, tuning: &Tuning) -> Self {
        let anchor_override = match handedness {
            Handedness::Left => tuning.left_anchor.clone(),
            Handedness::Right => tuning.right_anchor.clone(),
        };
        Self::new(handedness, root, tuning.catch_radius, anchor_override)
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn attachment(&self) -> Option<Attachment> {
        self.attachment
    }

    pub fn is_setup(&self) -> bool {
        self.attachment.is_some()
    }

    /// The discovered anchor, if setup found one
    pub fn anchor(&self) -> Option<NodeId> {
        match self.attachment {
            Some(Attachment::Anchor { anchor, .. }) => Some(anchor),
            _ => None,
        }
    }

    /// True if `node` is this detector's trigger volume
    pub fn owns_volume(&self, node: NodeId) -> bool {
        self.attachment.is_some_and(|a| a.volume() == node)
    }

    /// Advance the settle delay. Returns the attachment on the tick setup runs.
    pub fn tick<H: Host + ?Sized>(&mut self, host: &mut H) -> Option<Attachment> {
        if self.attachment.is_some() || !self.settle.advance() {
            return None;
        }
        Some(self.setup(host))
    }

    /// Names searched for, highest priority first
    pub fn candidate_names(&self) -> Vec<&str> {
        match &self.anchor_override {
            Some(name) => vec![name.as_str()],
            None => self.handedness.default_anchor_names().to_vec(),
        }
    }

    /// Search the hand hierarchy for the first candidate anchor
    pub fn find_anchor<H: Host + ?Sized>(&self, host: &H) -> Option<NodeId> {
        find_first_named(host, self.root, &self.candidate_names())
    }

    /// Attach the trigger volume. Runs discovery once; later calls return the
    /// existing attachment.
    pub fn setup<H: Host + ?Sized>(&mut self, host: &mut H) -> Attachment {
        if let Some(existing) = self.attachment {
            return existing;
        }
        let label = self.handedness.label();

        let attachment = match self.find_anchor(&*host) {
            Some(anchor) => {
                log::info!(
                    "{label} hand: found palm bone at {}",
                    host.name(anchor).unwrap_or_default()
                );
                let volume = host.create_node(&format!("{label}PalmCatcher"), Some(anchor));
                self.configure_volume(host, volume);
                Attachment::Anchor { anchor, volume }
            }
            None => {
                log::warn!("{label} hand: could not find palm bone, falling back to hand root");
                self.configure_volume(host, self.root);
                Attachment::Root { root: self.root }
            }
        };

        self.attachment = Some(attachment);
        attachment
    }

    fn configure_volume<H: Host + ?Sized>(&self, host: &mut H, node: NodeId) {
        host.set_collider(node, Collider::trigger_sphere(self.radius));
        host.set_body(node, RigidBody::kinematic());
        host.set_tag(node, Tag::Hand);
    }

    /// Forward an entry into this hand's volume to the object that entered.
    /// `object` is `None` when the entering node is not a falling object.
    pub fn on_volume_entry<H: Host + ?Sized>(&self, host: &mut H, object: Option<&mut FallingObject>) -> bool {
        let (Some(attachment), Some(object)) = (self.attachment, object) else {
            return false;
        };
        let caught = object.attach_to_hand(host, attachment.volume());
        if caught {
            log::info!("{} hand caught {}", self.handedness.label(), object.node());
        }
        caught
    }
}

/// First descendant of `root` matching any of `names`.
///
/// Earlier names win over later ones regardless of depth; for a single name
/// the first node in pre-order depth-first order wins. `root` itself is
/// never a match.
pub fn find_first_named<H: Host + ?Sized>(host: &H, root: NodeId, names: &[&str]) -> Option<NodeId> {
    names.iter().find_map(|name| find_descendant(host, root, name))
}

/// Pre-order depth-first search below `root` using an explicit stack
pub fn find_descendant<H: Host + ?Sized>(host: &H, root: NodeId, name: &str) -> Option<NodeId> {
    let mut stack: Vec<NodeId> = host.children(root).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        if host.name(node) == Some(name) {
            return Some(node);
        }
        stack.extend(host.children(node).iter().rev().copied());
    }
    None
}
