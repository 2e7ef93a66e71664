//! Ray picking results.

use glam::Vec3;
use mapwright_common::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bitmask classifying a hit. Model hit types use the low bits; tools
/// allocate theirs from bit 8 upwards via [`HitType::custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitType(u64);

impl HitType {
    pub const NONE: Self = Self(0);
    pub const ANY: Self = Self(u64::MAX);

    pub const fn custom(bit: u32) -> Self {
        Self(1 << bit)
    }

    /// True if `self` shares at least one bit with `other`.
    pub fn matches(self, other: HitType) -> bool {
        self.0 & other.0 != 0
    }

    /// True if every bit of `other` is set in `self`.
    pub fn contains(self, other: HitType) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for HitType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

pub const PATCH_HIT_TYPE: HitType = HitType::custom(0);
pub const BRUSH_HIT_TYPE: HitType = HitType::custom(1);

/// Addresses one vertex of a brush or one control point of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexRef {
    pub node: NodeId,
    pub index: usize,
}

impl VertexRef {
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// What a hit refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Node(NodeId),
    Vertex(VertexRef),
}

/// A single ray intersection.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub hit_type: HitType,
    pub distance: f32,
    pub hit_point: Vec3,
    pub target: HitTarget,
}

impl Hit {
    pub fn has_type(&self, hit_type: HitType) -> bool {
        self.hit_type.matches(hit_type)
    }

    pub fn vertex(&self) -> Option<VertexRef> {
        match self.target {
            HitTarget::Vertex(v) => Some(v),
            HitTarget::Node(_) => None,
        }
    }
}

/// Hits collected for one pick ray, ordered by distance. Hits at equal
/// distance keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct PickResult {
    hits: Vec<Hit>,
}

impl PickResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hit(&mut self, hit: Hit) {
        let index = self.hits.partition_point(|h| h.distance <= hit.distance);
        self.hits.insert(index, hit);
    }

    pub fn all(&self) -> &[Hit] {
        &self.hits
    }

    pub fn size(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn first_of(&self, hit_type: HitType) -> Option<&Hit> {
        self.hits.iter().find(|h| h.has_type(hit_type))
    }

    pub fn all_of(&self, hit_type: HitType) -> Vec<&Hit> {
        self.hits.iter().filter(|h| h.has_type(hit_type)).collect()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }
}

/// Editor-side view state that decides which nodes take part in picking.
#[derive(Debug, Clone, Default)]
pub struct EditorContext {
    hidden: BTreeSet<NodeId>,
}

impl EditorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide(&mut self, id: NodeId) {
        self.hidden.insert(id);
    }

    pub fn show(&mut self, id: NodeId) {
        self.hidden.remove(&id);
    }

    pub fn pickable(&self, id: NodeId) -> bool {
        !self.hidden.contains(&id)
    }
}
