use glam::Vec3;
use mapwright_common::{NodeId, Ray3};
use mapwright_model::{Hit, HitTarget, HitType, MapDocument, PickResult, VertexRef};
use std::collections::{BTreeMap, BTreeSet};

/// Hit type of a vertex handle.
pub const HANDLE_HIT_TYPE: HitType = HitType::custom(8);

/// Pickable handles at the vertices of the edited nodes, and which of them
/// are selected.
#[derive(Debug, Clone, Default)]
pub struct VertexHandleManager {
    nodes: BTreeSet<NodeId>,
    handles: BTreeMap<VertexRef, Vec3>,
    selected: BTreeSet<VertexRef>,
}

impl VertexHandleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the handles with those of `nodes`. Selected handles that no
    /// longer exist are dropped from the selection.
    pub fn rebuild(&mut self, document: &MapDocument, nodes: impl IntoIterator<Item = NodeId>) {
        self.nodes = nodes.into_iter().collect();
        self.refresh(document);
    }

    /// Re-read handle positions of the current nodes from the document.
    pub fn refresh(&mut self, document: &MapDocument) {
        self.handles = self
            .nodes
            .iter()
            .flat_map(|node| document.vertices_of(*node))
            .collect();
        let handles = &self.handles;
        self.selected.retain(|v| handles.contains_key(v));
        tracing::trace!(handles = self.handles.len(), "handles refreshed");
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn position(&self, vertex: VertexRef) -> Option<Vec3> {
        self.handles.get(&vertex).copied()
    }

    pub fn handles(&self) -> impl Iterator<Item = (VertexRef, Vec3)> + '_ {
        self.handles.iter().map(|(v, p)| (*v, *p))
    }

    /// Handles belonging to one node.
    pub fn handles_of(&self, node: NodeId) -> Vec<VertexRef> {
        self.handles.keys().filter(|v| v.node == node).copied().collect()
    }

    /// Select a handle. Returns false if there is no such handle.
    pub fn select(&mut self, vertex: VertexRef) -> bool {
        if !self.handles.contains_key(&vertex) {
            return false;
        }
        self.selected.insert(vertex);
        true
    }

    pub fn deselect(&mut self, vertex: VertexRef) -> bool {
        self.selected.remove(&vertex)
    }

    /// Flip the selection state of a handle.
    pub fn toggle(&mut self, vertex: VertexRef) {
        if !self.selected.remove(&vertex) {
            self.select(vertex);
        }
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, vertex: VertexRef) -> bool {
        self.selected.contains(&vertex)
    }

    pub fn selected(&self) -> Vec<VertexRef> {
        self.selected.iter().copied().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn any_selected(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Add a hit for every handle whose sphere of `radius` the ray touches.
    pub fn pick(&self, ray: &Ray3, radius: f32, result: &mut PickResult) {
        for (vertex, position) in &self.handles {
            if let Some(distance) = ray.intersect_sphere(*position, radius) {
                result.add_hit(Hit {
                    hit_type: HANDLE_HIT_TYPE,
                    distance,
                    hit_point: *position,
                    target: HitTarget::Vertex(*vertex),
                });
            }
        }
    }
}
