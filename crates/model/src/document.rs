use glam::Vec3;
use mapwright_common::{NodeId, Ray3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::brush::BrushNode;
use crate::entity::{Entity, property_keys};
use crate::entity_definition_file_spec::EntityDefinitionFileSpec;
use crate::error::ModelError;
use crate::patch_node::PatchNode;
use crate::pick::{EditorContext, PickResult, VertexRef};

/// A change notification fired by the document.
///
/// Mutations of entity properties do not notify on their own; the command
/// performing them brackets the change with `object_will_change` /
/// `object_did_change`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentEvent {
    ObjectWillChange(NodeId),
    ObjectDidChange(NodeId),
    EntityDefinitionsDidChange,
    NodesDidChange(Vec<NodeId>),
    NodesWereAdded(Vec<NodeId>),
    NodesWereRemoved(Vec<NodeId>),
}

/// Receives every document notification.
pub trait DocumentObserver {
    fn notify(&mut self, event: &DocumentEvent);
}

impl<F: FnMut(&DocumentEvent)> DocumentObserver for F {
    fn notify(&mut self, event: &DocumentEvent) {
        self(event)
    }
}

/// Handle returned by [`MapDocument::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn DocumentObserver>)>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}

/// The map being edited.
///
/// Owns the worldspawn and every other entity, brush and patch. Uses
/// BTreeMap throughout so iteration and `state_hash` are deterministic.
#[derive(Debug, Serialize, Deserialize)]
pub struct MapDocument {
    worldspawn: Entity,
    entities: BTreeMap<NodeId, Entity>,
    brushes: BTreeMap<NodeId, BrushNode>,
    patches: BTreeMap<NodeId, PatchNode>,
    /// Append-only log of notifications since the last drain.
    #[serde(skip)]
    event_log: Vec<DocumentEvent>,
    #[serde(skip)]
    observers: Observers,
}

impl Default for MapDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MapDocument {
    /// Create a document holding only a worldspawn entity.
    pub fn new() -> Self {
        Self {
            worldspawn: Entity::new(property_keys::WORLDSPAWN_CLASSNAME),
            entities: BTreeMap::new(),
            brushes: BTreeMap::new(),
            patches: BTreeMap::new(),
            event_log: Vec::new(),
            observers: Observers::default(),
        }
    }

    pub fn worldspawn_id(&self) -> NodeId {
        self.worldspawn.id()
    }

    pub fn worldspawn(&self) -> &Entity {
        &self.worldspawn
    }

    pub fn worldspawn_mut(&mut self) -> &mut Entity {
        &mut self.worldspawn
    }

    /// The entity definition file named on the worldspawn.
    pub fn entity_definition_file(&self) -> EntityDefinitionFileSpec {
        self.worldspawn
            .property(property_keys::ENTITY_DEFINITIONS)
            .map(EntityDefinitionFileSpec::parse)
            .unwrap_or_default()
    }

    /// Number of entities including the worldspawn.
    pub fn entity_count(&self) -> usize {
        self.entities.len() + 1
    }

    /// All entities, worldspawn first.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        std::iter::once(&self.worldspawn).chain(self.entities.values())
    }

    pub fn entity(&self, id: NodeId) -> Option<&Entity> {
        if id == self.worldspawn.id() {
            Some(&self.worldspawn)
        } else {
            self.entities.get(&id)
        }
    }

    pub fn entity_mut(&mut self, id: NodeId) -> Option<&mut Entity> {
        if id == self.worldspawn.id() {
            Some(&mut self.worldspawn)
        } else {
            self.entities.get_mut(&id)
        }
    }

    /// Add a point entity and return its id.
    pub fn add_entity(&mut self, classname: impl Into<String>) -> NodeId {
        let entity = Entity::new(classname);
        let id = entity.id();
        self.entities.insert(id, entity);
        self.notify(DocumentEvent::NodesWereAdded(vec![id]));
        id
    }

    pub fn remove_entity(&mut self, id: NodeId) -> Result<Entity, ModelError> {
        if id == self.worldspawn.id() {
            return Err(ModelError::CannotRemoveWorldspawn);
        }
        let entity = self
            .entities
            .remove(&id)
            .ok_or(ModelError::EntityNotFound(id))?;
        self.notify(DocumentEvent::NodesWereRemoved(vec![id]));
        Ok(entity)
    }

    pub fn brushes(&self) -> &BTreeMap<NodeId, BrushNode> {
        &self.brushes
    }

    pub fn brush(&self, id: NodeId) -> Option<&BrushNode> {
        self.brushes.get(&id)
    }

    pub fn brush_mut(&mut self, id: NodeId) -> Option<&mut BrushNode> {
        self.brushes.get_mut(&id)
    }

    pub fn add_brush(&mut self, brush: BrushNode) -> NodeId {
        let id = brush.id();
        self.brushes.insert(id, brush);
        self.notify(DocumentEvent::NodesWereAdded(vec![id]));
        id
    }

    pub fn patches(&self) -> &BTreeMap<NodeId, PatchNode> {
        &self.patches
    }

    pub fn patch(&self, id: NodeId) -> Option<&PatchNode> {
        self.patches.get(&id)
    }

    pub fn patch_mut(&mut self, id: NodeId) -> Option<&mut PatchNode> {
        self.patches.get_mut(&id)
    }

    pub fn add_patch(&mut self, patch: PatchNode) -> NodeId {
        let id = patch.id();
        self.patches.insert(id, patch);
        self.notify(DocumentEvent::NodesWereAdded(vec![id]));
        id
    }

    /// Position of a brush vertex or patch control point.
    pub fn vertex_position(&self, vertex: VertexRef) -> Result<Vec3, ModelError> {
        let position = if let Some(brush) = self.brushes.get(&vertex.node) {
            brush.vertex(vertex.index)
        } else if let Some(patch) = self.patches.get(&vertex.node) {
            patch.control_point(vertex.index).map(|p| p.position)
        } else {
            return Err(ModelError::NodeNotFound(vertex.node));
        };
        position.ok_or(ModelError::VertexNotFound {
            node: vertex.node,
            index: vertex.index,
        })
    }

    pub fn set_vertex_position(
        &mut self,
        vertex: VertexRef,
        position: Vec3,
    ) -> Result<(), ModelError> {
        let updated = if let Some(brush) = self.brushes.get_mut(&vertex.node) {
            brush.set_vertex(vertex.index, position)
        } else if let Some(patch) = self.patches.get_mut(&vertex.node) {
            patch.set_control_point_position(vertex.index, position)
        } else {
            return Err(ModelError::NodeNotFound(vertex.node));
        };
        if updated {
            Ok(())
        } else {
            Err(ModelError::VertexNotFound {
                node: vertex.node,
                index: vertex.index,
            })
        }
    }

    /// Every vertex handle of a node with its position.
    pub fn vertices_of(&self, node: NodeId) -> Vec<(VertexRef, Vec3)> {
        if let Some(brush) = self.brushes.get(&node) {
            brush
                .vertices()
                .iter()
                .enumerate()
                .map(|(i, v)| (VertexRef::new(node, i), *v))
                .collect()
        } else if let Some(patch) = self.patches.get(&node) {
            patch
                .patch()
                .control_points()
                .iter()
                .enumerate()
                .map(|(i, p)| (VertexRef::new(node, i), p.position))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Pick brushes and patches along `ray`.
    pub fn pick(&self, context: &EditorContext, ray: &Ray3, result: &mut PickResult) {
        for brush in self.brushes.values() {
            brush.pick(context, ray, result);
        }
        for patch in self.patches.values() {
            patch.pick(context, ray, result);
        }
    }

    // --- Notifications ---

    pub fn object_will_change(&mut self, id: NodeId) {
        self.notify(DocumentEvent::ObjectWillChange(id));
    }

    pub fn object_did_change(&mut self, id: NodeId) {
        self.notify(DocumentEvent::ObjectDidChange(id));
    }

    pub fn entity_definitions_did_change(&mut self) {
        self.notify(DocumentEvent::EntityDefinitionsDidChange);
    }

    pub fn nodes_did_change(&mut self, ids: Vec<NodeId>) {
        self.notify(DocumentEvent::NodesDidChange(ids));
    }

    pub fn add_observer(&mut self, observer: Box<dyn DocumentObserver>) -> ObserverId {
        let id = ObserverId(self.observers.next_id);
        self.observers.next_id += 1;
        self.observers.entries.push((id, observer));
        id
    }

    /// Returns false if no observer with this id was registered.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.entries.len();
        self.observers.entries.retain(|(oid, _)| *oid != id);
        self.observers.entries.len() != before
    }

    /// Read-only access to the notification log.
    pub fn events(&self) -> &[DocumentEvent] {
        &self.event_log
    }

    /// Drain and return the notification log.
    pub fn drain_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.event_log)
    }

    fn notify(&mut self, event: DocumentEvent) {
        tracing::trace!(?event, "document notification");
        for (_, observer) in &mut self.observers.entries {
            observer.notify(&event);
        }
        self.event_log.push(event);
    }

    // --- Persistence ---

    /// Save the document as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load a document saved with [`MapDocument::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let file = std::fs::File::open(path)?;
        let mut document: Self = serde_json::from_reader(file)?;
        if !document.worldspawn.is_worldspawn() {
            return Err(ModelError::MissingWorldspawn);
        }
        for patch in document.patches.values_mut() {
            patch.rebuild_grid();
        }
        Ok(document)
    }

    /// Deterministic FNV-1a hash over all persistent document content.
    /// Equal hashes mean the documents serialize identically.
    pub fn state_hash(&self) -> u64 {
        let mut h = Fnv1a::new();
        for entity in self.entities() {
            h.write(entity.id().0.as_bytes());
            h.write_len(entity.properties().len());
            for property in entity.properties() {
                h.write_str(&property.key);
                h.write_str(&property.value);
            }
        }
        for (id, brush) in &self.brushes {
            h.write(id.0.as_bytes());
            h.write_str(brush.texture());
            h.write_len(brush.vertices().len());
            for v in brush.vertices() {
                h.write_floats(&v.to_array());
            }
        }
        for (id, patch) in &self.patches {
            h.write(id.0.as_bytes());
            let p = patch.patch();
            h.write_len(p.point_row_count());
            h.write_len(p.point_column_count());
            h.write_str(p.texture());
            for point in p.control_points() {
                h.write_floats(&point.position.to_array());
                h.write_floats(&point.uv.to_array());
            }
        }
        h.finish()
    }
}

struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Self(0xcbf2_9ce4_8422_2325) // FNV offset basis
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x0100_0000_01b3);
        }
    }

    fn write_len(&mut self, len: usize) {
        self.write(&(len as u64).to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        self.write_len(s.len());
        self.write(s.as_bytes());
    }

    fn write_floats(&mut self, values: &[f32]) {
        for v in values {
            self.write(&v.to_bits().to_le_bytes());
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{BezierPatch, PatchPoint};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn flat_patch() -> PatchNode {
        let points = (0..9)
            .map(|i| PatchPoint::at((i % 3) as f32, 2.0 - (i / 3) as f32, 0.0))
            .collect();
        PatchNode::new(BezierPatch::new(3, 3, points, "texture").unwrap())
    }

    #[test]
    fn new_document_has_worldspawn() {
        let doc = MapDocument::new();
        assert_eq!(doc.entity_count(), 1);
        assert!(doc.worldspawn().is_worldspawn());
        assert_eq!(doc.entity_definition_file(), EntityDefinitionFileSpec::Unset);
    }

    #[test]
    fn entity_definition_file_read_from_worldspawn() {
        let mut doc = MapDocument::new();
        doc.worldspawn_mut()
            .add_or_update_property(property_keys::ENTITY_DEFINITIONS, "builtin:Quake.fgd");
        assert_eq!(
            doc.entity_definition_file(),
            EntityDefinitionFileSpec::builtin("Quake.fgd")
        );
    }

    #[test]
    fn worldspawn_cannot_be_removed() {
        let mut doc = MapDocument::new();
        let ws = doc.worldspawn_id();
        assert!(matches!(
            doc.remove_entity(ws),
            Err(ModelError::CannotRemoveWorldspawn)
        ));
        let light = doc.add_entity("light");
        assert!(doc.remove_entity(light).is_ok());
        assert!(matches!(
            doc.remove_entity(light),
            Err(ModelError::EntityNotFound(_))
        ));
    }

    #[test]
    fn observers_receive_notifications() {
        let mut doc = MapDocument::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let observer = doc.add_observer(Box::new(move |e: &DocumentEvent| {
            sink.borrow_mut().push(e.clone())
        }));

        let ws = doc.worldspawn_id();
        doc.object_will_change(ws);
        doc.object_did_change(ws);
        doc.entity_definitions_did_change();
        assert_eq!(
            *seen.borrow(),
            vec![
                DocumentEvent::ObjectWillChange(ws),
                DocumentEvent::ObjectDidChange(ws),
                DocumentEvent::EntityDefinitionsDidChange,
            ]
        );

        assert!(doc.remove_observer(observer));
        assert!(!doc.remove_observer(observer));
        doc.entity_definitions_did_change();
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(doc.events().len(), 4);
    }

    #[test]
    fn drain_events_clears_log() {
        let mut doc = MapDocument::new();
        doc.add_entity("light");
        assert_eq!(doc.drain_events().len(), 1);
        assert!(doc.events().is_empty());
    }

    #[test]
    fn vertex_access_for_brushes_and_patches() {
        let mut doc = MapDocument::new();
        let brush = doc.add_brush(BrushNode::cuboid(Vec3::ZERO, Vec3::ONE, "base"));
        let patch = doc.add_patch(flat_patch());

        let v = VertexRef::new(brush, 7);
        assert_eq!(doc.vertex_position(v).unwrap(), Vec3::ONE);
        doc.set_vertex_position(v, Vec3::splat(2.0)).unwrap();
        assert_eq!(doc.vertex_position(v).unwrap(), Vec3::splat(2.0));

        let cp = VertexRef::new(patch, 4);
        assert_eq!(doc.vertex_position(cp).unwrap(), Vec3::new(1.0, 1.0, 0.0));
        doc.set_vertex_position(cp, Vec3::new(1.0, 1.0, 4.0)).unwrap();
        assert!(doc.patch(patch).unwrap().grid().bounds().unwrap().1.z > 0.9);

        assert!(matches!(
            doc.vertex_position(VertexRef::new(brush, 99)),
            Err(ModelError::VertexNotFound { index: 99, .. })
        ));
        assert!(matches!(
            doc.vertex_position(VertexRef::new(NodeId::new(), 0)),
            Err(ModelError::NodeNotFound(_))
        ));
        assert_eq!(doc.vertices_of(patch).len(), 9);
    }

    #[test]
    fn pick_returns_nearest_first() {
        let mut doc = MapDocument::new();
        doc.add_brush(BrushNode::cuboid(
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(2.0, 2.0, -8.0),
            "base",
        ));
        let patch = doc.add_patch(flat_patch());
        let mut result = PickResult::new();
        doc.pick(
            &EditorContext::new(),
            &Ray3::new(Vec3::new(1.0, 1.0, 5.0), Vec3::NEG_Z),
            &mut result,
        );
        assert_eq!(result.size(), 2);
        assert_eq!(result.all()[0].target, crate::pick::HitTarget::Node(patch));
    }

    #[test]
    fn state_hash_tracks_property_changes() {
        let mut doc = MapDocument::new();
        let before = doc.state_hash();
        doc.worldspawn_mut().add_or_update_property("wad", "base.wad");
        let changed = doc.state_hash();
        assert_ne!(before, changed);
        doc.worldspawn_mut().remove_property("wad");
        assert_eq!(doc.state_hash(), before);
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut doc = MapDocument::new();
        doc.worldspawn_mut()
            .add_or_update_property(property_keys::ENTITY_DEFINITIONS, "external:/defs/a.fgd");
        doc.add_brush(BrushNode::cuboid(Vec3::ZERO, Vec3::ONE, "base"));
        let patch = doc.add_patch(flat_patch());
        doc.save(tmp.path()).unwrap();

        let loaded = MapDocument::load(tmp.path()).unwrap();
        assert_eq!(loaded.state_hash(), doc.state_hash());
        assert_eq!(loaded.entity_definition_file(), doc.entity_definition_file());
        assert_eq!(
            loaded.patch(patch).unwrap().grid(),
            doc.patch(patch).unwrap().grid()
        );
        assert!(loaded.events().is_empty());
    }
}
