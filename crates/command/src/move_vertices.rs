use glam::Vec3;
use mapwright_model::{MapDocument, VertexRef};
use std::any::Any;

use crate::command::{Command, CommandError, CommandType};

/// Translates brush vertices and patch control points by a common delta.
///
/// The first `perform_do` records the positions before and after the move.
/// Undo and redo write those snapshots back instead of re-applying the
/// delta, so both are exact.
#[derive(Debug, Clone)]
pub struct MoveVerticesCommand {
    vertices: Vec<VertexRef>,
    delta: Vec3,
    before: Vec<Vec3>,
    after: Vec<Vec3>,
}

impl MoveVerticesCommand {
    pub const TYPE: CommandType = CommandType("MoveVertices");

    pub fn new(vertices: impl IntoIterator<Item = VertexRef>, delta: Vec3) -> Self {
        let mut vertices: Vec<VertexRef> = vertices.into_iter().collect();
        vertices.sort();
        vertices.dedup();
        Self {
            vertices,
            delta,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn vertices(&self) -> &[VertexRef] {
        &self.vertices
    }

    pub fn delta(&self) -> Vec3 {
        self.delta
    }

    fn positions(&self, document: &MapDocument) -> Result<Vec<Vec3>, CommandError> {
        Ok(self
            .vertices
            .iter()
            .map(|v| document.vertex_position(*v))
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Write `positions` to the vertices. Every vertex is looked up first so
    /// an unknown reference leaves the document untouched.
    fn write(&self, document: &mut MapDocument, positions: &[Vec3]) -> Result<(), CommandError> {
        self.positions(document)?;
        for (vertex, position) in self.vertices.iter().zip(positions) {
            document.set_vertex_position(*vertex, *position)?;
        }
        let mut nodes: Vec<_> = self.vertices.iter().map(|v| v.node).collect();
        nodes.dedup();
        document.nodes_did_change(nodes);
        Ok(())
    }
}

impl Command for MoveVerticesCommand {
    fn name(&self) -> &str {
        if self.vertices.len() == 1 {
            "Move Vertex"
        } else {
            "Move Vertices"
        }
    }

    fn command_type(&self) -> CommandType {
        Self::TYPE
    }

    fn perform_do(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
        tracing::debug!(count = self.vertices.len(), delta = ?self.delta, "moving vertices");
        if self.after.is_empty() {
            let before = self.positions(document)?;
            let after: Vec<Vec3> = before.iter().map(|p| *p + self.delta).collect();
            self.write(document, &after)?;
            self.before = before;
            self.after = after;
            Ok(())
        } else {
            let after = std::mem::take(&mut self.after);
            let result = self.write(document, &after);
            self.after = after;
            result
        }
    }

    fn perform_undo(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
        let before = std::mem::take(&mut self.before);
        let result = self.write(document, &before);
        self.before = before;
        result
    }

    /// Keeps this command's `before` snapshot and takes `other`'s `after`.
    fn collate_with(&mut self, other: &dyn Command) -> bool {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) if other.vertices == self.vertices => {
                self.delta += other.delta;
                self.after.clone_from(&other.after);
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
