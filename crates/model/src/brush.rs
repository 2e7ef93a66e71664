use glam::Vec3;
use mapwright_common::{NodeId, Ray3};
use serde::{Deserialize, Serialize};

use crate::pick::{BRUSH_HIT_TYPE, EditorContext, Hit, HitTarget, PickResult};

/// A brush reduced to what the vertex tool edits: its vertex positions and
/// texture name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushNode {
    id: NodeId,
    vertices: Vec<Vec3>,
    texture: String,
}

impl BrushNode {
    pub fn new(vertices: Vec<Vec3>, texture: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            vertices,
            texture: texture.into(),
        }
    }

    /// An axis-aligned box with its eight corners as vertices.
    pub fn cuboid(min: Vec3, max: Vec3, texture: impl Into<String>) -> Self {
        let vertices = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                )
            })
            .collect();
        Self::new(vertices, texture)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn texture(&self) -> &str {
        &self.texture
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> Option<Vec3> {
        self.vertices.get(index).copied()
    }

    pub fn set_vertex(&mut self, index: usize, position: Vec3) -> bool {
        match self.vertices.get_mut(index) {
            Some(v) => {
                *v = position;
                true
            }
            None => false,
        }
    }

    /// Bounding box as `(min, max)`, or `None` for a brush without vertices.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
        )
    }

    /// Pick against the bounding box.
    pub fn pick(&self, context: &EditorContext, ray: &Ray3, result: &mut PickResult) {
        if !context.pickable(self.id) {
            return;
        }
        let Some((min, max)) = self.bounds() else {
            return;
        };
        if let Some(distance) = ray.intersect_aabb(min, max) {
            result.add_hit(Hit {
                hit_type: BRUSH_HIT_TYPE,
                distance,
                hit_point: ray.point_at(distance),
                target: HitTarget::Node(self.id),
            });
        }
    }
}
