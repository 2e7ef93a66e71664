use glam::Vec3;
use mapwright_common::{MAX_PATCH_SUBDIVISIONS, NodeId, Ray3};
use serde::{Deserialize, Serialize};

use crate::patch::{BezierPatch, PatchGrid, PatchPoint, make_patch_grid};
use crate::pick::{EditorContext, Hit, HitTarget, PATCH_HIT_TYPE, PickResult};

pub const DEFAULT_SUBDIVISIONS: usize = 3;

/// A patch in the document together with its cached tessellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchNode {
    id: NodeId,
    patch: BezierPatch,
    subdivisions: usize,
    #[serde(skip)]
    grid: PatchGrid,
}

impl PatchNode {
    pub fn new(patch: BezierPatch) -> Self {
        Self::with_subdivisions(patch, DEFAULT_SUBDIVISIONS)
    }

    pub fn with_subdivisions(patch: BezierPatch, subdivisions: usize) -> Self {
        let subdivisions = subdivisions.min(MAX_PATCH_SUBDIVISIONS);
        let grid = make_patch_grid(&patch, subdivisions);
        Self {
            id: NodeId::new(),
            patch,
            subdivisions,
            grid,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn patch(&self) -> &BezierPatch {
        &self.patch
    }

    pub fn grid(&self) -> &PatchGrid {
        &self.grid
    }

    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    /// Clamped to `MAX_PATCH_SUBDIVISIONS`.
    pub fn set_subdivisions(&mut self, subdivisions: usize) {
        self.subdivisions = subdivisions.min(MAX_PATCH_SUBDIVISIONS);
        self.rebuild_grid();
    }

    pub fn control_point(&self, index: usize) -> Option<PatchPoint> {
        self.patch.control_points().get(index).copied()
    }

    /// Move one control point and re-tessellate. Returns false for an
    /// out-of-range index.
    pub fn set_control_point_position(&mut self, index: usize, position: Vec3) -> bool {
        match self.patch.control_point_mut(index) {
            Some(point) => {
                point.position = position;
                self.rebuild_grid();
                true
            }
            None => false,
        }
    }

    pub fn rebuild_grid(&mut self) {
        self.grid = make_patch_grid(&self.patch, self.subdivisions);
    }

    /// Add the nearest intersection of `ray` with the tessellated surface.
    /// Both sides of the surface are pickable.
    pub fn pick(&self, context: &EditorContext, ray: &Ray3, result: &mut PickResult) {
        if !context.pickable(self.id) {
            return;
        }
        let Some((min, max)) = self.grid.bounds() else {
            return;
        };
        if ray.intersect_aabb(min, max).is_none() {
            return;
        }

        let grid = &self.grid;
        let mut nearest: Option<f32> = None;
        for row in 0..grid.quad_row_count() {
            for column in 0..grid.quad_column_count() {
                let p00 = grid.point(row, column).position;
                let p01 = grid.point(row, column + 1).position;
                let p10 = grid.point(row + 1, column).position;
                let p11 = grid.point(row + 1, column + 1).position;
                for distance in [
                    ray.intersect_triangle(p00, p10, p11),
                    ray.intersect_triangle(p00, p11, p01),
                ]
                .into_iter()
                .flatten()
                {
                    if nearest.is_none_or(|n| distance < n) {
                        nearest = Some(distance);
                    }
                }
            }
        }

        if let Some(distance) = nearest {
            result.add_hit(Hit {
                hit_type: PATCH_HIT_TYPE,
                distance,
                hit_point: ray.point_at(distance),
                target: HitTarget::Node(self.id),
            });
        }
    }
}
