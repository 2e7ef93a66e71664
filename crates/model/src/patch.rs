//! Quadratic Bezier patches and their evaluated grids.
//!
//! A patch is a `rows x columns` grid of control points where both counts are
//! odd. Every 3x3 block sharing its border points with its neighbors forms one
//! quadratic Bezier surface.

use glam::{Vec2, Vec3};
use mapwright_common::MAX_PATCH_SUBDIVISIONS;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

const CLOSURE_EPSILON: f32 = 1e-4;

/// A control point: position plus texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatchPoint {
    pub position: Vec3,
    pub uv: Vec2,
}

impl PatchPoint {
    pub const fn new(x: f32, y: f32, z: f32, u: f32, v: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            uv: Vec2::new(u, v),
        }
    }

    pub const fn at(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 0.0, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BezierPatch {
    point_row_count: usize,
    point_column_count: usize,
    control_points: Vec<PatchPoint>,
    texture: String,
}

impl BezierPatch {
    pub fn new(
        point_row_count: usize,
        point_column_count: usize,
        control_points: Vec<PatchPoint>,
        texture: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let valid_side = |n: usize| n >= 3 && n % 2 == 1;
        if !valid_side(point_row_count)
            || !valid_side(point_column_count)
            || control_points.len() != point_row_count * point_column_count
        {
            return Err(ModelError::InvalidPatchSize {
                rows: point_row_count,
                columns: point_column_count,
                points: control_points.len(),
            });
        }
        Ok(Self {
            point_row_count,
            point_column_count,
            control_points,
            texture: texture.into(),
        })
    }

    pub fn point_row_count(&self) -> usize {
        self.point_row_count
    }

    pub fn point_column_count(&self) -> usize {
        self.point_column_count
    }

    pub fn surface_row_count(&self) -> usize {
        (self.point_row_count - 1) / 2
    }

    pub fn surface_column_count(&self) -> usize {
        (self.point_column_count - 1) / 2
    }

    pub fn control_points(&self) -> &[PatchPoint] {
        &self.control_points
    }

    pub fn control_point(&self, row: usize, column: usize) -> PatchPoint {
        self.control_points[row * self.point_column_count + column]
    }

    pub fn control_point_mut(&mut self, index: usize) -> Option<&mut PatchPoint> {
        self.control_points.get_mut(index)
    }

    pub fn texture(&self) -> &str {
        &self.texture
    }

    /// Evaluate surface `(surface_row, surface_column)` at local parameters
    /// `s` (along rows) and `t` (along columns), both in `0..=1`.
    fn evaluate_surface(
        &self,
        surface_row: usize,
        surface_column: usize,
        s: f32,
        t: f32,
    ) -> (Vec3, Vec2) {
        let bs = bernstein(s);
        let bt = bernstein(t);
        let mut position = Vec3::ZERO;
        let mut uv = Vec2::ZERO;
        for (i, wi) in bs.iter().enumerate() {
            for (j, wj) in bt.iter().enumerate() {
                let p = self.control_point(2 * surface_row + i, 2 * surface_column + j);
                position += p.position * (wi * wj);
                uv += p.uv * (wi * wj);
            }
        }
        (position, uv)
    }
}

fn bernstein(t: f32) -> [f32; 3] {
    let u = 1.0 - t;
    [u * u, 2.0 * t * u, t * t]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub position: Vec3,
    pub uv: Vec2,
    pub normal: Vec3,
}

impl GridPoint {
    pub fn abs_diff_eq(&self, other: &GridPoint, epsilon: f32) -> bool {
        self.position.abs_diff_eq(other.position, epsilon)
            && self.uv.abs_diff_eq(other.uv, epsilon)
            && self.normal.abs_diff_eq(other.normal, epsilon)
    }
}

/// The tessellated surface of a patch, row-major.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchGrid {
    pub point_row_count: usize,
    pub point_column_count: usize,
    pub points: Vec<GridPoint>,
}

impl PatchGrid {
    pub fn point(&self, row: usize, column: usize) -> &GridPoint {
        &self.points[row * self.point_column_count + column]
    }

    pub fn quad_row_count(&self) -> usize {
        self.point_row_count.saturating_sub(1)
    }

    pub fn quad_column_count(&self) -> usize {
        self.point_column_count.saturating_sub(1)
    }

    /// Bounding box as `(min, max)`, or `None` for an empty grid.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.points.first()?.position;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (lo.min(p.position), hi.max(p.position))
        }))
    }
}

/// Tessellate a patch, splitting every surface side into
/// `2^subdivisions_per_surface` quads. Subdivisions above
/// `MAX_PATCH_SUBDIVISIONS` are clamped.
pub fn make_patch_grid(patch: &BezierPatch, subdivisions_per_surface: usize) -> PatchGrid {
    if subdivisions_per_surface > MAX_PATCH_SUBDIVISIONS {
        tracing::warn!(
            requested = subdivisions_per_surface,
            max = MAX_PATCH_SUBDIVISIONS,
            "clamping patch subdivisions"
        );
    }
    let quads_per_side = 1usize << subdivisions_per_surface.min(MAX_PATCH_SUBDIVISIONS);
    let surface_rows = patch.surface_row_count();
    let surface_columns = patch.surface_column_count();
    let rows = surface_rows * quads_per_side + 1;
    let columns = surface_columns * quads_per_side + 1;

    // Local parameter of a grid line inside its surface.
    let locate = |line: usize, surfaces: usize| {
        let surface = (line / quads_per_side).min(surfaces - 1);
        let local = (line - surface * quads_per_side) as f32 / quads_per_side as f32;
        (surface, local)
    };

    let mut points = Vec::with_capacity(rows * columns);
    for row in 0..rows {
        let (surface_row, s) = locate(row, surface_rows);
        for column in 0..columns {
            let (surface_column, t) = locate(column, surface_columns);
            let (position, uv) = patch.evaluate_surface(surface_row, surface_column, s, t);
            points.push(GridPoint {
                position,
                uv,
                normal: Vec3::ZERO,
            });
        }
    }

    let mut grid = PatchGrid {
        point_row_count: rows,
        point_column_count: columns,
        points,
    };
    let normals = compute_grid_normals(&grid);
    for (point, normal) in grid.points.iter_mut().zip(normals) {
        point.normal = normal;
    }
    grid
}

/// Average the normals of the quads around each grid point. Closed grids
/// (first and last row or column coincide) wrap around their seam.
fn compute_grid_normals(grid: &PatchGrid) -> Vec<Vec3> {
    let rows = grid.point_row_count;
    let columns = grid.point_column_count;
    let position = |r: usize, c: usize| grid.point(r, c).position;

    let rows_closed = rows > 2
        && (0..columns).all(|c| {
            position(0, c).abs_diff_eq(position(rows - 1, c), CLOSURE_EPSILON)
        });
    let columns_closed = columns > 2
        && (0..rows).all(|r| {
            position(r, 0).abs_diff_eq(position(r, columns - 1), CLOSURE_EPSILON)
        });

    let previous = |i: usize, n: usize, closed: bool| match i {
        0 if closed => Some(n - 2),
        0 => None,
        _ => Some(i - 1),
    };
    let next = |i: usize, n: usize, closed: bool| {
        if i + 1 < n {
            Some(i + 1)
        } else if closed {
            Some(1)
        } else {
            None
        }
    };

    let mut normals = Vec::with_capacity(grid.points.len());
    for r in 0..rows {
        for c in 0..columns {
            let center = position(r, c);
            let toward = |p: Option<(usize, usize)>| p.map(|(r, c)| position(r, c) - center);
            // Cyclic order: down, right, up, left.
            let dirs = [
                toward(next(r, rows, rows_closed).map(|r| (r, c))),
                toward(next(c, columns, columns_closed).map(|c| (r, c))),
                toward(previous(r, rows, rows_closed).map(|r| (r, c))),
                toward(previous(c, columns, columns_closed).map(|c| (r, c))),
            ];
            let mut sum = Vec3::ZERO;
            for i in 0..4 {
                if let (Some(a), Some(b)) = (dirs[i], dirs[(i + 1) % 4]) {
                    sum += a.cross(b).normalize_or_zero();
                }
            }
            normals.push(sum.normalize_or_zero());
        }
    }
    normals
}
