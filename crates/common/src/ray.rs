use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Tolerance used by the intersection tests.
pub const EPSILON: f32 = 1e-5;

/// A half-line in 3D space with a unit-length direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray3 {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray3 {
    /// Create a ray. The direction is normalized; a zero direction stays zero
    /// and the ray then hits nothing.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance along the ray to the first intersection with a sphere.
    ///
    /// A ray starting inside the sphere reports the exit point.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sqrt = disc.sqrt();
        let near = -b - sqrt;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + sqrt;
        (far >= 0.0).then_some(far)
    }

    /// Distance to a triangle, regardless of its winding (Möller-Trumbore).
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON * EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let t_vec = self.origin - a;
        let u = t_vec.dot(p) * inv_det;
        if !(-EPSILON..=1.0 + EPSILON).contains(&u) {
            return None;
        }
        let q = t_vec.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < -EPSILON || u + v > 1.0 + EPSILON {
            return None;
        }
        let distance = edge2.dot(q) * inv_det;
        (distance >= 0.0).then_some(distance)
    }

    /// Entry distance into an axis-aligned box (slab test).
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let o = self.origin[axis];
            let d = self.direction[axis];
            if d.abs() < EPSILON {
                if o < min[axis] - EPSILON || o > max[axis] + EPSILON {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (min[axis] - EPSILON - o) * inv;
            let mut t1 = (max[axis] + EPSILON - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Distance to the plane through `point` with the given `normal`.
    /// Rays parallel to the plane miss it.
    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<f32> {
        let denom = self.direction.dot(normal);
        if denom.abs() < EPSILON {
            return None;
        }
        let distance = (point - self.origin).dot(normal) / denom;
        (distance >= 0.0).then_some(distance)
    }
}

impl Default for Ray3 {
    /// A ray from the origin looking down the negative Z axis.
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_is_normalized() {
        let ray = Ray3::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(ray.direction, Vec3::NEG_Z);
        assert_eq!(ray.point_at(2.0), Vec3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn sphere_hit_and_miss() {
        let ray = Ray3::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let d = ray.intersect_sphere(Vec3::ZERO, 1.0).unwrap();
        assert!((d - 9.0).abs() < 1e-4);

        assert!(ray.intersect_sphere(Vec3::new(5.0, 0.0, 0.0), 1.0).is_none());
        assert!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 20.0), 1.0).is_none());
    }

    #[test]
    fn triangle_is_two_sided() {
        let (a, b, c) = (
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        );
        let down = Ray3::new(Vec3::new(0.5, 0.5, 1.0), Vec3::NEG_Z);
        let up = Ray3::new(Vec3::new(0.5, 0.5, -1.0), Vec3::Z);
        assert!((down.intersect_triangle(a, b, c).unwrap() - 1.0).abs() < 1e-5);
        assert!((up.intersect_triangle(a, b, c).unwrap() - 1.0).abs() < 1e-5);

        let away = Ray3::new(Vec3::new(0.5, 0.5, 1.0), Vec3::Z);
        assert!(away.intersect_triangle(a, b, c).is_none());
    }

    #[test]
    fn aabb_entry_distance() {
        let ray = Ray3::new(Vec3::new(0.5, 0.5, 5.0), Vec3::NEG_Z);
        let d = ray.intersect_aabb(Vec3::ZERO, Vec3::ONE).unwrap();
        assert!((d - 4.0).abs() < 1e-3);

        let miss = Ray3::new(Vec3::new(3.0, 0.5, 5.0), Vec3::NEG_Z);
        assert!(miss.intersect_aabb(Vec3::ZERO, Vec3::ONE).is_none());
    }

    #[test]
    fn aabb_flat_box_is_hit() {
        let ray = Ray3::new(Vec3::new(2.0, 2.0, 1.0), Vec3::NEG_Z);
        let d = ray
            .intersect_aabb(Vec3::ZERO, Vec3::new(4.0, 4.0, 0.0))
            .unwrap();
        assert!((d - 1.0).abs() < 1e-3);
    }

    #[test]
    fn plane_hit_and_parallel_miss() {
        let ray = Ray3::new(Vec3::new(1.0, 2.0, 8.0), Vec3::NEG_Z);
        let d = ray.intersect_plane(Vec3::ZERO, Vec3::Z).unwrap();
        assert!((d - 8.0).abs() < 1e-5);
        assert_eq!(ray.point_at(d), Vec3::new(1.0, 2.0, 0.0));

        let flat = Ray3::new(Vec3::new(0.0, 0.0, 1.0), Vec3::X);
        assert!(flat.intersect_plane(Vec3::ZERO, Vec3::Z).is_none());
        let behind = Ray3::new(Vec3::new(0.0, 0.0, 1.0), Vec3::Z);
        assert!(behind.intersect_plane(Vec3::ZERO, Vec3::Z).is_none());
    }
}
