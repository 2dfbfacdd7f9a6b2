// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planes and planar projection helpers

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::tolerance::ToleranceContext;

/// Oriented plane through `point` with unit `normal`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Plane {
    pub point: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Build a plane from a point and a direction. The direction is
    /// normalized; a near-zero direction is rejected.
    pub fn new(point: Point3<f64>, direction: Vector3<f64>) -> Result<Self> {
        let norm = direction.norm();
        if norm < 1e-12 {
            return Err(KernelError::DegenerateGeometry(
                "plane normal has near-zero length".into(),
            ));
        }
        Ok(Self {
            point,
            normal: direction / norm,
        })
    }

    /// Fit a plane to a polygon ring using Newell's method. The normal
    /// follows the right-hand rule for the ring's winding. Fails for rings
    /// with fewer than 3 points or collinear/degenerate rings.
    pub fn from_points(points: &[Point3<f64>]) -> Result<Self> {
        if points.len() < 3 {
            return Err(KernelError::DegenerateGeometry(format!(
                "plane fit needs at least 3 points, got {}",
                points.len()
            )));
        }

        let normal = newell_normal(points);
        let mut centroid = Vector3::zeros();
        for p in points {
            centroid += p.coords;
        }
        centroid /= points.len() as f64;

        Self::new(Point3::from(centroid), normal)
    }

    /// Signed distance from a point to the plane; positive on the normal side.
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&(p - self.point))
    }

    /// True if the point lies on the plane within the linear tolerance.
    pub fn contains_point(&self, p: &Point3<f64>, tol: &ToleranceContext) -> bool {
        tol.is_zero(self.signed_distance(p))
    }

    pub fn is_parallel_to(&self, other: &Plane, tol: &ToleranceContext) -> bool {
        tol.parallel(&self.normal, &other.normal)
    }

    /// True if the planes are parallel and coincident within tolerance.
    pub fn is_coplanar_with(&self, other: &Plane, tol: &ToleranceContext) -> bool {
        self.is_parallel_to(other, tol) && tol.is_zero(self.signed_distance(&other.point))
    }

    /// Same plane with the normal reversed.
    pub fn flipped(&self) -> Plane {
        Plane {
            point: self.point,
            normal: -self.normal,
        }
    }

    /// Orthonormal in-plane basis `(u, v)` with `u × v == normal`, so a ring
    /// that is counter-clockwise about the normal has positive signed area in
    /// `(u, v)` coordinates.
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>) {
        // Reference axis least parallel to the normal keeps the cross stable
        let abs = self.normal.map(f64::abs);
        let reference = if abs.x <= abs.y && abs.x <= abs.z {
            Vector3::new(1.0, 0.0, 0.0)
        } else if abs.y <= abs.z {
            Vector3::new(0.0, 1.0, 0.0)
        } else {
            Vector3::new(0.0, 0.0, 1.0)
        };

        let v = self.normal.cross(&reference).normalize();
        let u = v.cross(&self.normal).normalize();
        (u, v)
    }

    /// Project a point into the `(u, v)` basis returned by [`Plane::basis`].
    pub fn project(&self, u: &Vector3<f64>, v: &Vector3<f64>, p: &Point3<f64>) -> (f64, f64) {
        let d = p - self.point;
        (d.dot(u), d.dot(v))
    }
}

/// Newell's method: raw (unnormalized) polygon normal for an arbitrary,
/// possibly non-convex, planar ring.
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    for i in 0..points.len() {
        let p = &points[i];
        let q = &points[(i + 1) % points.len()];
        normal.x += (p.y - q.y) * (p.z + q.z);
        normal.y += (p.z - q.z) * (p.x + q.x);
        normal.z += (p.x - q.x) * (p.y + q.y);
    }
    normal
}

/// Signed area of a 2D ring; positive for counter-clockwise winding.
pub fn signed_area_2d(ring: &[(f64, f64)]) -> f64 {
    let mut area = 0.0;
    for i in 0..ring.len() {
        let (x0, y0) = ring[i];
        let (x1, y1) = ring[(i + 1) % ring.len()];
        area += x0 * y1 - x1 * y0;
    }
    area / 2.0
}

/// True if any two non-adjacent edges of a closed 2D ring cross or pass
/// within `eps` of touching. Edges that share a ring vertex are skipped, so
/// a simple (possibly concave) ring reports false. A figure-eight ring can
/// carry a non-zero signed area, so a winding check alone does not catch it.
pub fn ring_self_intersects(ring: &[(f64, f64)], eps: f64) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        for j in (i + 2)..n {
            // The wrap-around edge is adjacent to the first one
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            let (c, d) = (ring[j], ring[(j + 1) % n]);
            if segments_touch(a, b, c, d, eps) {
                return true;
            }
        }
    }
    false
}

/// Signed distance from `p` to the line through `a` and `b`, in the same
/// units as the inputs. A zero-length edge degrades to point distance.
fn line_side(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    let (ex, ey) = (b.0 - a.0, b.1 - a.1);
    let len = (ex * ex + ey * ey).sqrt();
    if len < f64::EPSILON {
        return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
    }
    (ex * (p.1 - a.1) - ey * (p.0 - a.0)) / len
}

/// True if `p` falls inside the axis-aligned span of segment `ab`, padded
/// by `eps` on every side.
fn within_span(a: (f64, f64), b: (f64, f64), p: (f64, f64), eps: f64) -> bool {
    p.0 >= a.0.min(b.0) - eps
        && p.0 <= a.0.max(b.0) + eps
        && p.1 >= a.1.min(b.1) - eps
        && p.1 <= a.1.max(b.1) + eps
}

/// Segment intersection with an `eps` contact band: a proper crossing
/// counts, and so does an endpoint resting on the other segment.
fn segments_touch(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64), eps: f64) -> bool {
    let d1 = line_side(c, d, a);
    let d2 = line_side(c, d, b);
    let d3 = line_side(a, b, c);
    let d4 = line_side(a, b, d);

    if ((d1 > eps && d2 < -eps) || (d1 < -eps && d2 > eps))
        && ((d3 > eps && d4 < -eps) || (d3 < -eps && d4 > eps))
    {
        return true;
    }

    (d1.abs() <= eps && within_span(c, d, a, eps))
        || (d2.abs() <= eps && within_span(c, d, b, eps))
        || (d3.abs() <= eps && within_span(a, b, c, eps))
        || (d4.abs() <= eps && within_span(a, b, d, eps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_from_square() {
        // CCW square in the XY plane, normal should be +Z
        let points = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(2.0, 2.0, 1.0),
            Point3::new(0.0, 2.0, 1.0),
        ];
        let plane = Plane::from_points(&points).unwrap();
        assert_relative_eq!(plane.normal.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(plane.signed_distance(&Point3::new(1.0, 1.0, 3.0)), 2.0);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let collinear = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(Plane::from_points(&collinear).is_err());
        assert!(Plane::from_points(&collinear[..2]).is_err());
    }

    #[test]
    fn test_basis_handedness() {
        let plane = Plane::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0)).unwrap();
        let (u, v) = plane.basis();
        let cross = u.cross(&v);
        assert_relative_eq!(cross.dot(&plane.normal), 1.0, epsilon = 1e-12);

        // CCW ring about +Z projects to positive area
        let ring = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let projected: Vec<(f64, f64)> = ring.iter().map(|p| plane.project(&u, &v, p)).collect();
        assert!(signed_area_2d(&projected) > 0.0);
    }

    #[test]
    fn test_coplanar_planes() {
        let tol = ToleranceContext::default();
        let a = Plane::new(Point3::new(0.0, 0.0, 5.0), Vector3::z()).unwrap();
        let b = Plane::new(Point3::new(7.0, -3.0, 5.0), -Vector3::z()).unwrap();
        let c = Plane::new(Point3::new(0.0, 0.0, 6.0), Vector3::z()).unwrap();
        assert!(a.is_coplanar_with(&b, &tol));
        assert!(!a.is_coplanar_with(&c, &tol));
    }

    #[test]
    fn test_ring_self_intersection() {
        let eps = 1e-9;

        // Figure-eight: edges (3,0)-(0,1) and (1,1)-(0,0) cross even though
        // the ring's signed area is a healthy +1.
        let bowtie = [(0.0, 0.0), (3.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        assert_relative_eq!(signed_area_2d(&bowtie), 1.0);
        assert!(ring_self_intersects(&bowtie, eps));

        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!(!ring_self_intersects(&square, eps));

        // Concave rings are fine as long as no edges meet
        let ell = [
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ];
        assert!(!ring_self_intersects(&ell, eps));
    }

    #[test]
    fn test_ring_contact_within_eps() {
        // The valley vertex hangs 1e-7 above the bottom edge: a touch at
        // eps = 1e-6, clear separation at eps = 1e-9.
        let pinched = [
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 2.0),
            (2.0, 1e-7),
            (0.0, 2.0),
        ];
        assert!(ring_self_intersects(&pinched, 1e-6));
        assert!(!ring_self_intersects(&pinched, 1e-9));
    }
}
