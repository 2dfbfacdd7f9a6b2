// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Point-in-solid queries for fragment classification
//!
//! The splitter settles most fragments from the cross-section overlay
//! alone. Ray casting is the fallback for faces whose plane never meets
//! the other body, and for leftover fragments after tangent contact.

use nalgebra::{Point3, Vector3};

use crate::error::Result;
use crate::mesh::face_triangles;
use crate::topo::{BodyId, TopoModel};

/// Where a sample point sits relative to a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Classification {
    Inside,
    Outside,
    OnBoundary,
}

/// Classify one point against a body's surface and volume.
pub(crate) fn classify_point(
    model: &TopoModel,
    body: BodyId,
    point: &Point3<f64>,
) -> Result<Classification> {
    if point_on_surface(model, body, point)? {
        return Ok(Classification::OnBoundary);
    }
    if point_in_body(model, body, point)? {
        Ok(Classification::Inside)
    } else {
        Ok(Classification::Outside)
    }
}

/// Parity ray cast against every face triangle of the body.
///
/// The direction is skewed off all coordinate axes so axis-aligned
/// models cannot sit parallel or tangent to the ray.
pub(crate) fn point_in_body(
    model: &TopoModel,
    body: BodyId,
    point: &Point3<f64>,
) -> Result<bool> {
    let direction = Vector3::new(1.0, 0.8191, 0.6817);
    let mut crossings = 0usize;
    for face in model.body_faces(body)? {
        let (points, triangles) = face_triangles(model, face)?;
        for [a, b, c] in triangles {
            if ray_hits_triangle(point, &direction, &points[a], &points[b], &points[c]) {
                crossings += 1;
            }
        }
    }
    Ok(crossings % 2 == 1)
}

/// Point lies on some face of the body, within linear tolerance.
pub(crate) fn point_on_surface(
    model: &TopoModel,
    body: BodyId,
    point: &Point3<f64>,
) -> Result<bool> {
    let tol = model.tolerance();
    for face in model.body_faces(body)? {
        let plane = model.face(face)?.plane;
        if plane.signed_distance(point).abs() > tol.linear() {
            continue;
        }
        let (u, v) = plane.basis();
        let (px, py) = plane.project(&u, &v, point);

        // Even-odd across every ring of the face: holes cancel the outer.
        let mut inside = false;
        for loop_id in model.face_loops(face)? {
            let ring: Vec<(f64, f64)> = model
                .loop_positions(loop_id)?
                .iter()
                .map(|p| plane.project(&u, &v, p))
                .collect();
            if point_in_ring(px, py, &ring) {
                inside = !inside;
            }
        }
        if inside {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Crossing-number test against one ring.
fn point_in_ring(px: f64, py: f64, ring: &[(f64, f64)]) -> bool {
    let n = ring.len();
    let mut inside = false;
    for i in 0..n {
        let (x0, y0) = ring[i];
        let (x1, y1) = ring[(i + 1) % n];
        if (y0 > py) != (y1 > py) {
            let x_cross = x0 + (py - y0) / (y1 - y0) * (x1 - x0);
            if px < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Moller-Trumbore, counting forward hits only.
fn ray_hits_triangle(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
) -> bool {
    const EPS: f64 = 1e-9;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < EPS {
        return false;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    let t = f * edge2.dot(&q);
    t > EPS
}
