// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Face tessellation into flat triangle buffers
//!
//! Every face of a body is triangulated in its own plane and appended to
//! one [`Mesh`]. Vertices are emitted per face with the face normal, so
//! the output is flat-shaded and shared edges do not share mesh vertices.

use serde::{Deserialize, Serialize};

use nalgebra::Point3;

use crate::error::{KernelError, Result};
use crate::mesh::Mesh;
use crate::topo::{BodyId, FaceId, TopoModel};

/// Default angular deviation bound, radians (5 degrees).
pub const DEFAULT_ANGULAR_TOLERANCE: f64 = std::f64::consts::PI / 36.0;

/// Default chordal deviation bound, model units.
pub const DEFAULT_CHORD_TOLERANCE: f64 = 0.01;

/// Refinement bounds for tessellation.
///
/// Planar faces triangulate exactly, so neither bound influences the
/// output today. Both are validated anyway: callers with a bad
/// configuration should hear about it now, not when curved surface
/// support lands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TessellationOptions {
    /// Maximum angle between the surface normal and the facet normal.
    pub angular_tolerance: f64,
    /// Maximum distance between the surface and the facet.
    pub chord_tolerance: f64,
}

impl Default for TessellationOptions {
    fn default() -> Self {
        Self {
            angular_tolerance: DEFAULT_ANGULAR_TOLERANCE,
            chord_tolerance: DEFAULT_CHORD_TOLERANCE,
        }
    }
}

impl TessellationOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.angular_tolerance.is_finite() || self.angular_tolerance <= 0.0 {
            return Err(KernelError::InvalidParameter(format!(
                "angular tolerance must be positive and finite, got {}",
                self.angular_tolerance
            )));
        }
        if !self.chord_tolerance.is_finite() || self.chord_tolerance <= 0.0 {
            return Err(KernelError::InvalidParameter(format!(
                "chord tolerance must be positive and finite, got {}",
                self.chord_tolerance
            )));
        }
        Ok(())
    }
}

/// Tessellate every face of a body into one flat-shaded mesh.
///
/// The result satisfies the mesh contract: `positions` and `normals` are
/// parallel, `indices.len()` is a multiple of three, and every index is
/// in range. Triangles are wound counterclockwise when viewed from the
/// face normal side.
pub fn tessellate(model: &TopoModel, body: BodyId, options: &TessellationOptions) -> Result<Mesh> {
    options.validate()?;
    let faces = model.body_faces(body)?;

    let mut mesh = Mesh::with_capacity(faces.len() * 4, faces.len() * 2);
    for face in faces {
        let normal = model.face(face)?.plane.normal;
        let (points, triangles) = face_triangles(model, face)?;

        let base: Vec<u32> = points
            .into_iter()
            .map(|p| mesh.add_vertex(p, normal))
            .collect();
        for [a, b, c] in triangles {
            mesh.add_triangle(base[a], base[b], base[c]);
        }
    }
    Ok(mesh)
}

/// Triangulate one face in its own plane.
///
/// Returns the face's boundary points (outer loop first, then holes in
/// loop order) and triangles indexing into that list, wound
/// counterclockwise about the face normal. Also backs point-in-solid
/// classification and volume integration, which only need the triangles.
pub(crate) fn face_triangles(
    model: &TopoModel,
    face: FaceId,
) -> Result<(Vec<Point3<f64>>, Vec<[usize; 3]>)> {
    let plane = model.face(face)?.plane;
    let (u, v) = plane.basis();

    let loops = model.face_loops(face)?;
    let mut points = Vec::new();
    let mut flat = Vec::new();
    let mut hole_indices = Vec::new();
    for (i, loop_id) in loops.iter().enumerate() {
        if i > 0 {
            hole_indices.push(flat.len() / 2);
        }
        for p in model.loop_positions(*loop_id)? {
            let (x, y) = plane.project(&u, &v, &p);
            flat.push(x);
            flat.push(y);
            points.push(p);
        }
    }

    let mut triangles = if hole_indices.is_empty() {
        triangulate_simple(&flat)?
    } else {
        earcut(&flat, &hole_indices)?
    };
    orient_ccw(&flat, &mut triangles);
    Ok((points, triangles))
}

/// Triangulate a hole-free ring: direct for triangles, fan for small
/// convex rings, ear clipping otherwise.
fn triangulate_simple(flat: &[f64]) -> Result<Vec<[usize; 3]>> {
    let n = flat.len() / 2;
    if n == 3 {
        return Ok(vec![[0, 1, 2]]);
    }
    if n <= 8 && is_convex(flat) {
        return Ok((1..n - 1).map(|i| [0, i, i + 1]).collect());
    }
    earcut(flat, &[])
}

fn earcut(flat: &[f64], hole_indices: &[usize]) -> Result<Vec<[usize; 3]>> {
    let indices = earcutr::earcut(flat, hole_indices, 2)
        .map_err(|e| KernelError::DegenerateGeometry(format!("triangulation failed: {e:?}")))?;
    Ok(indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}

/// All cross products around the ring share a sign.
fn is_convex(flat: &[f64]) -> bool {
    let n = flat.len() / 2;
    let at = |i: usize| (flat[2 * (i % n)], flat[2 * (i % n) + 1]);
    let mut sign = 0i8;
    for i in 0..n {
        let (x0, y0) = at(i);
        let (x1, y1) = at(i + 1);
        let (x2, y2) = at(i + 2);
        let cross = (x1 - x0) * (y2 - y1) - (y1 - y0) * (x2 - x1);
        if cross.abs() > 1e-10 {
            let current = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current;
            } else if sign != current {
                return false;
            }
        }
    }
    true
}

/// Flip any clockwise triangle so all come out counterclockwise in the
/// projection, which is counterclockwise about the face normal.
fn orient_ccw(flat: &[f64], triangles: &mut [[usize; 3]]) {
    for tri in triangles.iter_mut() {
        let (ax, ay) = (flat[2 * tri[0]], flat[2 * tri[0] + 1]);
        let (bx, by) = (flat[2 * tri[1]], flat[2 * tri[1] + 1]);
        let (cx, cy) = (flat[2 * tri[2]], flat[2 * tri[2] + 1]);
        let doubled = (bx - ax) * (cy - ay) - (by - ay) * (cx - ax);
        if doubled < 0.0 {
            tri.swap(1, 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{create_box, BoxParams};
    use crate::tolerance::ToleranceContext;
    use nalgebra::Vector3;

    fn unit_frame(model: &mut TopoModel, half: f64, hole_half: f64) -> FaceId {
        let ring: Vec<_> = [
            (-half, -half),
            (half, -half),
            (half, half),
            (-half, half),
        ]
        .iter()
        .map(|&(x, y)| model.create_vertex(Point3::new(x, y, 0.0)).unwrap())
        .collect();
        let hole: Vec<_> = [
            (-hole_half, -hole_half),
            (hole_half, -hole_half),
            (hole_half, hole_half),
            (-hole_half, hole_half),
        ]
        .iter()
        .map(|&(x, y)| model.create_vertex(Point3::new(x, y, 0.0)).unwrap())
        .collect();
        model.create_face(&ring, &[hole]).unwrap()
    }

    #[test]
    fn test_box_tessellation_buffer_contract() {
        let mut model = TopoModel::new(ToleranceContext::default());
        let body = create_box(&mut model, &BoxParams::new(Point3::origin(), 2.0, 3.0, 4.0)).unwrap();
        let mesh = tessellate(&model, body, &TessellationOptions::default()).unwrap();

        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.positions.len(), mesh.normals.len());
        assert_eq!(mesh.indices.len() % 3, 0);
        let max = *mesh.indices.iter().max().unwrap() as usize;
        assert!(max < mesh.vertex_count());
    }

    #[test]
    fn test_box_tessellation_bounds_and_normals() {
        let mut model = TopoModel::new(ToleranceContext::default());
        let body = create_box(&mut model, &BoxParams::new(Point3::origin(), 2.0, 2.0, 2.0)).unwrap();
        let mesh = tessellate(&model, body, &TessellationOptions::default()).unwrap();

        let bounds = mesh.bounds();
        assert!((bounds.min.x - -1.0).abs() < 1e-6);
        assert!((bounds.max.z - 1.0).abs() < 1e-6);

        // Flat shading on a box: every normal is a unit axis vector.
        for chunk in mesh.normals.chunks_exact(3) {
            let n = Vector3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
            assert!((n.norm() - 1.0).abs() < 1e-5);
            let components = [n.x.abs(), n.y.abs(), n.z.abs()];
            let near_axis = components
                .iter()
                .filter(|c| (**c - 1.0).abs() < 1e-5)
                .count();
            assert_eq!(near_axis, 1);
        }
    }

    #[test]
    fn test_face_with_hole_triangulates_annulus_area() {
        let mut model = TopoModel::new(ToleranceContext::default());
        let face = unit_frame(&mut model, 2.0, 1.0);

        let (points, triangles) = face_triangles(&model, face).unwrap();
        assert_eq!(points.len(), 8);
        assert!(!triangles.is_empty());

        let mut area = 0.0;
        for [a, b, c] in &triangles {
            let (p0, p1, p2) = (points[*a], points[*b], points[*c]);
            area += ((p1 - p0).cross(&(p2 - p0))).norm() / 2.0;
        }
        // Outer 4x4 minus hole 2x2.
        assert!((area - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_triangles_wound_with_face_normal() {
        let mut model = TopoModel::new(ToleranceContext::default());
        let face = unit_frame(&mut model, 2.0, 1.0);
        let normal = model.face(face).unwrap().plane.normal;

        let (points, triangles) = face_triangles(&model, face).unwrap();
        for [a, b, c] in triangles {
            let (p0, p1, p2) = (points[a], points[b], points[c]);
            let cross = (p1 - p0).cross(&(p2 - p0));
            assert!(cross.dot(&normal) > 0.0);
        }
    }

    #[test]
    fn test_options_validation() {
        assert!(TessellationOptions::default().validate().is_ok());

        let zero_angle = TessellationOptions {
            angular_tolerance: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            zero_angle.validate(),
            Err(KernelError::InvalidParameter(_))
        ));

        let negative_chord = TessellationOptions {
            chord_tolerance: -0.5,
            ..Default::default()
        };
        assert!(negative_chord.validate().is_err());

        let nan_chord = TessellationOptions {
            chord_tolerance: f64::NAN,
            ..Default::default()
        };
        assert!(nan_chord.validate().is_err());
    }

    #[test]
    fn test_tessellate_rejects_bad_options() {
        let mut model = TopoModel::new(ToleranceContext::default());
        let body = create_box(&mut model, &BoxParams::cube(Point3::origin(), 1.0)).unwrap();
        let bad = TessellationOptions {
            angular_tolerance: -1.0,
            ..Default::default()
        };
        assert!(tessellate(&model, body, &bad).is_err());
    }

    #[test]
    fn test_tessellate_stale_body() {
        let mut model = TopoModel::new(ToleranceContext::default());
        let body = create_box(&mut model, &BoxParams::cube(Point3::origin(), 1.0)).unwrap();
        model.delete_body(body).unwrap();
        assert!(tessellate(&model, body, &TessellationOptions::default()).is_err());
    }
}
