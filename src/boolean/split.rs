// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Face splitting against another body's boundary
//!
//! A face is partitioned in its own plane with 2D boolean clipping. The
//! other body contributes two kinds of clip region on that plane: the
//! cross-section of its volume, which separates inside from outside, and
//! its coplanar faces, which mark where the two boundaries coincide.
//! Only when both are empty does classification fall back to ray casting
//! a sample point.

use ahash::AHashMap;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::{Point3, Vector3};

use crate::boolean::classify::{classify_point, Classification};
use crate::error::Result;
use crate::geometry::Plane;
use crate::tolerance::ToleranceContext;
use crate::topo::{BodyId, FaceId, TopoModel};

/// Closed 2D ring in a face plane's (u, v) basis.
pub(crate) type Contour = Vec<[f64; 2]>;

/// One piece of a split face: an outer ring plus holes.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub outer: Contour,
    pub holes: Vec<Contour>,
}

/// A face partitioned by the other body's boundary, every fragment in
/// the face's own plane basis.
#[derive(Debug, Default)]
pub(crate) struct SplitFace {
    pub outside: Vec<Fragment>,
    pub inside: Vec<Fragment>,
    /// Coincident with the other boundary, normals aligned.
    pub on_same: Vec<Fragment>,
    /// Coincident with the other boundary, normals opposed.
    pub on_anti: Vec<Fragment>,
}

/// Split one face by the boundary of `other`.
///
/// The coincident regions are carved out first, then the cross-section
/// separates what remains. The clip regions overlap each other in
/// tangent configurations, so each runs as its own overlay pass against
/// the shrinking remainder rather than as one combined clip.
pub(crate) fn split_face(model: &TopoModel, face: FaceId, other: BodyId) -> Result<SplitFace> {
    let tol = model.tolerance();
    let plane = model.face(face)?.plane;
    let (u, v) = plane.basis();
    // Sliver floor in squared units; fragments are measured by area.
    let area_eps = tol.linear() * tol.linear();

    let subject = face_plane_paths(model, face, &plane, &u, &v)?;
    let whole = Fragment {
        outer: subject[0].clone(),
        holes: subject[1..].to_vec(),
    };

    let (same, anti) = coplanar_regions(model, other, &plane, &u, &v)?;
    let section = cross_section(model, other, &plane, &u, &v)?;

    let mut split = SplitFace::default();
    if same.is_empty() && anti.is_empty() && section.is_empty() {
        // The plane misses the other body entirely; one interior sample
        // settles which side the whole face is on.
        tracing::debug!(%face, "plane misses other body, classifying by sample");
        match sample_classification(model, other, &plane, &u, &v, &whole)? {
            Classification::Inside => split.inside.push(whole),
            _ => split.outside.push(whole),
        }
        return Ok(split);
    }

    let mut remainder = vec![whole];
    if !same.is_empty() {
        split.on_same = clip_fragments(&remainder, &same, OverlayRule::Intersect, area_eps);
        remainder = clip_fragments(&remainder, &same, OverlayRule::Difference, area_eps);
    }
    if !anti.is_empty() {
        split.on_anti = clip_fragments(&remainder, &anti, OverlayRule::Intersect, area_eps);
        remainder = clip_fragments(&remainder, &anti, OverlayRule::Difference, area_eps);
    }

    if section.is_empty() {
        // Tangent contact only: what remains never crosses the other
        // boundary, so each piece is wholly on one side.
        for fragment in remainder {
            match sample_classification(model, other, &plane, &u, &v, &fragment)? {
                Classification::Inside => split.inside.push(fragment),
                _ => split.outside.push(fragment),
            }
        }
    } else {
        split.inside = clip_fragments(&remainder, &section, OverlayRule::Intersect, area_eps);
        split.outside = clip_fragments(&remainder, &section, OverlayRule::Difference, area_eps);
    }
    Ok(split)
}

/// All rings of a face projected into a plane frame, outer ring first.
fn face_plane_paths(
    model: &TopoModel,
    face: FaceId,
    frame: &Plane,
    u: &Vector3<f64>,
    v: &Vector3<f64>,
) -> Result<Vec<Contour>> {
    let mut paths = Vec::new();
    for loop_id in model.face_loops(face)? {
        let path: Contour = model
            .loop_positions(loop_id)?
            .iter()
            .map(|p| {
                let (x, y) = frame.project(u, v, p);
                [x, y]
            })
            .collect();
        paths.push(path);
    }
    Ok(paths)
}

/// Faces of `other` lying in the cut plane, keyed by whether their
/// normal agrees with the cut normal. Distinct coplanar faces of one
/// valid body never overlap, so each group is safe as a single even-odd
/// clip set.
fn coplanar_regions(
    model: &TopoModel,
    other: BodyId,
    cut: &Plane,
    u: &Vector3<f64>,
    v: &Vector3<f64>,
) -> Result<(Vec<Contour>, Vec<Contour>)> {
    let tol = model.tolerance();
    let mut same = Vec::new();
    let mut anti = Vec::new();
    for face in model.body_faces(other)? {
        let plane = model.face(face)?.plane;
        if !plane.is_coplanar_with(cut, &tol) {
            continue;
        }
        let paths = face_plane_paths(model, face, cut, u, v)?;
        if plane.normal.dot(&cut.normal) > 0.0 {
            same.extend(paths);
        } else {
            anti.extend(paths);
        }
    }
    Ok((same, anti))
}

/// Cross-section of a body's boundary by a plane, as closed 2D contours
/// in the plane's (u, v) basis.
///
/// Each non-parallel face contributes the chords where it crosses the
/// plane; chords are then chained end to end into rings. Open chains
/// mean the boundary is not closed around the plane and are dropped.
pub(crate) fn cross_section(
    model: &TopoModel,
    body: BodyId,
    cut: &Plane,
    u: &Vector3<f64>,
    v: &Vector3<f64>,
) -> Result<Vec<Contour>> {
    let tol = model.tolerance();
    let mut segments = Vec::new();
    for face in model.body_faces(body)? {
        face_section_segments(model, face, cut, &tol, &mut segments)?;
    }

    let mut contours = Vec::new();
    for ring in chain_rings(&segments, &tol) {
        let path: Contour = ring
            .iter()
            .map(|p| {
                let (x, y) = cut.project(u, v, p);
                [x, y]
            })
            .collect();
        if !tol.is_zero_area(contour_area(&path)) {
            contours.push(path);
        }
    }
    Ok(contours)
}

/// Chords of one face crossing the cut plane, appended to `out`.
///
/// Vertex distances within tolerance of the plane snap to zero. An edge
/// crosses when exactly one endpoint is strictly below, which counts
/// edges through snapped vertices exactly once. Crossings sorted along
/// the intersection line pair up even-odd into chords.
fn face_section_segments(
    model: &TopoModel,
    face: FaceId,
    cut: &Plane,
    tol: &ToleranceContext,
    out: &mut Vec<(Point3<f64>, Point3<f64>)>,
) -> Result<()> {
    let plane = model.face(face)?.plane;
    if plane.is_parallel_to(cut, tol) {
        return Ok(());
    }
    let line_dir = plane.normal.cross(&cut.normal);

    let mut crossings: Vec<(f64, Point3<f64>)> = Vec::new();
    for loop_id in model.face_loops(face)? {
        let points = model.loop_positions(loop_id)?;
        let snapped: Vec<f64> = points
            .iter()
            .map(|p| {
                let d = cut.signed_distance(p);
                if d.abs() < tol.linear() {
                    0.0
                } else {
                    d
                }
            })
            .collect();

        let n = points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let (di, dj) = (snapped[i], snapped[j]);
            if (di < 0.0) == (dj < 0.0) {
                continue;
            }
            let point = if di == 0.0 {
                points[i]
            } else if dj == 0.0 {
                points[j]
            } else {
                points[i] + (points[j] - points[i]) * (di / (di - dj))
            };
            crossings.push((line_dir.dot(&point.coords), point));
        }
    }

    crossings.sort_by(|a, b| a.0.total_cmp(&b.0));
    if crossings.len() % 2 == 1 {
        tracing::warn!(%face, "odd crossing count while sectioning, dropping last");
        crossings.pop();
    }
    for pair in crossings.chunks_exact(2) {
        let (a, b) = (pair[0].1, pair[1].1);
        if (b - a).norm() >= tol.linear() {
            out.push((a, b));
        }
    }
    Ok(())
}

/// Chain chords into closed rings by welding endpoints on a tolerance
/// grid. Duplicate chords collapse into two-node rings and fall out;
/// chains that never close are discarded with a warning.
fn chain_rings(
    segments: &[(Point3<f64>, Point3<f64>)],
    tol: &ToleranceContext,
) -> Vec<Vec<Point3<f64>>> {
    let mut welder = EndpointWelder::new(*tol);
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(segments.len());
    for (a, b) in segments {
        let (na, nb) = (welder.node(a), welder.node(b));
        if na != nb {
            edges.push((na, nb));
        }
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); welder.nodes.len()];
    for (i, (a, b)) in edges.iter().enumerate() {
        adjacency[*a].push(i);
        adjacency[*b].push(i);
    }

    let mut rings = Vec::new();
    let mut used = vec![false; edges.len()];
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (first, mut current) = edges[start];
        let mut ring = vec![first];
        let closed = loop {
            if current == first {
                break true;
            }
            ring.push(current);
            let Some(&next) = adjacency[current].iter().find(|&&e| !used[e]) else {
                break false;
            };
            used[next] = true;
            let (a, b) = edges[next];
            current = if a == current { b } else { a };
        };
        if !closed {
            tracing::warn!(nodes = ring.len(), "open section chain discarded");
            continue;
        }
        if ring.len() >= 3 {
            rings.push(ring.into_iter().map(|id| welder.nodes[id]).collect());
        }
    }
    rings
}

/// Tolerance-pitch spatial hash for chord endpoints, searched across the
/// 27 neighboring cells so near-boundary points still merge.
struct EndpointWelder {
    tol: ToleranceContext,
    nodes: Vec<Point3<f64>>,
    grid: AHashMap<(i64, i64, i64), Vec<usize>>,
}

impl EndpointWelder {
    fn new(tol: ToleranceContext) -> Self {
        Self {
            tol,
            nodes: Vec::new(),
            grid: AHashMap::new(),
        }
    }

    fn cell(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        let pitch = self.tol.linear();
        (
            (p.x / pitch).floor() as i64,
            (p.y / pitch).floor() as i64,
            (p.z / pitch).floor() as i64,
        )
    }

    fn node(&mut self, p: &Point3<f64>) -> usize {
        let (cx, cy, cz) = self.cell(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(ids) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &id in ids {
                        if self.tol.points_equal(&self.nodes[id], p) {
                            return id;
                        }
                    }
                }
            }
        }
        let id = self.nodes.len();
        self.nodes.push(*p);
        self.grid.entry((cx, cy, cz)).or_default().push(id);
        id
    }
}

/// Run one overlay pass of `clip` against fragment paths, returning the
/// surviving fragments with slivers below `area_eps` filtered out.
fn clip_fragments(
    subject: &[Fragment],
    clip: &[Contour],
    rule: OverlayRule,
    area_eps: f64,
) -> Vec<Fragment> {
    let mut subject_paths: Vec<Contour> = Vec::new();
    for fragment in subject {
        subject_paths.push(fragment.outer.clone());
        subject_paths.extend(fragment.holes.iter().cloned());
    }
    if subject_paths.is_empty() {
        return Vec::new();
    }
    let clip: Vec<Contour> = clip.to_vec();

    // Shapes come back as contour lists with the outer ring first.
    let shapes = subject_paths.overlay(&clip, rule, FillRule::EvenOdd);
    let mut fragments = Vec::new();
    for shape in shapes {
        let mut rings = shape.into_iter();
        let Some(outer) = rings.next() else {
            continue;
        };
        if contour_area(&outer).abs() < area_eps {
            continue;
        }
        let holes = rings
            .filter(|hole| contour_area(hole).abs() >= area_eps)
            .collect();
        fragments.push(Fragment { outer, holes });
    }
    fragments
}

/// Classify a fragment by one interior sample point. The centroid of the
/// largest triangle is strictly interior even for ring-shaped fragments
/// whose vertex average falls in a hole.
fn sample_classification(
    model: &TopoModel,
    other: BodyId,
    plane: &Plane,
    u: &Vector3<f64>,
    v: &Vector3<f64>,
    fragment: &Fragment,
) -> Result<Classification> {
    match fragment_interior_point(fragment) {
        Some((x, y)) => classify_point(model, other, &lift(plane, u, v, x, y)),
        None => {
            tracing::debug!("fragment with no interior sample treated as outside");
            Ok(Classification::Outside)
        }
    }
}

fn fragment_interior_point(fragment: &Fragment) -> Option<(f64, f64)> {
    let mut flat = Vec::new();
    let mut hole_indices = Vec::new();
    for p in &fragment.outer {
        flat.push(p[0]);
        flat.push(p[1]);
    }
    for hole in &fragment.holes {
        hole_indices.push(flat.len() / 2);
        for p in hole {
            flat.push(p[0]);
            flat.push(p[1]);
        }
    }

    let triangles = earcutr::earcut(&flat, &hole_indices, 2).ok()?;
    let mut best: Option<((f64, f64), f64)> = None;
    for tri in triangles.chunks_exact(3) {
        let (ax, ay) = (flat[2 * tri[0]], flat[2 * tri[0] + 1]);
        let (bx, by) = (flat[2 * tri[1]], flat[2 * tri[1] + 1]);
        let (cx, cy) = (flat[2 * tri[2]], flat[2 * tri[2] + 1]);
        let area = ((bx - ax) * (cy - ay) - (by - ay) * (cx - ax)).abs();
        if best.map_or(true, |(_, largest)| area > largest) {
            best = Some((((ax + bx + cx) / 3.0, (ay + by + cy) / 3.0), area));
        }
    }
    best.map(|(centroid, _)| centroid)
}

/// Map plane coordinates back to a 3D point.
pub(crate) fn lift(
    plane: &Plane,
    u: &Vector3<f64>,
    v: &Vector3<f64>,
    x: f64,
    y: f64,
) -> Point3<f64> {
    plane.point + u * x + v * y
}

/// Signed ring area, positive for counterclockwise order.
pub(crate) fn contour_area(path: &[[f64; 2]]) -> f64 {
    let n = path.len();
    if n < 3 {
        return 0.0;
    }
    let mut doubled = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        doubled += path[i][0] * path[j][1] - path[j][0] * path[i][1];
    }
    doubled * 0.5
}
