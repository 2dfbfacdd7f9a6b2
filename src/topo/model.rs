// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! The topological model: arena ownership, graph mutation, traversal
//!
//! All entities live in flat arenas owned by one `TopoModel`; relationships
//! are typed indices. Mutating methods validate their inputs completely
//! before touching the arenas, so a failed call leaves the model unchanged.
//! Deleted slots become tombstones and are never reused within a model's
//! lifetime, so stale handles surface as `Topology` errors instead of
//! silently aliasing newer entities.

use ahash::{AHashMap, AHashSet};
use nalgebra::Point3;

use super::entities::{Body, Face, HalfEdge, Loop, Shell, Vertex};
use super::handles::{BodyId, FaceId, HalfEdgeId, LoopId, ShellId, VertexId};
use crate::error::{KernelError, Result};
use crate::geometry::{ring_self_intersects, signed_area_2d, BoundingBox, Plane};
use crate::tolerance::ToleranceContext;

/// Traversal step cap. A loop longer than this means a corrupted `next`
/// chain, not a real boundary.
pub const MAX_LOOP_STEPS: usize = 10_000;

/// Owner of all topology entities for one model.
pub struct TopoModel {
    tolerance: ToleranceContext,
    vertices: Vec<Option<Vertex>>,
    half_edges: Vec<Option<HalfEdge>>,
    loops: Vec<Option<Loop>>,
    faces: Vec<Option<Face>>,
    shells: Vec<Option<Shell>>,
    bodies: Vec<Option<Body>>,
    /// Spatial hash for vertex welding: grid cell (at linear-tolerance pitch)
    /// to the vertices whose position falls in that cell.
    weld_grid: AHashMap<(i64, i64, i64), Vec<VertexId>>,
}

impl Default for TopoModel {
    fn default() -> Self {
        Self::new(ToleranceContext::default())
    }
}

impl TopoModel {
    pub fn new(tolerance: ToleranceContext) -> Self {
        Self {
            tolerance,
            vertices: Vec::new(),
            half_edges: Vec::new(),
            loops: Vec::new(),
            faces: Vec::new(),
            shells: Vec::new(),
            bodies: Vec::new(),
            weld_grid: AHashMap::new(),
        }
    }

    pub fn tolerance(&self) -> ToleranceContext {
        self.tolerance
    }

    // ------------------------------------------------------------------
    // Entity accessors
    // ------------------------------------------------------------------

    pub fn vertex(&self, id: VertexId) -> Result<&Vertex> {
        self.vertices
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| KernelError::Topology(format!("stale or unknown vertex {id}")))
    }

    pub fn half_edge(&self, id: HalfEdgeId) -> Result<&HalfEdge> {
        self.half_edges
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| KernelError::Topology(format!("stale or unknown half-edge {id}")))
    }

    fn half_edge_mut(&mut self, id: HalfEdgeId) -> Result<&mut HalfEdge> {
        self.half_edges
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| KernelError::Topology(format!("stale or unknown half-edge {id}")))
    }

    fn loop_rec(&self, id: LoopId) -> Result<&Loop> {
        self.loops
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| KernelError::Topology(format!("stale or unknown loop {id}")))
    }

    pub fn face(&self, id: FaceId) -> Result<&Face> {
        self.faces
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| KernelError::Topology(format!("stale or unknown face {id}")))
    }

    fn face_mut(&mut self, id: FaceId) -> Result<&mut Face> {
        self.faces
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| KernelError::Topology(format!("stale or unknown face {id}")))
    }

    pub fn shell(&self, id: ShellId) -> Result<&Shell> {
        self.shells
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| KernelError::Topology(format!("stale or unknown shell {id}")))
    }

    fn shell_mut(&mut self, id: ShellId) -> Result<&mut Shell> {
        self.shells
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| KernelError::Topology(format!("stale or unknown shell {id}")))
    }

    pub fn body(&self, id: BodyId) -> Result<&Body> {
        self.bodies
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| KernelError::Topology(format!("stale or unknown body {id}")))
    }

    // ------------------------------------------------------------------
    // Vertices
    // ------------------------------------------------------------------

    /// Create a vertex, welding to an existing one within the linear
    /// tolerance instead of storing a duplicate.
    pub fn create_vertex(&mut self, position: Point3<f64>) -> Result<VertexId> {
        if !position.coords.iter().all(|c| c.is_finite()) {
            return Err(KernelError::InvalidParameter(format!(
                "vertex position must be finite, got ({}, {}, {})",
                position.x, position.y, position.z
            )));
        }

        if let Some(existing) = self.find_welded(&position) {
            return Ok(existing);
        }

        let id = VertexId(self.vertices.len());
        let cell = self.weld_cell(&position);
        self.vertices.push(Some(Vertex { position }));
        self.weld_grid.entry(cell).or_default().push(id);
        Ok(id)
    }

    pub fn vertex_position(&self, id: VertexId) -> Result<Point3<f64>> {
        Ok(self.vertex(id)?.position)
    }

    fn weld_cell(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        let pitch = self.tolerance.linear();
        (
            (p.x / pitch).floor() as i64,
            (p.y / pitch).floor() as i64,
            (p.z / pitch).floor() as i64,
        )
    }

    fn find_welded(&self, p: &Point3<f64>) -> Option<VertexId> {
        // A match can sit in any of the 27 neighboring cells when the point
        // lies near a cell border.
        let (cx, cy, cz) = self.weld_cell(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(cell) = self.weld_grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &candidate in cell {
                        if let Some(v) = self.vertices[candidate.0].as_ref() {
                            if self.tolerance.points_equal(&v.position, p) {
                                return Some(candidate);
                            }
                        }
                    }
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Faces
    // ------------------------------------------------------------------

    /// Build a face from an outer vertex ring and optional hole rings.
    ///
    /// Half-edges and loops are created and linked; the face's plane follows
    /// the outer ring's winding (right-hand rule). Hole rings are stored
    /// wound clockwise about that normal regardless of input order. The face
    /// starts unattached; the caller adds it to a shell.
    pub fn create_face(&mut self, outer: &[VertexId], holes: &[Vec<VertexId>]) -> Result<FaceId> {
        // Validate everything up front; arena pushes below cannot fail.
        let outer_ring = self.sanitize_ring(outer)?;
        let outer_positions = self.ring_positions(&outer_ring)?;

        let plane = Plane::from_points(&outer_positions)?;
        for p in &outer_positions {
            if !plane.contains_point(p, &self.tolerance) {
                return Err(KernelError::DegenerateGeometry(
                    "outer loop is not planar within tolerance".into(),
                ));
            }
        }

        let (u, v) = plane.basis();
        let projected_outer: Vec<(f64, f64)> = outer_positions
            .iter()
            .map(|p| plane.project(&u, &v, p))
            .collect();
        if ring_self_intersects(&projected_outer, self.tolerance.linear()) {
            return Err(KernelError::DegenerateGeometry(
                "outer loop self-intersects".into(),
            ));
        }

        let mut hole_rings = Vec::with_capacity(holes.len());
        for hole in holes {
            let ring = self.sanitize_ring(hole)?;
            let positions = self.ring_positions(&ring)?;
            for p in &positions {
                if !plane.contains_point(p, &self.tolerance) {
                    return Err(KernelError::DegenerateGeometry(
                        "hole loop is not coplanar with the outer loop".into(),
                    ));
                }
            }
            let projected: Vec<(f64, f64)> =
                positions.iter().map(|p| plane.project(&u, &v, p)).collect();
            if ring_self_intersects(&projected, self.tolerance.linear()) {
                return Err(KernelError::DegenerateGeometry(
                    "hole loop self-intersects".into(),
                ));
            }
            let area = signed_area_2d(&projected);
            if self.tolerance.is_zero_area(area) {
                return Err(KernelError::DegenerateGeometry(
                    "hole loop has near-zero area".into(),
                ));
            }
            // Holes wind clockwise about the outer normal
            let ring = if area > 0.0 {
                ring.into_iter().rev().collect()
            } else {
                ring
            };
            hole_rings.push(ring);
        }

        let face_id = FaceId(self.faces.len());
        let outer_loop = self.push_loop(&outer_ring, face_id);
        let hole_loops = hole_rings
            .iter()
            .map(|ring| self.push_loop(ring, face_id))
            .collect();

        self.faces.push(Some(Face {
            outer: outer_loop,
            holes: hole_loops,
            plane,
            shell: None,
        }));
        Ok(face_id)
    }

    /// Drop consecutive duplicate vertices (welding can collapse neighbors)
    /// and reject rings that are too small or self-referencing.
    fn sanitize_ring(&self, ring: &[VertexId]) -> Result<Vec<VertexId>> {
        let mut cleaned: Vec<VertexId> = Vec::with_capacity(ring.len());
        for &v in ring {
            self.vertex(v)?;
            if cleaned.last() != Some(&v) {
                cleaned.push(v);
            }
        }
        while cleaned.len() > 1 && cleaned.first() == cleaned.last() {
            cleaned.pop();
        }

        if cleaned.len() < 3 {
            return Err(KernelError::DegenerateGeometry(format!(
                "loop needs at least 3 distinct vertices, got {}",
                cleaned.len()
            )));
        }
        let distinct: AHashSet<VertexId> = cleaned.iter().copied().collect();
        if distinct.len() != cleaned.len() {
            return Err(KernelError::DegenerateGeometry(
                "loop visits a vertex more than once".into(),
            ));
        }
        Ok(cleaned)
    }

    fn ring_positions(&self, ring: &[VertexId]) -> Result<Vec<Point3<f64>>> {
        ring.iter().map(|&v| self.vertex_position(v)).collect()
    }

    /// Push a pre-validated ring as a loop of linked half-edges.
    fn push_loop(&mut self, ring: &[VertexId], face: FaceId) -> LoopId {
        let n = ring.len();
        let base = self.half_edges.len();
        let loop_id = LoopId(self.loops.len());

        for (i, &start) in ring.iter().enumerate() {
            self.half_edges.push(Some(HalfEdge {
                start,
                twin: None,
                next: HalfEdgeId(base + (i + 1) % n),
                prev: HalfEdgeId(base + (i + n - 1) % n),
                loop_id,
            }));
        }

        self.loops.push(Some(Loop {
            first: HalfEdgeId(base),
            half_edge_count: n,
            face,
        }));
        loop_id
    }

    // ------------------------------------------------------------------
    // Half-edges
    // ------------------------------------------------------------------

    pub fn half_edge_start_vertex(&self, id: HalfEdgeId) -> Result<VertexId> {
        Ok(self.half_edge(id)?.start)
    }

    pub fn half_edge_end_vertex(&self, id: HalfEdgeId) -> Result<VertexId> {
        let next = self.half_edge(id)?.next;
        Ok(self.half_edge(next)?.start)
    }

    pub fn half_edge_twin(&self, id: HalfEdgeId) -> Result<Option<HalfEdgeId>> {
        Ok(self.half_edge(id)?.twin)
    }

    pub fn half_edge_loop(&self, id: HalfEdgeId) -> Result<LoopId> {
        Ok(self.half_edge(id)?.loop_id)
    }

    /// Make two half-edges mutual twins.
    ///
    /// Fails if either already has a twin (the edge would border more than
    /// two faces) or if their endpoints do not run in opposite directions.
    pub fn glue_half_edges(&mut self, a: HalfEdgeId, b: HalfEdgeId) -> Result<()> {
        if a == b {
            return Err(KernelError::Topology(format!(
                "cannot glue half-edge {a} to itself"
            )));
        }
        if self.half_edge(a)?.twin.is_some() {
            return Err(KernelError::Topology(format!(
                "half-edge {a} already has a twin"
            )));
        }
        if self.half_edge(b)?.twin.is_some() {
            return Err(KernelError::Topology(format!(
                "half-edge {b} already has a twin"
            )));
        }
        let a_span = (self.half_edge_start_vertex(a)?, self.half_edge_end_vertex(a)?);
        let b_span = (self.half_edge_start_vertex(b)?, self.half_edge_end_vertex(b)?);
        if a_span.0 != b_span.1 || a_span.1 != b_span.0 {
            return Err(KernelError::Topology(format!(
                "half-edges {a} and {b} do not share opposite endpoints"
            )));
        }

        self.half_edge_mut(a)?.twin = Some(b);
        self.half_edge_mut(b)?.twin = Some(a);
        Ok(())
    }

    /// Glue every matching half-edge pair among the given faces.
    ///
    /// Matches directed spans (start, end) against their reverses and pairs
    /// them greedily, so duplicated coincident geometry pairs up among its
    /// own copies where the spans allow. Returns the number of pairs glued;
    /// half-edges with no counterpart keep their boundary state.
    pub fn glue_faces(&mut self, faces: &[FaceId]) -> Result<usize> {
        let mut spans: AHashMap<(VertexId, VertexId), Vec<HalfEdgeId>> = AHashMap::new();
        let mut all: Vec<HalfEdgeId> = Vec::new();

        for &face in faces {
            for loop_id in self.face_loops(face)? {
                for he in self.loop_half_edges(loop_id)? {
                    let he = he?;
                    let span = (
                        self.half_edge_start_vertex(he)?,
                        self.half_edge_end_vertex(he)?,
                    );
                    spans.entry(span).or_default().push(he);
                    all.push(he);
                }
            }
        }

        let mut glued = 0;
        for he in all {
            if self.half_edge(he)?.twin.is_some() {
                continue;
            }
            let span = (
                self.half_edge_start_vertex(he)?,
                self.half_edge_end_vertex(he)?,
            );
            let Some(candidates) = spans.get(&(span.1, span.0)) else {
                continue;
            };
            let partner = {
                let mut found = None;
                for &candidate in candidates {
                    if candidate != he && self.half_edge(candidate)?.twin.is_none() {
                        found = Some(candidate);
                        break;
                    }
                }
                found
            };
            if let Some(partner) = partner {
                self.glue_half_edges(he, partner)?;
                glued += 1;
            }
        }
        Ok(glued)
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Lazily walk a loop's half-edges from its stored start.
    ///
    /// The returned iterator is finite and restartable: call again for a
    /// fresh walk. A malformed `next` chain that fails to return to the
    /// start within [`MAX_LOOP_STEPS`] yields a `Topology` error as the
    /// final item.
    pub fn loop_half_edges(&self, id: LoopId) -> Result<LoopHalfEdges<'_>> {
        let first = self.loop_rec(id)?.first;
        Ok(LoopHalfEdges {
            model: self,
            first,
            next: Some(first),
            steps: 0,
        })
    }

    pub fn loop_half_edge_count(&self, id: LoopId) -> Result<usize> {
        Ok(self.loop_rec(id)?.half_edge_count)
    }

    pub fn loop_face(&self, id: LoopId) -> Result<FaceId> {
        Ok(self.loop_rec(id)?.face)
    }

    /// Vertices around a loop, in traversal order.
    pub fn loop_vertices(&self, id: LoopId) -> Result<Vec<VertexId>> {
        let mut vertices = Vec::with_capacity(self.loop_rec(id)?.half_edge_count);
        for he in self.loop_half_edges(id)? {
            vertices.push(self.half_edge(he?)?.start);
        }
        Ok(vertices)
    }

    /// Positions around a loop, in traversal order.
    pub fn loop_positions(&self, id: LoopId) -> Result<Vec<Point3<f64>>> {
        self.loop_vertices(id)?
            .into_iter()
            .map(|v| self.vertex_position(v))
            .collect()
    }

    /// Loops of a face, outer loop first.
    pub fn face_loops(&self, id: FaceId) -> Result<Vec<LoopId>> {
        let face = self.face(id)?;
        let mut loops = Vec::with_capacity(1 + face.holes.len());
        loops.push(face.outer);
        loops.extend(face.holes.iter().copied());
        Ok(loops)
    }

    pub fn shell_faces(&self, id: ShellId) -> Result<Vec<FaceId>> {
        Ok(self.shell(id)?.faces.clone())
    }

    /// Shells of a body, outer shell first.
    pub fn body_shells(&self, id: BodyId) -> Result<Vec<ShellId>> {
        let body = self.body(id)?;
        let mut shells = Vec::with_capacity(1 + body.inner_shells.len());
        shells.push(body.outer_shell);
        shells.extend(body.inner_shells.iter().copied());
        Ok(shells)
    }

    /// All faces of a body across its shells.
    pub fn body_faces(&self, id: BodyId) -> Result<Vec<FaceId>> {
        let mut faces = Vec::new();
        for shell in self.body_shells(id)? {
            faces.extend(self.shell_faces(shell)?);
        }
        Ok(faces)
    }

    /// Axis-aligned bounds over all loop vertices of a body.
    pub fn body_bounding_box(&self, id: BodyId) -> Result<BoundingBox> {
        let mut bbox = BoundingBox::empty();
        for face in self.body_faces(id)? {
            for loop_id in self.face_loops(face)? {
                for p in self.loop_positions(loop_id)? {
                    bbox.expand_to_include(&p);
                }
            }
        }
        Ok(bbox)
    }

    // ------------------------------------------------------------------
    // Shells and bodies
    // ------------------------------------------------------------------

    /// Group faces into a shell. Every face must be live and unattached.
    pub fn create_shell(&mut self, faces: &[FaceId]) -> Result<ShellId> {
        if faces.is_empty() {
            return Err(KernelError::InvalidParameter(
                "shell needs at least one face".into(),
            ));
        }
        let distinct: AHashSet<FaceId> = faces.iter().copied().collect();
        if distinct.len() != faces.len() {
            return Err(KernelError::Topology(
                "face list contains duplicates".into(),
            ));
        }
        for &face in faces {
            if let Some(shell) = self.face(face)?.shell {
                return Err(KernelError::Topology(format!(
                    "face {face} already belongs to shell {shell}"
                )));
            }
        }

        let id = ShellId(self.shells.len());
        self.shells.push(Some(Shell {
            faces: faces.to_vec(),
            body: None,
        }));
        for &face in faces {
            // Validated above; cannot fail.
            if let Ok(f) = self.face_mut(face) {
                f.shell = Some(id);
            }
        }
        Ok(id)
    }

    /// Assemble a body from an outer shell and optional void shells.
    pub fn create_body(&mut self, outer: ShellId, inner: &[ShellId]) -> Result<BodyId> {
        let mut seen = AHashSet::new();
        for shell in std::iter::once(outer).chain(inner.iter().copied()) {
            if !seen.insert(shell) {
                return Err(KernelError::Topology(format!(
                    "shell {shell} listed more than once"
                )));
            }
            if let Some(body) = self.shell(shell)?.body {
                return Err(KernelError::Topology(format!(
                    "shell {shell} already belongs to body {body}"
                )));
            }
        }

        let id = BodyId(self.bodies.len());
        self.bodies.push(Some(Body {
            outer_shell: outer,
            inner_shells: inner.to_vec(),
        }));
        for shell in std::iter::once(outer).chain(inner.iter().copied()) {
            if let Ok(s) = self.shell_mut(shell) {
                s.body = Some(id);
            }
        }
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Delete an unattached face with its loops and half-edges. Twins on
    /// surviving faces revert to the boundary state. Vertices are shared
    /// and stay in the model.
    pub fn delete_face(&mut self, id: FaceId) -> Result<()> {
        if let Some(shell) = self.face(id)?.shell {
            return Err(KernelError::Topology(format!(
                "face {id} is still attached to shell {shell}"
            )));
        }
        let (loops, half_edges) = self.collect_face_parts(id)?;
        self.remove_faces(&[(id, loops, half_edges)]);
        Ok(())
    }

    /// Delete an unattached shell and all of its faces.
    pub fn delete_shell(&mut self, id: ShellId) -> Result<()> {
        if let Some(body) = self.shell(id)?.body {
            return Err(KernelError::Topology(format!(
                "shell {id} is still attached to body {body}"
            )));
        }
        let faces = self.shell_faces(id)?;
        let mut parts = Vec::with_capacity(faces.len());
        for face in faces {
            let (loops, half_edges) = self.collect_face_parts(face)?;
            parts.push((face, loops, half_edges));
        }

        self.remove_faces(&parts);
        self.shells[id.0] = None;
        Ok(())
    }

    /// Delete a body with all of its shells and faces.
    pub fn delete_body(&mut self, id: BodyId) -> Result<()> {
        let shells = self.body_shells(id)?;
        let mut parts = Vec::new();
        for &shell in &shells {
            for face in self.shell_faces(shell)? {
                let (loops, half_edges) = self.collect_face_parts(face)?;
                parts.push((face, loops, half_edges));
            }
        }

        self.remove_faces(&parts);
        for shell in shells {
            self.shells[shell.0] = None;
        }
        self.bodies[id.0] = None;
        Ok(())
    }

    fn collect_face_parts(&self, id: FaceId) -> Result<(Vec<LoopId>, Vec<HalfEdgeId>)> {
        let loops = self.face_loops(id)?;
        let mut half_edges = Vec::new();
        for &loop_id in &loops {
            for he in self.loop_half_edges(loop_id)? {
                half_edges.push(he?);
            }
        }
        Ok((loops, half_edges))
    }

    /// Tombstone pre-collected faces. Infallible by construction: every id
    /// was walked successfully by `collect_face_parts`.
    fn remove_faces(&mut self, parts: &[(FaceId, Vec<LoopId>, Vec<HalfEdgeId>)]) {
        let doomed: AHashSet<HalfEdgeId> = parts
            .iter()
            .flat_map(|(_, _, hes)| hes.iter().copied())
            .collect();

        for (face, loops, half_edges) in parts {
            for &he in half_edges {
                let twin = self.half_edges[he.0].as_ref().and_then(|h| h.twin);
                if let Some(twin) = twin {
                    if !doomed.contains(&twin) {
                        if let Some(t) = self.half_edges[twin.0].as_mut() {
                            t.twin = None;
                        }
                    }
                }
                self.half_edges[he.0] = None;
            }
            for &loop_id in loops {
                self.loops[loop_id.0] = None;
            }
            self.faces[face.0] = None;
        }
    }

    // ------------------------------------------------------------------
    // Counts
    // ------------------------------------------------------------------

    pub fn vertex_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_some()).count()
    }

    pub fn half_edge_count(&self) -> usize {
        self.half_edges.iter().filter(|h| h.is_some()).count()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.iter().filter(|l| l.is_some()).count()
    }

    pub fn face_count(&self) -> usize {
        self.faces.iter().filter(|f| f.is_some()).count()
    }

    pub fn shell_count(&self) -> usize {
        self.shells.iter().filter(|s| s.is_some()).count()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_some()).count()
    }
}

/// Lazy, finite walk of one loop's half-edges. See
/// [`TopoModel::loop_half_edges`].
pub struct LoopHalfEdges<'a> {
    model: &'a TopoModel,
    first: HalfEdgeId,
    next: Option<HalfEdgeId>,
    steps: usize,
}

impl Iterator for LoopHalfEdges<'_> {
    type Item = Result<HalfEdgeId>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        if self.steps >= MAX_LOOP_STEPS {
            self.next = None;
            return Some(Err(KernelError::Topology(format!(
                "loop starting at {} did not close within {} steps",
                self.first, MAX_LOOP_STEPS
            ))));
        }
        self.steps += 1;

        match self.model.half_edge(current) {
            Err(e) => {
                self.next = None;
                Some(Err(e))
            }
            Ok(he) => {
                self.next = (he.next != self.first).then_some(he.next);
                Some(Ok(current))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_ids(model: &mut TopoModel, z: f64) -> Vec<VertexId> {
        [
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(1.0, 1.0, z),
            Point3::new(0.0, 1.0, z),
        ]
        .iter()
        .map(|p| model.create_vertex(*p).unwrap())
        .collect()
    }

    #[test]
    fn test_vertex_welding() {
        let mut model = TopoModel::default();
        let a = model.create_vertex(Point3::new(1.0, 2.0, 3.0)).unwrap();
        let b = model
            .create_vertex(Point3::new(1.0 + 1e-9, 2.0, 3.0))
            .unwrap();
        let c = model.create_vertex(Point3::new(1.0, 2.0, 3.1)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(model.vertex_count(), 2);
    }

    #[test]
    fn test_nonfinite_vertex_rejected() {
        let mut model = TopoModel::default();
        assert!(matches!(
            model.create_vertex(Point3::new(f64::NAN, 0.0, 0.0)),
            Err(KernelError::InvalidParameter(_))
        ));
        assert_eq!(model.vertex_count(), 0);
    }

    #[test]
    fn test_create_face_and_traverse() {
        let mut model = TopoModel::default();
        let ring = quad_ids(&mut model, 0.0);
        let face = model.create_face(&ring, &[]).unwrap();

        let loops = model.face_loops(face).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(model.loop_half_edge_count(loops[0]).unwrap(), 4);

        // CCW ring about +Z gives a +Z face normal
        let plane = model.face(face).unwrap().plane;
        assert!(plane.normal.z > 0.99);

        let vertices = model.loop_vertices(loops[0]).unwrap();
        assert_eq!(vertices, ring);
    }

    #[test]
    fn test_loop_iterator_is_restartable() {
        let mut model = TopoModel::default();
        let ring = quad_ids(&mut model, 0.0);
        let face = model.create_face(&ring, &[]).unwrap();
        let loop_id = model.face_loops(face).unwrap()[0];

        let first: Vec<_> = model
            .loop_half_edges(loop_id)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        let second: Vec<_> = model
            .loop_half_edges(loop_id)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_degenerate_faces_rejected_without_mutation() {
        let mut model = TopoModel::default();
        let a = model.create_vertex(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = model.create_vertex(Point3::new(1.0, 0.0, 0.0)).unwrap();
        let c = model.create_vertex(Point3::new(2.0, 0.0, 0.0)).unwrap();

        let before = (model.half_edge_count(), model.loop_count(), model.face_count());

        // Too few distinct vertices
        assert!(matches!(
            model.create_face(&[a, b], &[]),
            Err(KernelError::DegenerateGeometry(_))
        ));
        // Collinear ring
        assert!(matches!(
            model.create_face(&[a, b, c], &[]),
            Err(KernelError::DegenerateGeometry(_))
        ));

        let after = (model.half_edge_count(), model.loop_count(), model.face_count());
        assert_eq!(before, after);
    }

    #[test]
    fn test_face_with_hole_orients_hole_clockwise() {
        let mut model = TopoModel::default();
        let outer = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 4.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
        ]
        .iter()
        .map(|p| model.create_vertex(*p).unwrap())
        .collect::<Vec<_>>();
        // Hole supplied CCW; stored winding must come out CW
        let hole = [
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(3.0, 1.0, 0.0),
            Point3::new(3.0, 3.0, 0.0),
            Point3::new(1.0, 3.0, 0.0),
        ]
        .iter()
        .map(|p| model.create_vertex(*p).unwrap())
        .collect::<Vec<_>>();

        let face = model.create_face(&outer, &[hole]).unwrap();
        let record = model.face(face).unwrap();
        assert_eq!(record.holes.len(), 1);

        let plane = record.plane;
        let (u, v) = plane.basis();
        let hole_points = model.loop_positions(record.holes[0]).unwrap();
        let projected: Vec<(f64, f64)> = hole_points
            .iter()
            .map(|p| plane.project(&u, &v, p))
            .collect();
        assert!(signed_area_2d(&projected) < 0.0);
    }

    #[test]
    fn test_hole_must_be_coplanar() {
        let mut model = TopoModel::default();
        let outer = quad_ids(&mut model, 0.0);
        let lifted = quad_ids(&mut model, 1.0);
        assert!(matches!(
            model.create_face(&outer, &[lifted]),
            Err(KernelError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_self_intersecting_rings_rejected() {
        let mut model = TopoModel::default();
        // Figure-eight ring; its Newell area is non-zero, so only an edge
        // crossing check can reject it.
        let bowtie: Vec<_> = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ]
        .iter()
        .map(|p| model.create_vertex(*p).unwrap())
        .collect();

        let before = (model.half_edge_count(), model.loop_count(), model.face_count());
        let result = model.create_face(&bowtie, &[]);
        assert!(matches!(result, Err(KernelError::DegenerateGeometry(_))));
        let after = (model.half_edge_count(), model.loop_count(), model.face_count());
        assert_eq!(before, after);

        // The same ring is no better as a hole inside a valid outer
        let outer: Vec<_> = [
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(5.0, -1.0, 0.0),
            Point3::new(5.0, 3.0, 0.0),
            Point3::new(-1.0, 3.0, 0.0),
        ]
        .iter()
        .map(|p| model.create_vertex(*p).unwrap())
        .collect();
        assert!(matches!(
            model.create_face(&outer, &[bowtie]),
            Err(KernelError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_glue_half_edges_rules() {
        let mut model = TopoModel::default();
        let ring = quad_ids(&mut model, 0.0);
        // Two faces sharing the edge ring[1]-ring[2], wound oppositely
        let extra = model.create_vertex(Point3::new(2.0, 0.5, 0.0)).unwrap();
        let left = model.create_face(&ring, &[]).unwrap();
        let right = model
            .create_face(&[ring[2], ring[1], extra], &[])
            .unwrap();

        let left_loop = model.face_loops(left).unwrap()[0];
        let right_loop = model.face_loops(right).unwrap()[0];
        let left_hes: Vec<_> = model
            .loop_half_edges(left_loop)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        let right_hes: Vec<_> = model
            .loop_half_edges(right_loop)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        // left_hes[1] runs ring[1] -> ring[2]; right_hes[0] runs ring[2] -> ring[1]
        model.glue_half_edges(left_hes[1], right_hes[0]).unwrap();
        assert_eq!(
            model.half_edge_twin(left_hes[1]).unwrap(),
            Some(right_hes[0])
        );

        // Double gluing violates manifoldness
        assert!(matches!(
            model.glue_half_edges(left_hes[1], right_hes[0]),
            Err(KernelError::Topology(_))
        ));
        // Mismatched endpoints
        assert!(matches!(
            model.glue_half_edges(left_hes[0], right_hes[1]),
            Err(KernelError::Topology(_))
        ));
    }

    #[test]
    fn test_shell_and_body_attachment_rules() {
        let mut model = TopoModel::default();
        let ring = quad_ids(&mut model, 0.0);
        let face = model.create_face(&ring, &[]).unwrap();
        let shell = model.create_shell(&[face]).unwrap();

        // A face cannot join two shells
        assert!(matches!(
            model.create_shell(&[face]),
            Err(KernelError::Topology(_))
        ));

        let body = model.create_body(shell, &[]).unwrap();
        assert!(matches!(
            model.create_body(shell, &[]),
            Err(KernelError::Topology(_))
        ));
        assert_eq!(model.body_shells(body).unwrap(), vec![shell]);
    }

    #[test]
    fn test_delete_respects_parents() {
        let mut model = TopoModel::default();
        let ring = quad_ids(&mut model, 0.0);
        let face = model.create_face(&ring, &[]).unwrap();
        let shell = model.create_shell(&[face]).unwrap();
        let body = model.create_body(shell, &[]).unwrap();

        // Attached entities refuse deletion
        assert!(matches!(
            model.delete_face(face),
            Err(KernelError::Topology(_))
        ));
        assert!(matches!(
            model.delete_shell(shell),
            Err(KernelError::Topology(_))
        ));

        model.delete_body(body).unwrap();
        assert_eq!(model.body_count(), 0);
        assert_eq!(model.shell_count(), 0);
        assert_eq!(model.face_count(), 0);
        assert_eq!(model.half_edge_count(), 0);

        // Stale handles now fail loudly
        assert!(model.face(face).is_err());
        assert!(model.body(body).is_err());
    }

    #[test]
    fn test_delete_face_restores_boundary_twin() {
        let mut model = TopoModel::default();
        let ring = quad_ids(&mut model, 0.0);
        let extra = model.create_vertex(Point3::new(2.0, 0.5, 0.0)).unwrap();
        let left = model.create_face(&ring, &[]).unwrap();
        let right = model.create_face(&[ring[2], ring[1], extra], &[]).unwrap();
        model.glue_faces(&[left, right]).unwrap();

        let right_loop = model.face_loops(right).unwrap()[0];
        let right_first: Vec<_> = model
            .loop_half_edges(right_loop)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert!(model.half_edge_twin(right_first[0]).unwrap().is_some());

        model.delete_face(left).unwrap();
        assert!(model.half_edge_twin(right_first[0]).unwrap().is_none());
    }

    #[test]
    fn test_runaway_loop_walk_is_capped() {
        let mut model = TopoModel::default();
        let ring_a = quad_ids(&mut model, 0.0);
        let ring_b = quad_ids(&mut model, 1.0);
        let face_a = model.create_face(&ring_a, &[]).unwrap();
        let face_b = model.create_face(&ring_b, &[]).unwrap();

        let loop_a = model.face_loops(face_a).unwrap()[0];
        let loop_b = model.face_loops(face_b).unwrap()[0];
        let first_a = model.loops[loop_a.0].as_ref().unwrap().first;
        let first_b = model.loops[loop_b.0].as_ref().unwrap().first;

        // Divert loop A's chain into loop B's cycle. The walk orbits B's
        // half-edges and can never come back to its starting edge, so only
        // the step cap ends it.
        model.half_edges[first_a.0].as_mut().unwrap().next = first_b;

        let walked: Result<Vec<_>> = model.loop_half_edges(loop_a).unwrap().collect();
        assert!(matches!(walked, Err(KernelError::Topology(_))));
    }

    #[test]
    fn test_validation_flags_self_intersecting_loop() {
        use crate::topo::validate_body;

        let mut model = TopoModel::default();
        let ids: Vec<_> = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ]
        .iter()
        .map(|p| model.create_vertex(*p).unwrap())
        .collect();

        // Assemble the face by hand; create_face refuses this ring.
        let plane = Plane::from_points(&model.ring_positions(&ids).unwrap()).unwrap();
        let face_id = FaceId(model.faces.len());
        let outer = model.push_loop(&ids, face_id);
        model.faces.push(Some(Face {
            outer,
            holes: Vec::new(),
            plane,
            shell: None,
        }));
        let shell = model.create_shell(&[face_id]).unwrap();
        let body = model.create_body(shell, &[]).unwrap();

        let report = validate_body(&model, body).unwrap();
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("self-intersects")));
    }
}
