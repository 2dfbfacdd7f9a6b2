// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean operations on solid bodies
//!
//! Union, subtraction, and intersection all run the same pipeline: every
//! face of each input is split against the other body, the fragments the
//! operation keeps become new faces, and those are glued into shells and
//! assembled into a fresh body. The inputs are never modified.
//!
//! Geometric failure is an outcome, not an error: an empty result or a
//! disjoint intersection reports `success: false` with a message, while
//! `Err` is reserved for stale handles and internal corruption.

mod classify;
mod split;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::geometry::Plane;
use crate::mesh::face_triangles;
use crate::topo::{BodyId, FaceId, TopoModel, VertexId};

use split::{contour_area, lift, split_face, Contour, Fragment};

/// Boolean operator selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

/// Options for [`boolean_operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanOptions {
    pub operation: BooleanOp,
}

impl BooleanOptions {
    pub fn new(operation: BooleanOp) -> Self {
        Self { operation }
    }
}

/// Outcome of a boolean operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooleanResult {
    pub success: bool,
    /// The result body on success. The disjoint short-circuits hand back
    /// an input body; otherwise this is a newly built body.
    pub body: Option<BodyId>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl BooleanResult {
    fn solid(body: BodyId, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            body: Some(body),
            warnings,
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            body: None,
            warnings: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Union of two bodies.
pub fn union(model: &mut TopoModel, a: BodyId, b: BodyId) -> Result<BooleanResult> {
    boolean_operation(model, a, b, &BooleanOptions::new(BooleanOp::Union))
}

/// First body minus the second.
pub fn subtract(model: &mut TopoModel, a: BodyId, b: BodyId) -> Result<BooleanResult> {
    boolean_operation(model, a, b, &BooleanOptions::new(BooleanOp::Subtract))
}

/// Volume common to both bodies.
pub fn intersect(model: &mut TopoModel, a: BodyId, b: BodyId) -> Result<BooleanResult> {
    boolean_operation(model, a, b, &BooleanOptions::new(BooleanOp::Intersect))
}

/// A fragment scheduled for rebuilding, in its source face's plane.
/// `flip` reverses orientation, used for subtracted tool faces whose
/// material side inverts.
struct FacePlan {
    plane: Plane,
    flip: bool,
    outer: Contour,
    holes: Vec<Contour>,
}

/// Run one boolean operation and assemble the result body.
pub fn boolean_operation(
    model: &mut TopoModel,
    body_a: BodyId,
    body_b: BodyId,
    options: &BooleanOptions,
) -> Result<BooleanResult> {
    model.body(body_a)?;
    model.body(body_b)?;
    let op = options.operation;

    let tol = model.tolerance();
    let bbox_a = model.body_bounding_box(body_a)?;
    let bbox_b = model.body_bounding_box(body_b)?;
    if !bbox_a.intersects(&bbox_b, &tol) {
        tracing::debug!(a = %body_a, b = %body_b, ?op, "bounding boxes disjoint");
        return Ok(match op {
            BooleanOp::Union => BooleanResult {
                success: true,
                body: Some(body_a),
                warnings: vec!["bodies are disjoint; result is multi-component".to_string()],
                error: None,
            },
            BooleanOp::Subtract => BooleanResult::solid(body_a, Vec::new()),
            BooleanOp::Intersect => BooleanResult::failed("bodies do not intersect"),
        });
    }
    let working = bbox_a.merge(&bbox_b);
    tracing::debug!(a = %body_a, b = %body_b, ?op, extent = ?working.size(), "operands overlap");

    // Split both boundaries read-only and decide which fragments survive.
    let mut plans: Vec<FacePlan> = Vec::new();
    for face in model.body_faces(body_a)? {
        let split = split_face(model, face, body_b)?;
        let plane = model.face(face)?.plane;
        match op {
            // Coincident regions survive exactly once, from this side.
            // Anti-facing contact stays from both sides and becomes an
            // interior double wall, which gluing pairs off by itself.
            BooleanOp::Union => {
                push_plans(&mut plans, &plane, split.outside, false);
                push_plans(&mut plans, &plane, split.on_same, false);
                push_plans(&mut plans, &plane, split.on_anti, false);
            }
            BooleanOp::Subtract => {
                push_plans(&mut plans, &plane, split.outside, false);
                push_plans(&mut plans, &plane, split.on_anti, false);
            }
            BooleanOp::Intersect => {
                push_plans(&mut plans, &plane, split.inside, false);
                push_plans(&mut plans, &plane, split.on_same, false);
            }
        }
    }
    for face in model.body_faces(body_b)? {
        let split = split_face(model, face, body_a)?;
        let plane = model.face(face)?.plane;
        match op {
            BooleanOp::Union => {
                push_plans(&mut plans, &plane, split.outside, false);
                push_plans(&mut plans, &plane, split.on_anti, false);
            }
            // Subtracted tool faces cap the cavity with reversed
            // orientation; material now lies on their other side.
            BooleanOp::Subtract => {
                push_plans(&mut plans, &plane, split.inside, true);
            }
            BooleanOp::Intersect => {
                push_plans(&mut plans, &plane, split.inside, false);
            }
        }
    }

    if plans.is_empty() {
        return Ok(BooleanResult::failed(match op {
            BooleanOp::Union => "union produced no faces",
            BooleanOp::Subtract => "subtraction removed the entire body",
            BooleanOp::Intersect => "intersection is empty; bodies do not intersect",
        }));
    }

    // Rebuild the kept fragments as faces. Slivers that collapse under
    // vertex welding are dropped; real topology errors abort.
    let mut faces = Vec::with_capacity(plans.len());
    for plan in &plans {
        match build_face(model, plan) {
            Ok(face) => faces.push(face),
            Err(KernelError::DegenerateGeometry(reason)) => {
                tracing::debug!(%reason, "discarding degenerate fragment");
            }
            Err(other) => return Err(other),
        }
    }
    if faces.is_empty() {
        return Ok(BooleanResult::failed("no usable faces survived the operation"));
    }

    let mut warnings = Vec::new();
    model.glue_faces(&faces)?;
    let unglued = count_unglued(model, &faces)?;
    if unglued > 0 {
        tracing::warn!(unglued, "result shell is not closed");
        warnings.push(format!(
            "result shell is not closed: {unglued} unglued half-edges"
        ));
    }

    let components = connected_components(model, &faces)?;
    assemble_body(model, components, warnings)
}

fn push_plans(plans: &mut Vec<FacePlan>, plane: &Plane, fragments: Vec<Fragment>, flip: bool) {
    for fragment in fragments {
        plans.push(FacePlan {
            plane: *plane,
            flip,
            outer: fragment.outer,
            holes: fragment.holes,
        });
    }
}

/// Lift a planned fragment back into 3D and create its face. Welding
/// reuses existing vertices, so seams between fragments share vertices
/// and gluing can pair their half-edges.
fn build_face(model: &mut TopoModel, plan: &FacePlan) -> Result<FaceId> {
    let outer = ring_vertices(model, plan, &plan.outer)?;
    let mut holes = Vec::with_capacity(plan.holes.len());
    for hole in &plan.holes {
        holes.push(ring_vertices(model, plan, hole)?);
    }
    model.create_face(&outer, &holes)
}

fn ring_vertices(model: &mut TopoModel, plan: &FacePlan, path: &Contour) -> Result<Vec<VertexId>> {
    let (u, v) = plan.plane.basis();
    // Outer rings wind counterclockwise about the plane normal; a
    // flipped face reverses that so its derived normal flips too.
    let want_ccw = !plan.flip;
    let is_ccw = contour_area(path) > 0.0;
    let mut ordered: Vec<[f64; 2]> = path.clone();
    if is_ccw != want_ccw {
        ordered.reverse();
    }

    let mut ring = Vec::with_capacity(ordered.len());
    for p in &ordered {
        ring.push(model.create_vertex(lift(&plan.plane, &u, &v, p[0], p[1]))?);
    }
    Ok(ring)
}

fn count_unglued(model: &TopoModel, faces: &[FaceId]) -> Result<usize> {
    let mut unglued = 0;
    for &face in faces {
        for loop_id in model.face_loops(face)? {
            for he in model.loop_half_edges(loop_id)? {
                if model.half_edge(he?)?.twin.is_none() {
                    unglued += 1;
                }
            }
        }
    }
    Ok(unglued)
}

/// Group faces into connected components across glued twins.
fn connected_components(model: &TopoModel, faces: &[FaceId]) -> Result<Vec<Vec<FaceId>>> {
    let index: AHashMap<FaceId, usize> =
        faces.iter().enumerate().map(|(i, &f)| (f, i)).collect();
    let mut visited = vec![false; faces.len()];
    let mut components = Vec::new();

    for start in 0..faces.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut stack = vec![faces[start]];
        let mut component = Vec::new();
        while let Some(face) = stack.pop() {
            component.push(face);
            for loop_id in model.face_loops(face)? {
                for he in model.loop_half_edges(loop_id)? {
                    let Some(twin) = model.half_edge(he?)?.twin else {
                        continue;
                    };
                    let neighbor = model.loop_face(model.half_edge(twin)?.loop_id)?;
                    if let Some(&i) = index.get(&neighbor) {
                        if !visited[i] {
                            visited[i] = true;
                            stack.push(neighbor);
                        }
                    }
                }
            }
        }
        components.push(component);
    }
    Ok(components)
}

/// Signed volume enclosed by a set of faces, by the divergence theorem
/// over their triangles. Positive when normals point outward.
fn component_volume(model: &TopoModel, faces: &[FaceId]) -> Result<f64> {
    let mut volume = 0.0;
    for &face in faces {
        let (points, triangles) = face_triangles(model, face)?;
        for [a, b, c] in triangles {
            let (v0, v1, v2) = (points[a], points[b], points[c]);
            volume += v0.coords.dot(&v1.coords.cross(&v2.coords)) / 6.0;
        }
    }
    Ok(volume)
}

/// Sort components by signed volume and attach them to one body: the
/// largest positive component is the outer shell, negative components
/// bound voids, and further positive components are disconnected pieces
/// kept as extra shells with a warning.
fn assemble_body(
    model: &mut TopoModel,
    components: Vec<Vec<FaceId>>,
    mut warnings: Vec<String>,
) -> Result<BooleanResult> {
    let mut measured = Vec::with_capacity(components.len());
    for component in components {
        let volume = component_volume(model, &component)?;
        measured.push((component, volume));
    }
    measured.sort_by(|a, b| b.1.total_cmp(&a.1));

    if measured[0].1 <= 0.0 {
        // Nothing encloses positive volume; scrap the rebuilt faces.
        for (component, _) in &measured {
            for &face in component {
                model.delete_face(face)?;
            }
        }
        return Ok(BooleanResult::failed(
            "result encloses no positive volume",
        ));
    }

    let mut parts = measured.into_iter();
    let (outer_faces, _) = parts.next().unwrap();
    let outer_shell = model.create_shell(&outer_faces)?;

    let mut inner_shells = Vec::new();
    let mut disconnected = 0usize;
    for (component, volume) in parts {
        if volume > 0.0 {
            disconnected += 1;
        }
        inner_shells.push(model.create_shell(&component)?);
    }
    if disconnected > 0 {
        tracing::warn!(disconnected, "result has disconnected components");
        warnings.push(format!(
            "result is multi-component: {disconnected} disconnected piece(s) kept as extra shells"
        ));
    }

    let body = model.create_body(outer_shell, &inner_shells)?;
    #[cfg(debug_assertions)]
    if warnings.is_empty() {
        let report = crate::topo::validate_body(model, body)?;
        debug_assert!(
            report.valid,
            "boolean result failed validation: {:?}",
            report.errors
        );
    }
    Ok(BooleanResult::solid(body, warnings))
}
