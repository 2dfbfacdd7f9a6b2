// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Structural validation of bodies
//!
//! Used by tests and by callers wanting a health check after a chain of
//! boolean operations. Nothing here mutates the model.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use super::handles::{BodyId, ShellId, VertexId};
use super::model::TopoModel;
use crate::error::Result;
use crate::geometry::{ring_self_intersects, signed_area_2d};

/// Outcome of [`validate_body`].
///
/// `euler_characteristics` carries `V - E + F - H` per shell (H = hole
/// loops), in `body_shells` order. For a closed shell of genus g the value
/// is `2 - 2g`: 2 for a plain box, 0 for a body with one through-hole. Odd
/// or >2 values are reported as errors; the genus itself is the caller's
/// knowledge, not enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub euler_characteristics: Vec<i64>,
}

/// Check the structural invariants of a body: twin involution and endpoint
/// correspondence, loop closure, manifold edge use, face planarity and
/// winding, and a plausible Euler characteristic per shell.
pub fn validate_body(model: &TopoModel, body: BodyId) -> Result<ValidationReport> {
    let mut errors = Vec::new();
    let mut characteristics = Vec::new();

    for shell in model.body_shells(body)? {
        match validate_shell(model, shell, &mut errors) {
            Ok(chi) => characteristics.push(chi),
            Err(e) => errors.push(format!("shell {shell}: {e}")),
        }
    }

    Ok(ValidationReport {
        valid: errors.is_empty(),
        errors,
        euler_characteristics: characteristics,
    })
}

fn validate_shell(model: &TopoModel, shell: ShellId, errors: &mut Vec<String>) -> Result<i64> {
    let tol = model.tolerance();
    let faces = model.shell_faces(shell)?;

    let mut shell_vertices: AHashSet<VertexId> = AHashSet::new();
    let mut span_use: AHashMap<(VertexId, VertexId), usize> = AHashMap::new();
    let mut half_edge_total = 0usize;
    let mut unglued = 0usize;
    let mut hole_loops = 0i64;

    for &face_id in &faces {
        let face = model.face(face_id)?;
        let plane = face.plane;
        let (u, v) = plane.basis();
        hole_loops += face.holes.len() as i64;

        for (loop_index, loop_id) in model.face_loops(face_id)?.iter().enumerate() {
            let recorded = model.loop_half_edge_count(*loop_id)?;
            let mut walked = 0usize;

            for he in model.loop_half_edges(*loop_id)? {
                let he = match he {
                    Ok(he) => he,
                    Err(e) => {
                        errors.push(format!("face {face_id}: {e}"));
                        break;
                    }
                };
                walked += 1;
                half_edge_total += 1;

                let start = model.half_edge_start_vertex(he)?;
                let end = model.half_edge_end_vertex(he)?;
                shell_vertices.insert(start);
                let span = (start.min(end), start.max(end));
                *span_use.entry(span).or_insert(0) += 1;

                match model.half_edge_twin(he)? {
                    None => {
                        unglued += 1;
                        errors.push(format!(
                            "face {face_id}: half-edge {he} has no twin in a closed shell"
                        ));
                    }
                    Some(twin) => {
                        if model.half_edge_twin(twin)? != Some(he) {
                            errors.push(format!(
                                "face {face_id}: twin of twin of {he} is not {he}"
                            ));
                        }
                        if model.half_edge_start_vertex(twin)? != end
                            || model.half_edge_end_vertex(twin)? != start
                        {
                            errors.push(format!(
                                "face {face_id}: twin of {he} does not run the edge backwards"
                            ));
                        }
                    }
                }
            }

            if walked != recorded {
                errors.push(format!(
                    "face {face_id}: loop {loop_id} walked {walked} half-edges, recorded {recorded}"
                ));
            }
            if walked < 3 {
                errors.push(format!(
                    "face {face_id}: loop {loop_id} has fewer than 3 half-edges"
                ));
            }

            // Planarity and winding
            let positions = model.loop_positions(*loop_id)?;
            for p in &positions {
                if !plane.contains_point(p, &tol) {
                    errors.push(format!(
                        "face {face_id}: loop {loop_id} leaves the face plane"
                    ));
                    break;
                }
            }
            let projected: Vec<(f64, f64)> =
                positions.iter().map(|p| plane.project(&u, &v, p)).collect();
            let area = signed_area_2d(&projected);
            if loop_index == 0 && area <= 0.0 {
                errors.push(format!(
                    "face {face_id}: outer loop winds clockwise about the face normal"
                ));
            }
            if loop_index > 0 && area >= 0.0 {
                errors.push(format!(
                    "face {face_id}: hole loop {loop_id} winds counter-clockwise"
                ));
            }
            if ring_self_intersects(&projected, tol.linear()) {
                errors.push(format!("face {face_id}: loop {loop_id} self-intersects"));
            }
        }
    }

    for (span, count) in &span_use {
        if *count != 2 {
            errors.push(format!(
                "shell {shell}: edge {}-{} borders {count} half-edges, expected 2",
                span.0, span.1
            ));
        }
    }

    let vertex_count = shell_vertices.len() as i64;
    let edge_count = ((half_edge_total - unglued) / 2 + unglued) as i64;
    let face_count = faces.len() as i64;
    let chi = vertex_count - edge_count + face_count - hole_loops;

    // chi = 2 - 2g for a closed orientable shell; anything odd or above 2
    // cannot come from valid topology.
    if chi > 2 || chi % 2 != 0 {
        errors.push(format!(
            "shell {shell}: impossible Euler characteristic {chi} (V={vertex_count} E={edge_count} F={face_count} H={hole_loops})"
        ));
    }

    Ok(chi)
}
