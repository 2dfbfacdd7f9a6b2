// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Primitive body constructors
//!
//! Primitives are built directly as closed manifold shells in the model;
//! they are the known-good inputs every boolean operation starts from.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::topo::{BodyId, TopoModel};

/// Parameters for [`create_box`]. `width`, `height`, `depth` are the full
/// extents along x, y, z.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoxParams {
    pub center: Point3<f64>,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl BoxParams {
    pub fn new(center: Point3<f64>, width: f64, height: f64, depth: f64) -> Self {
        Self {
            center,
            width,
            height,
            depth,
        }
    }

    /// Cube helper used all over the tests.
    pub fn cube(center: Point3<f64>, size: f64) -> Self {
        Self::new(center, size, size, size)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("depth", self.depth),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(KernelError::InvalidParameter(format!(
                    "box {name} must be positive and finite, got {value}"
                )));
            }
        }
        if !self.center.coords.iter().all(|c| c.is_finite()) {
            return Err(KernelError::InvalidParameter(
                "box center must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Corner order: bottom ring counter-clockwise seen from above (-,-,-),
/// (+,-,-), (+,+,-), (-,+,-), then the top ring in the same order.
const BOX_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1], // bottom, -z
    [4, 5, 6, 7], // top, +z
    [0, 1, 5, 4], // front, -y
    [2, 3, 7, 6], // back, +y
    [0, 4, 7, 3], // left, -x
    [1, 2, 6, 5], // right, +x
];

/// Build an axis-aligned box as one closed shell under a new body.
///
/// All six faces wind counter-clockwise about their outward normals, so
/// every edge is shared by exactly two faces running it in opposite
/// directions. Fails with `InvalidParameter` before any mutation if a
/// dimension is zero, negative, or non-finite.
pub fn create_box(model: &mut TopoModel, params: &BoxParams) -> Result<BodyId> {
    params.validate()?;

    let c = params.center;
    let hw = params.width / 2.0;
    let hh = params.height / 2.0;
    let hd = params.depth / 2.0;

    let corners = [
        Point3::new(c.x - hw, c.y - hh, c.z - hd),
        Point3::new(c.x + hw, c.y - hh, c.z - hd),
        Point3::new(c.x + hw, c.y + hh, c.z - hd),
        Point3::new(c.x - hw, c.y + hh, c.z - hd),
        Point3::new(c.x - hw, c.y - hh, c.z + hd),
        Point3::new(c.x + hw, c.y - hh, c.z + hd),
        Point3::new(c.x + hw, c.y + hh, c.z + hd),
        Point3::new(c.x - hw, c.y + hh, c.z + hd),
    ];

    let mut vertices = Vec::with_capacity(8);
    for corner in &corners {
        vertices.push(model.create_vertex(*corner)?);
    }

    let mut faces = Vec::with_capacity(6);
    for ring in &BOX_FACES {
        let loop_vertices: Vec<_> = ring.iter().map(|&i| vertices[i]).collect();
        faces.push(model.create_face(&loop_vertices, &[])?);
    }

    let glued = model.glue_faces(&faces)?;
    if glued != 12 {
        return Err(KernelError::Topology(format!(
            "box construction glued {glued} edges, expected 12"
        )));
    }

    let shell = model.create_shell(&faces)?;
    model.create_body(shell, &[])
}
