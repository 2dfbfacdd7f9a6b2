// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Topology entity records
//!
//! Plain data stored in the model's arenas. All cross-references are typed
//! handles; back-references (half-edge → loop, loop → face, face → shell,
//! shell → body) keep deletion and validation cheap.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::handles::{BodyId, FaceId, HalfEdgeId, LoopId, ShellId, VertexId};
use crate::geometry::Plane;

/// A welded 3D position. Distinct vertices are never within the model's
/// linear tolerance of each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
}

/// Directed edge from `start` to the start of `next`.
///
/// `twin` is the same geometric edge traversed the opposite way in the
/// adjacent face's loop. It is `None` only while a shell is under
/// construction; a closed shell has every half-edge twinned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalfEdge {
    pub start: VertexId,
    pub twin: Option<HalfEdgeId>,
    pub next: HalfEdgeId,
    pub prev: HalfEdgeId,
    pub loop_id: LoopId,
}

/// Closed cycle of half-edges bounding a face, either as its outer boundary
/// or as a hole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loop {
    /// Stored start half-edge; traversal re-walks the cycle from here.
    pub first: HalfEdgeId,
    /// Number of half-edges in the cycle.
    pub half_edge_count: usize,
    pub face: FaceId,
}

/// Planar surface patch bounded by one outer loop and any number of hole
/// loops. The outer loop winds counter-clockwise about `plane.normal`;
/// holes wind clockwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    pub outer: LoopId,
    pub holes: Vec<LoopId>,
    pub plane: Plane,
    /// Set when the face is attached to a shell.
    pub shell: Option<ShellId>,
}

/// Connected set of faces bounding a solid region or a void inside one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shell {
    pub faces: Vec<FaceId>,
    /// Set when the shell is attached to a body.
    pub body: Option<BodyId>,
}

/// Top-level solid: one outer shell plus zero or more void shells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub outer_shell: ShellId,
    pub inner_shells: Vec<ShellId>,
}
