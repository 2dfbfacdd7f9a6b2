// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Brepkit solid modeling kernel
//!
//! A boundary-representation kernel on a half-edge data structure.
//! Provides box primitives, boolean operations between solids, topology
//! validation, and tessellation into render-ready triangle buffers.

pub mod boolean;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod primitives;
pub mod tolerance;
pub mod topo;

pub use boolean::{
    boolean_operation, intersect, subtract, union, BooleanOp, BooleanOptions, BooleanResult,
};
pub use error::{KernelError, Result};
pub use geometry::{BoundingBox, Plane};
pub use mesh::{
    create_empty_mesh, merge_meshes, tessellate, Mesh, TessellationOptions,
    DEFAULT_ANGULAR_TOLERANCE, DEFAULT_CHORD_TOLERANCE,
};
pub use primitives::{create_box, BoxParams};
pub use tolerance::{ToleranceContext, DEFAULT_LINEAR_TOLERANCE};
pub use topo::{
    validate_body, BodyId, FaceId, HalfEdgeId, LoopId, ShellId, TopoModel, ValidationReport,
    VertexId,
};
