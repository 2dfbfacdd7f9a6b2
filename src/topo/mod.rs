// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Topological model - half-edge B-rep entities, arenas, validation

mod entities;
mod handles;
mod model;
mod validate;

pub use entities::{Body, Face, HalfEdge, Loop, Shell, Vertex};
pub use handles::{BodyId, FaceId, HalfEdgeId, LoopId, ShellId, VertexId};
pub use model::{LoopHalfEdges, TopoModel, MAX_LOOP_STEPS};
pub use validate::{validate_body, ValidationReport};
