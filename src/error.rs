// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel error taxonomy

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KernelError>;

/// Errors raised by the kernel.
///
/// Boolean-operation domain failures (disjoint intersect, empty result) are
/// not errors; they are reported through `BooleanResult`. An error here means
/// the caller passed bad parameters, degenerate geometry, or a stale handle,
/// or the model's topology was found corrupted.
#[derive(Error, Debug)]
pub enum KernelError {
    /// Malformed parameters (non-positive dimensions, bad tolerances).
    /// Raised before any mutation takes place.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Geometry too degenerate to build (fewer than 3 distinct vertices,
    /// collinear loop). Raised before any mutation takes place.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A topological invariant would be violated or a handle is stale.
    /// Indicates a kernel bug or misuse, never a recoverable user scenario.
    #[error("topology error: {0}")]
    Topology(String),
}
