// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric support types - bounding boxes, planes, projections

mod bbox;
mod plane;

pub use bbox::BoundingBox;
pub use plane::{newell_normal, ring_self_intersects, signed_area_2d, Plane};
