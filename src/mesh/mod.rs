// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Render meshes - flat triangle buffers and tessellation

mod tessellate;

pub use tessellate::{
    tessellate, TessellationOptions, DEFAULT_ANGULAR_TOLERANCE, DEFAULT_CHORD_TOLERANCE,
};

pub(crate) use tessellate::face_triangles;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Triangle mesh in the layout GPU pipelines consume directly:
/// `positions` and `normals` are parallel flat f32 triplet buffers,
/// `indices` holds u32 vertex indices in groups of three.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(triangle_count * 3),
        }
    }

    /// Add a vertex with its normal, returning its index.
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);
        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);
        index
    }

    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.push(a);
        self.indices.push(b);
        self.indices.push(c);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Bounds of all vertex positions.
    pub fn bounds(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for chunk in self.positions.chunks_exact(3) {
            bbox.expand_to_include(&Point3::new(
                chunk[0] as f64,
                chunk[1] as f64,
                chunk[2] as f64,
            ));
        }
        bbox
    }

    /// Append another mesh, offsetting its indices by the running vertex
    /// count.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }
}

/// Concatenate meshes into one buffer, offsetting indices as it goes.
/// Purely data plumbing; no geometric decisions are made here.
pub fn merge_meshes(meshes: &[Mesh]) -> Mesh {
    let vertex_total = meshes.iter().map(Mesh::vertex_count).sum();
    let triangle_total = meshes.iter().map(Mesh::triangle_count).sum();
    let mut merged = Mesh::with_capacity(vertex_total, triangle_total);
    for mesh in meshes {
        merged.merge(mesh);
    }
    merged
}

/// Zero-length mesh, the identity element for [`merge_meshes`].
pub fn create_empty_mesh() -> Mesh {
    Mesh::new()
}
