// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Typed handles into the topology arenas
//!
//! Entities reference each other through these indices rather than pointers,
//! so the half-edge graph can hold its cycles (twin ↔ twin, next ↔ prev,
//! loop ↔ face) under single ownership by the model.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_handle {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub usize);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_handle!(
    /// Index of a vertex in the model.
    VertexId,
    "v"
);
define_handle!(
    /// Index of a half-edge in the model.
    HalfEdgeId,
    "he"
);
define_handle!(
    /// Index of a loop in the model.
    LoopId,
    "l"
);
define_handle!(
    /// Index of a face in the model.
    FaceId,
    "f"
);
define_handle!(
    /// Index of a shell in the model.
    ShellId,
    "s"
);
define_handle!(
    /// Index of a body in the model.
    BodyId,
    "b"
);
