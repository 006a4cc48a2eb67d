// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convenience re-exports for downstream crates, mirroring the teacher's
//! own `prelude` (glam vector types, this crate's typed error, and its own
//! mesh/path/network surface).

pub use glam::{Vec2, Vec3};

pub use crate::dijkstra::{compute_path, compute_piecewise_path, compute_shortest_path_tree, ShortestPathTree};
pub use crate::error::{GeoError, Result};
pub use crate::flip_network::{FlipNetwork, LoopNetwork, ShortenOptions};
pub use crate::mesh::{Edge, EdgeId, Face, FaceId, HalfEdge, HalfEdgeId, MeshConnectivity, Vertex, VertexId};
pub use crate::ordering::{LoopBuildOptions, OrderingOptions};
pub use crate::path::{GeodesicLoop, GeodesicPath};
pub use crate::segmentation::{Region, Segmentation};
pub use crate::signpost::SignpostIndex;
