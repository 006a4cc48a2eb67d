// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exact polyhedral geodesics via FlipOut: build an intrinsic triangulation
//! from a position/index buffer, bootstrap a combinatorial path or loop with
//! Dijkstra, then straighten it with the FlipOut iterative shortening loop
//! until it unfolds flat at every interior vertex.

/// Some useful re-exports
pub mod prelude;

/// The crate-wide typed error
pub mod error;

/// The intrinsic halfedge mesh: topology, edge flips, and geometric queries
pub mod mesh;

/// The per-vertex signpost angular index
pub mod signpost;

/// Dijkstra shortest-path bootstrap over the mesh's vertex graph
pub mod dijkstra;

/// `GeodesicPath` and `GeodesicLoop`, the ordered halfedge chains FlipOut
/// mutates in place
pub mod path;

/// The FlipOut iterative shortening loop, and the `FlipNetwork`/`LoopNetwork`
/// drivers that own a mesh and its paths or loop
pub mod flip_network;

/// The TSP-style edge-ordering optimiser used to seed a loop's initial tour
pub mod ordering;

/// Inside/outside/boundary face classification relative to a closed
/// geodesic loop
pub mod segmentation;
