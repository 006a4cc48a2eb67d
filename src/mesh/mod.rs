// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The intrinsic triangulation: topology ([`connectivity`]), the geometric
//! queries built on it ([`geometry`]), its handle types ([`id_types`]), and
//! fixture mesh generators for the scenarios of spec.md §8 ([`primitives`]).

pub mod connectivity;
pub mod geometry;
pub mod id_types;
pub mod primitives;

pub use connectivity::{Edge, Face, HalfEdge, MeshConnectivity, Vertex};
pub use id_types::{EdgeId, FaceId, HalfEdgeId, VertexId};
