// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dijkstra over the mesh's vertex graph, weighted by intrinsic edge
//! length. Bootstraps the combinatorial (non-locally-shortest) path that
//! [`crate::flip_network::FlipNetwork`] then straightens with FlipOut.
//! `FloatOrd` wrapped in `std::cmp::Reverse` turns Rust's default max-heap
//! `BinaryHeap` into a min-heap over path cost, the standard textbook
//! arrangement.

use float_ord::FloatOrd;
use slotmap::SecondaryMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{GeoError, Result};
use crate::mesh::{HalfEdgeId, MeshConnectivity, VertexId};
use crate::path::GeodesicPath;

/// The result of a single-source (or multi-source) Dijkstra run: the best
/// known distance to each reached vertex, the halfedge used to reach it (for
/// path reconstruction by walking backwards from a target), and, when a
/// target was given, whether it was reached. Exposed in full (not just
/// `distance`/`path_to`) so tooling built on top of this crate — such as the
/// edge-ordering optimiser's per-candidate distance queries — can walk the
/// parent map directly instead of re-deriving it from a reconstructed path.
pub struct ShortestPathTree {
    pub distance: SecondaryMap<VertexId, f32>,
    pub parent: SecondaryMap<VertexId, HalfEdgeId>,
    pub target_reached: Option<bool>,
}

impl ShortestPathTree {
    pub fn distance_to(&self, v: VertexId) -> Option<f32> {
        self.distance.get(v).copied()
    }

    /// Reconstructs the path from whichever source reached `target`, by
    /// walking the `parent` halfedges backwards and reversing. `None` if
    /// `target` was never reached.
    pub fn path_to(&self, mesh: &MeshConnectivity, target: VertexId) -> Option<GeodesicPath> {
        if !self.distance.contains_key(target) {
            return None;
        }
        let mut halfedges = Vec::new();
        let mut v = target;
        while let Some(&h) = self.parent.get(v) {
            halfedges.push(h);
            v = mesh.source(h);
        }
        halfedges.reverse();
        if halfedges.is_empty() {
            // `target` is itself a source; no edges to walk.
            return None;
        }
        GeodesicPath::new(mesh, halfedges).ok()
    }
}

/// Runs Dijkstra from every vertex in `sources` simultaneously (their
/// initial distance is `0`), stopping early once `target` is popped off the
/// frontier, if given. With no `target`, explores the whole connected
/// component reachable from `sources`.
#[profiling::function]
pub fn compute_shortest_path_tree(
    mesh: &MeshConnectivity,
    sources: &[VertexId],
    target: Option<VertexId>,
) -> ShortestPathTree {
    let mut distance = SecondaryMap::new();
    let mut parent = SecondaryMap::new();
    let mut heap = BinaryHeap::new();

    for &s in sources {
        distance.insert(s, 0.0);
        heap.push(Reverse((FloatOrd(0.0), s)));
    }

    while let Some(Reverse((FloatOrd(d), v))) = heap.pop() {
        if Some(v) == target {
            break;
        }
        if d > distance.get(v).copied().unwrap_or(f32::INFINITY) {
            continue; // stale entry, a shorter one was already processed
        }
        for h in mesh.outgoing_halfedges(v) {
            let w = mesh.target(h);
            let edge_len = mesh[mesh.edge_of(h)].length();
            let candidate = d + edge_len;
            if candidate < distance.get(w).copied().unwrap_or(f32::INFINITY) {
                distance.insert(w, candidate);
                parent.insert(w, h);
                heap.push(Reverse((FloatOrd(candidate), w)));
            }
        }
    }

    let target_reached = target.map(|t| distance.contains_key(t));
    ShortestPathTree { distance, parent, target_reached }
}

/// The combinatorial shortest path between two vertices, or `None` if they
/// lie in different connected components.
pub fn compute_path(mesh: &MeshConnectivity, src: VertexId, tgt: VertexId) -> Option<GeodesicPath> {
    if src == tgt {
        return None;
    }
    let tree = compute_shortest_path_tree(mesh, &[src], Some(tgt));
    tree.path_to(mesh, tgt)
}

/// Connects consecutive waypoints into a chain of shortest paths. Requires
/// at least two waypoints, and fails the whole request if any consecutive
/// pair is disconnected: a single unreachable segment becomes a crate-level
/// error, not a partial result.
pub fn compute_piecewise_path(
    mesh: &MeshConnectivity,
    waypoints: &[VertexId],
) -> Result<Vec<GeodesicPath>> {
    if waypoints.len() < 2 {
        return Err(GeoError::Precondition(
            "a piecewise path needs at least two waypoints".into(),
        ));
    }
    waypoints
        .windows(2)
        .map(|pair| {
            compute_path(mesh, pair[0], pair[1])
                .ok_or(GeoError::NoPath { from: pair[0], to: pair[1] })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use glam::vec3;

    fn unit_square() -> MeshConnectivity {
        let positions = vec![
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(1.0, 1.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        ];
        let indices = [0, 1, 2, 0, 2, 3];
        MeshConnectivity::build_from_triangles(&positions, &indices).unwrap()
    }

    #[test]
    fn shortest_path_prefers_the_diagonal() {
        let mesh = unit_square();
        let verts: Vec<VertexId> = mesh.iter_vertices().map(|(id, _)| id).collect();
        // Vertices 0 and 2 are connected both by the diagonal (length sqrt(2))
        // and by two unit edges (length 2); Dijkstra must pick the diagonal.
        let path = compute_path(&mesh, verts[0], verts[2]).unwrap();
        assert_eq!(path.halfedges().len(), 1);
        assert!((path.length() - 2f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn same_source_and_target_has_no_path() {
        let mesh = unit_square();
        let v0 = mesh.iter_vertices().next().unwrap().0;
        assert!(compute_path(&mesh, v0, v0).is_none());
    }

    #[test]
    fn piecewise_path_rejects_fewer_than_two_waypoints() {
        let mesh = unit_square();
        let v0 = mesh.iter_vertices().next().unwrap().0;
        assert!(compute_piecewise_path(&mesh, &[v0]).is_err());
    }

    #[test]
    fn piecewise_path_chains_three_waypoints() {
        let mesh = unit_square();
        let verts: Vec<VertexId> = mesh.iter_vertices().map(|(id, _)| id).collect();
        let legs = compute_piecewise_path(&mesh, &[verts[0], verts[1], verts[2]]).unwrap();
        assert_eq!(legs.len(), 2);
    }
}
