// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The signpost angular index: a per-vertex CCW angular coordinate system
//! over outgoing halfedges, used by the FlipOut shortener to find flexible
//! joints and measure wedge angles. Grounded in the teacher's use of
//! `slotmap::SecondaryMap` as the out-of-arena annotation layer (e.g.
//! `mesh/halfedge/compact_mesh.rs`'s vertex/face index maps) rather than
//! extending `Vertex`/`HalfEdge` themselves with angle fields — the index is
//! a derived cache, invalidated edge-by-edge as flips happen, not part of
//! the mesh's own identity.

use slotmap::SecondaryMap;
use std::f32::consts::TAU;

use crate::mesh::{EdgeId, HalfEdgeId, MeshConnectivity, VertexId};

/// Per-vertex angular coordinates of outgoing halfedges. For a vertex `v`
/// with outgoing halfedges `h_0, h_1, ..., h_{k-1}` in CCW fan order, the
/// stored angle of `h_0` is `0` and the angle of `h_i` is the running sum of
/// the wedge angles swept between consecutive outgoing halfedges. The total
/// sweep (the vertex's cone angle) is `2*PI` for a regular interior vertex,
/// less for a cone singularity, and less than that again — the bare sum of
/// incident face angles, with no wraparound sector — for a boundary vertex.
#[derive(Debug, Clone, Default)]
pub struct SignpostIndex {
    angle: SecondaryMap<HalfEdgeId, f32>,
    cone_angle: SecondaryMap<VertexId, f32>,
}

impl SignpostIndex {
    /// Builds the index for every vertex of `mesh`.
    pub fn build(mesh: &MeshConnectivity) -> Self {
        let mut index = SignpostIndex::default();
        for (v, _) in mesh.iter_vertices() {
            index.recompute_vertex(mesh, v);
        }
        index
    }

    /// Recomputes the angular coordinates of every outgoing halfedge of `v`.
    /// Used both by [`SignpostIndex::build`] and by
    /// [`SignpostIndex::update_after_flip`] to refresh only the vertices
    /// touched by a single flip, rather than rebuilding the whole index.
    fn recompute_vertex(&mut self, mesh: &MeshConnectivity, v: VertexId) {
        let outgoing = mesh.outgoing_halfedges(v);
        let Some(&h0) = outgoing.first() else {
            self.cone_angle.insert(v, 0.0);
            return;
        };

        let mut theta = 0.0;
        self.angle.insert(h0, 0.0);
        for pair in outgoing.windows(2) {
            let (h_i, h_next) = (pair[0], pair[1]);
            theta += wedge_angle(mesh, h_i, v);
            self.angle.insert(h_next, theta);
        }

        let last = *outgoing.last().unwrap();
        if mesh.cycle_around_fan(last) == Some(h0) {
            theta += wedge_angle(mesh, last, v);
        }
        self.cone_angle.insert(v, theta);
    }

    /// Refreshes the four vertices of the quadrilateral incident to `e`
    /// (its two endpoints, plus the two triangles' apex vertices) after a
    /// flip. Must be called with the *post-flip* mesh, once
    /// [`MeshConnectivity::flip_edge`] has already run.
    pub fn update_after_flip(&mut self, mesh: &MeshConnectivity, e: EdgeId) {
        let h = mesh[e].representative_halfedge();
        let mut touched = vec![mesh.target(h), mesh.source(h)];
        if let Some(t) = mesh.twin(h) {
            touched.push(mesh.target(mesh.next(h)));
            touched.push(mesh.target(mesh.next(t)));
        }
        for v in touched {
            self.recompute_vertex(mesh, v);
        }
    }

    /// The angular coordinate of outgoing halfedge `h`, in `[0, cone_angle)`.
    pub fn angle(&self, h: HalfEdgeId) -> Option<f32> {
        self.angle.get(h).copied()
    }

    /// The vertex's total angular sweep: `2*PI` minus any angle deficit for
    /// an interior vertex, or the bare incident-angle sum for a boundary one.
    pub fn cone_angle(&self, v: VertexId) -> Option<f32> {
        self.cone_angle.get(v).copied()
    }

    /// The CCW angular distance swept from `h_from` to `h_to`, both outgoing
    /// from the same vertex, normalized into `[0, cone_angle)`.
    pub fn angle_between(&self, mesh: &MeshConnectivity, h_from: HalfEdgeId, h_to: HalfEdgeId) -> Option<f32> {
        let v = mesh.source(h_from);
        debug_assert_eq!(mesh.source(h_to), v, "angle_between requires a shared source vertex");
        let cone = self.cone_angle(v)?;
        let from = self.angle(h_from)?;
        let to = self.angle(h_to)?;
        if cone <= 0.0 {
            return Some(0.0);
        }
        Some((to - from).rem_euclid(cone))
    }

    /// `v`'s outgoing halfedges sorted by increasing angular coordinate.
    /// Equivalent to [`MeshConnectivity::outgoing_halfedges`] (which already
    /// walks the fan in angular order), re-derived from the cached angles so
    /// callers don't need to depend on that walk order directly.
    pub fn outgoing_sorted_ccw(&self, mesh: &MeshConnectivity, v: VertexId) -> Vec<HalfEdgeId> {
        let mut outgoing = mesh.outgoing_halfedges(v);
        outgoing.sort_by(|&a, &b| {
            self.angle(a)
                .unwrap_or(0.0)
                .partial_cmp(&self.angle(b).unwrap_or(0.0))
                .unwrap()
        });
        outgoing
    }

    /// Whether the angular coordinate `theta` lies in the half-open CCW arc
    /// `[start, end)` (all three already normalized against the same
    /// vertex's cone angle), wrapping past the `2*PI`-equivalent boundary if
    /// `end < start`. Negative inputs are normalised via `rem_euclid`.
    pub fn is_angle_between(&self, theta: f32, start: f32, end: f32, cone: f32) -> bool {
        if cone <= 0.0 {
            return false;
        }
        let theta = theta.rem_euclid(cone);
        let start = start.rem_euclid(cone);
        let end = end.rem_euclid(cone);
        if (start - end).abs() < 1e-7 {
            return false;
        }
        if start < end {
            theta >= start && theta < end
        } else {
            theta >= start || theta < end
        }
    }
}

/// The wedge angle swept between `h` and `cycle_around_fan(h)`, both
/// outgoing from `v`: the angle at `v` in the triangle that lies between
/// them, i.e. the face incident to `twin(h)`. `0` (not `TAU`) at a boundary,
/// where there's no such triangle.
fn wedge_angle(mesh: &MeshConnectivity, h: HalfEdgeId, v: VertexId) -> f32 {
    let Some(t) = mesh.twin(h) else { return 0.0 };
    let Some(f) = mesh.face(t) else { return 0.0 };
    mesh.face_angle_at(f, v).unwrap_or(0.0)
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
    fn interior_vertex_of_icosphere_has_full_cone_angle() {
        let (positions, indices) = crate::mesh::primitives::Icosphere::build(1);
        let mesh = MeshConnectivity::build_from_triangles(&positions, &indices).unwrap();
        let index = SignpostIndex::build(&mesh);
        for (v, _) in mesh.iter_vertices() {
            let cone = index.cone_angle(v).unwrap();
            // A closed, genus-0 mesh has no boundary vertices; every cone
            // angle should be positive and finite.
            assert!(cone > 0.0 && cone <= TAU + 1e-3);
        }
    }

    #[test]
    fn boundary_vertex_cone_angle_is_less_than_full_turn() {
        let mesh = unit_square();
        let index = SignpostIndex::build(&mesh);
        // Corner (0,0) touches exactly one triangle with a right angle: its
        // cone angle is the angle of that single triangle, well under TAU.
        let corner = mesh
            .iter_vertices()
            .find(|(_, vert)| vert.position() == vec3(0.0, 0.0, 0.0))
            .map(|(id, _)| id)
            .unwrap();
        let cone = index.cone_angle(corner).unwrap();
        assert!(cone > 0.0 && cone < TAU);
    }

    #[test]
    fn angle_between_self_is_zero() {
        let mesh = unit_square();
        let index = SignpostIndex::build(&mesh);
        let (v, _) = mesh.iter_vertices().next().unwrap();
        let h = mesh.outgoing_halfedges(v)[0];
        assert_eq!(index.angle_between(&mesh, h, h).unwrap(), 0.0);
    }

    #[test]
    fn update_after_flip_keeps_cone_angles_consistent_with_rebuild() {
        let mut mesh = unit_square();
        let diagonal = mesh
            .iter_edges()
            .find(|(_, e)| (e.length() - 2f32.sqrt()).abs() < 1e-5)
            .map(|(id, _)| id)
            .unwrap();

        let mut incremental = SignpostIndex::build(&mesh);
        assert!(mesh.flip_edge(diagonal));
        incremental.update_after_flip(&mesh, diagonal);

        let rebuilt = SignpostIndex::build(&mesh);
        for (v, _) in mesh.iter_vertices() {
            assert!(
                (incremental.cone_angle(v).unwrap() - rebuilt.cone_angle(v).unwrap()).abs() < 1e-4
            );
        }
    }
}
