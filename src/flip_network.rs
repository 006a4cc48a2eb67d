// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The FlipOut iterative shortening loop, and the two networks that drive
//! it: [`FlipNetwork`] for open paths, [`LoopNetwork`] for closed loops.
//! Verbose mode emits a single `log::debug!` line per notable step rather
//! than building a structured tracing span for every call.

use std::f32::consts::PI;

use crate::dijkstra;
use crate::error::{GeoError, Result};
use crate::mesh::{EdgeId, HalfEdgeId, MeshConnectivity, VertexId};
use crate::ordering::{self, LoopBuildOptions};
use crate::path::{GeodesicLoop, GeodesicPath};
use crate::segmentation::Segmentation;
use crate::signpost::SignpostIndex;

/// Angle tolerance below which a wedge is considered "not straight":
/// a joint is flexible when its interior angle is `< PI - ANGLE_EPS`.
const ANGLE_EPS: f32 = 1e-6;

/// Options accepted by both `FlipNetwork` and `LoopNetwork` constructors.
#[derive(Debug, Clone, Copy)]
pub struct ShortenOptions {
    pub max_iterations: u32,
    pub convergence_threshold: f64,
    pub verbose: bool,
}

impl Default for ShortenOptions {
    fn default() -> Self {
        ShortenOptions {
            max_iterations: 10_000,
            convergence_threshold: 1e-10,
            verbose: false,
        }
    }
}

/// Flips every wedge edge at `v` between `incoming` and `outgoing`, updating
/// the signpost index after each flip (spec.md §4.5), skipping boundary
/// edges and edges whose flip precondition fails.
///
/// Since every wedge edge is a spoke of `v` excluded only by identity (never
/// `E_in`/`E_out`), flipping one always reconnects it to the two vertices
/// opposite `v` in its quad, dropping it out of `v`'s fan. Once every spoke
/// between `incoming`'s reversal and `outgoing` is gone, the two remain
/// adjacent in the fan with exactly one triangle between them — `(prev, v,
/// next)` — whose third edge is the straight diagonal the path should now
/// follow, bypassing `v` entirely. Returns that diagonal, oriented
/// `prev -> next`, or `None` if a wedge edge failed to flip and the wedge
/// didn't fully collapse (in which case the path is left untouched; the
/// vertex may still resolve on a later outer iteration).
fn flip_out_wedge(
    mesh: &mut MeshConnectivity,
    signpost: &mut SignpostIndex,
    v: VertexId,
    incoming: HalfEdgeId,
    outgoing: HalfEdgeId,
) -> Option<HalfEdgeId> {
    let e_in = mesh.edge_of(incoming);
    let e_out = mesh.edge_of(outgoing);
    let incoming_reversed = mesh.twin(incoming)?;
    let (Some(cone), Some(theta_in), Some(theta_out)) = (
        signpost.cone_angle(v),
        signpost.angle(incoming_reversed),
        signpost.angle(outgoing),
    ) else {
        return None;
    };

    let mut wedge_edges: Vec<(f32, EdgeId)> = mesh
        .outgoing_halfedges(v)
        .into_iter()
        .filter_map(|h| {
            let e = mesh.edge_of(h);
            if e == e_in || e == e_out {
                return None;
            }
            let theta = signpost.angle(h)?;
            signpost
                .is_angle_between(theta, theta_in, theta_out, cone)
                .then_some((theta, e))
        })
        .collect();
    // Flip order is observable: always process wedge edges in signpost CCW order.
    wedge_edges.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    for (_, e) in wedge_edges {
        if mesh.flip_edge(e) {
            signpost.update_after_flip(mesh, e);
        }
    }

    if mesh.next(incoming) != outgoing {
        return None; // a wedge edge didn't flip; the wedge didn't fully collapse
    }
    mesh.twin(mesh.next(outgoing))
}

/// An open path (or several), sharing one mesh and signpost index, shortened
/// by repeated FlipOut.
pub struct FlipNetwork {
    mesh: MeshConnectivity,
    signpost: SignpostIndex,
    paths: Vec<GeodesicPath>,
    opts: ShortenOptions,
    converged: bool,
}

impl FlipNetwork {
    /// Builds a network from a single Dijkstra-bootstrapped path between
    /// `src` and `tgt`.
    pub fn from_dijkstra_path(
        mut mesh: MeshConnectivity,
        src: VertexId,
        tgt: VertexId,
        opts: ShortenOptions,
    ) -> Result<Self> {
        let path = dijkstra::compute_path(&mesh, src, tgt)
            .ok_or(GeoError::NoPath { from: src, to: tgt })?;
        path.set_in_path(&mut mesh, true);
        let signpost = SignpostIndex::build(&mesh);
        Ok(FlipNetwork { mesh, signpost, paths: vec![path], opts, converged: false })
    }

    /// Builds a network from a chain of Dijkstra segments through
    /// `waypoints`. If `mark_interior` is set, every waypoint strictly
    /// between the first and last is pinned (`Vertex::marked = true`), so
    /// `findFlexibleJoint` treats it as a fixed path endpoint rather than a
    /// candidate to flip through.
    pub fn from_piecewise_dijkstra_path(
        mut mesh: MeshConnectivity,
        waypoints: &[VertexId],
        mark_interior: bool,
        opts: ShortenOptions,
    ) -> Result<Self> {
        let segments = dijkstra::compute_piecewise_path(&mesh, waypoints)?;
        for path in &segments {
            path.set_in_path(&mut mesh, true);
        }
        if mark_interior {
            for &v in &waypoints[1..waypoints.len() - 1] {
                mesh[v].marked = true;
            }
        }
        let signpost = SignpostIndex::build(&mesh);
        Ok(FlipNetwork { mesh, signpost, paths: segments, opts, converged: false })
    }

    pub fn mesh(&self) -> &MeshConnectivity {
        &self.mesh
    }

    pub fn paths(&self) -> &[GeodesicPath] {
        &self.paths
    }

    pub fn edge_in_path(&self, e: EdgeId) -> bool {
        self.mesh[e].in_path()
    }

    pub fn total_length(&self) -> f64 {
        self.paths.iter().map(|p| p.length() as f64).sum()
    }

    pub fn min_interior_angle(&self) -> f64 {
        let mut min = f64::INFINITY;
        for (i, path) in self.paths.iter().enumerate() {
            for idx in 1..path.halfedges().len() {
                if let Some(a) = path.angle_at_interior_vertex(&self.mesh, &self.signpost, idx) {
                    if !self.is_marked_at(i, idx) {
                        min = min.min(a as f64);
                    }
                }
            }
        }
        min
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    fn is_marked_at(&self, path_idx: usize, vertex_idx: usize) -> bool {
        let v = self.paths[path_idx].vertices(&self.mesh)[vertex_idx];
        self.mesh[v].marked
    }

    /// Locates the next flexible joint: the first interior vertex, scanning
    /// paths in order and vertices within a path in order, whose wedge angle
    /// is `< PI - eps` and is not pinned.
    fn find_flexible_joint(&self) -> Option<(usize, usize, f32)> {
        for (path_idx, path) in self.paths.iter().enumerate() {
            let vertices = path.vertices(&self.mesh);
            for idx in 1..path.halfedges().len() {
                if self.mesh[vertices[idx]].marked {
                    continue;
                }
                if let Some(angle) = path.angle_at_interior_vertex(&self.mesh, &self.signpost, idx) {
                    if angle < PI - ANGLE_EPS {
                        return Some((path_idx, idx, angle));
                    }
                }
            }
        }
        None
    }

    fn flip_out_at(&mut self, path_idx: usize, idx: usize) {
        let v = self.paths[path_idx].vertices(&self.mesh)[idx];
        let incoming = self.paths[path_idx].halfedges()[idx - 1];
        let outgoing = self.paths[path_idx].halfedges()[idx];
        let chord = flip_out_wedge(&mut self.mesh, &mut self.signpost, v, incoming, outgoing);
        if let Some(chord) = chord {
            self.paths[path_idx].straighten_at(&mut self.mesh, idx, chord);
        }
        for path in &mut self.paths {
            path.update_length(&self.mesh);
        }
    }

    /// Runs the FlipOut outer loop (spec.md §4.5) until convergence or
    /// `max_iterations`. Returns the number of outer iterations performed.
    pub fn iterative_shorten(&mut self) -> u32 {
        let mut l_prev = self.total_length();
        for iteration in 0..self.opts.max_iterations {
            let Some((path_idx, idx, _angle)) = self.find_flexible_joint() else {
                self.converged = true;
                return iteration;
            };
            if self.opts.verbose {
                log::debug!(
                    "[FlipNetwork] Iteration {iteration}: Flexible joint at vertex index {idx} of path {path_idx}"
                );
            }
            self.flip_out_at(path_idx, idx);
            let l_new = self.total_length();
            if (l_new - l_prev).abs() < self.opts.convergence_threshold {
                self.converged = true;
                return iteration + 1;
            }
            l_prev = l_new;
        }
        self.converged = false;
        self.opts.max_iterations
    }

    /// Each path's vertex sequence as extrinsic 3D positions (spec.md §6).
    pub fn get_path_polylines_3d(&self) -> Vec<Vec<glam::Vec3>> {
        self.paths
            .iter()
            .map(|path| {
                path.vertices(&self.mesh)
                    .into_iter()
                    .map(|v| self.mesh[v].position())
                    .collect()
            })
            .collect()
    }
}

/// A closed geodesic loop over waypoint edges, built via the edge-ordering
/// optimiser, then shortened and segmented.
pub struct LoopNetwork {
    mesh: MeshConnectivity,
    signpost: SignpostIndex,
    loop_: GeodesicLoop,
    opts: ShortenOptions,
    skipped_edges: Vec<EdgeId>,
    converged: bool,
}

impl LoopNetwork {
    /// Orders the given waypoint edges into a cyclic tour (spec.md §4.6,
    /// unless `optimize_order` is false, in which case the edges' natural
    /// order is used as-is), connects them with Dijkstra segments, and
    /// builds the initial loop.
    pub fn from_edge_waypoints(
        mut mesh: MeshConnectivity,
        edges: &[EdgeId],
        optimize_order: bool,
        build_opts: LoopBuildOptions,
        shorten_opts: ShortenOptions,
    ) -> Result<Self> {
        let ordered = if optimize_order {
            ordering::order_waypoint_edges(&mesh, edges, &build_opts)?
        } else {
            ordering::natural_order(&mesh, edges)
        };

        let mut halfedges = Vec::new();
        for pair in ordered.vertices.windows(2) {
            let segment = dijkstra::compute_path(&mesh, pair[0], pair[1])
                .ok_or(GeoError::NoPath { from: pair[0], to: pair[1] })?;
            halfedges.extend_from_slice(segment.halfedges());
        }
        let loop_ = GeodesicLoop::new(&mesh, halfedges)?;
        loop_.set_in_path(&mut mesh, true);

        let signpost = SignpostIndex::build(&mesh);
        Ok(LoopNetwork {
            mesh,
            signpost,
            loop_,
            opts: shorten_opts,
            skipped_edges: ordered.skipped_edges,
            converged: false,
        })
    }

    pub fn mesh(&self) -> &MeshConnectivity {
        &self.mesh
    }

    pub fn loop_path(&self) -> &GeodesicLoop {
        &self.loop_
    }

    pub fn skipped_edges(&self) -> &[EdgeId] {
        &self.skipped_edges
    }

    pub fn total_length(&self) -> f64 {
        self.loop_.length() as f64
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    fn find_flexible_joint(&self) -> Option<(usize, usize, f32)> {
        let vertices = self.loop_.vertices(&self.mesh);
        for idx in 0..self.loop_.halfedges().len() {
            if self.mesh[vertices[idx]].marked {
                continue;
            }
            if let Some(angle) = self.loop_.angle_at_interior_vertex(&self.mesh, &self.signpost, idx) {
                if angle < PI - ANGLE_EPS {
                    return Some((0, idx, angle));
                }
            }
        }
        None
    }

    fn flip_out_at(&mut self, idx: usize) {
        let halfedges = self.loop_.halfedges();
        let prev_idx = if idx == 0 { halfedges.len() - 1 } else { idx - 1 };
        let incoming = halfedges[prev_idx];
        let outgoing = halfedges[idx];
        let v = self.mesh.source(outgoing);
        let chord = flip_out_wedge(&mut self.mesh, &mut self.signpost, v, incoming, outgoing);
        if let Some(chord) = chord {
            self.loop_.straighten_at(&mut self.mesh, prev_idx, idx, chord);
        } else {
            self.loop_.update_length(&self.mesh);
        }
    }

    /// Runs the FlipOut outer loop for the loop variant: every vertex,
    /// including the base vertex, is a flexible-joint candidate.
    pub fn iterative_shorten(&mut self) -> u32 {
        let mut l_prev = self.total_length();
        for iteration in 0..self.opts.max_iterations {
            let Some((_container, idx, _angle)) = self.find_flexible_joint() else {
                self.converged = true;
                return iteration;
            };
            if self.opts.verbose {
                log::debug!("[FlipNetwork] Iteration {iteration}: Flexible joint at vertex index {idx} of loop");
            }
            self.flip_out_at(idx);
            let l_new = self.total_length();
            if (l_new - l_prev).abs() < self.opts.convergence_threshold {
                self.converged = true;
                return iteration + 1;
            }
            l_prev = l_new;
        }
        self.converged = false;
        self.opts.max_iterations
    }

    /// Runs [`LoopNetwork::iterative_shorten`] and then segments the mesh
    /// against the resulting loop. The "compute" entry point of spec.md §6.
    pub fn compute(&mut self) -> (u32, Segmentation) {
        let iterations = self.iterative_shorten();
        let segmentation = Segmentation::build(&self.mesh, &self.loop_);
        (iterations, segmentation)
    }

    pub fn get_path_polyline_3d(&self) -> Vec<glam::Vec3> {
        let mut points: Vec<glam::Vec3> = self
            .loop_
            .vertices(&self.mesh)
            .into_iter()
            .map(|v| self.mesh[v].position())
            .collect();
        if let Some(&first) = points.first() {
            points.push(first);
        }
        points
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::primitives::Icosphere;
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
    fn adjacent_vertices_need_zero_iterations() {
        let mesh = unit_square();
        let verts: Vec<VertexId> = mesh.iter_vertices().map(|(id, _)| id).collect();
        let mut net =
            FlipNetwork::from_dijkstra_path(mesh, verts[0], verts[1], ShortenOptions::default())
                .unwrap();
        let initial_length = net.total_length();
        let iterations = net.iterative_shorten();
        assert_eq!(iterations, 0);
        assert!(net.converged());
        assert_eq!(net.total_length(), initial_length);
    }

    #[test]
    fn disconnected_mesh_reports_no_path() {
        // Two disjoint triangles: vertex 3 is unreachable from vertex 0.
        let positions = vec![
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
            vec3(10.0, 0.0, 0.0),
            vec3(11.0, 0.0, 0.0),
            vec3(10.0, 1.0, 0.0),
        ];
        let indices = [0, 1, 2, 3, 4, 5];
        let mesh = MeshConnectivity::build_from_triangles(&positions, &indices).unwrap();
        let verts: Vec<VertexId> = mesh.iter_vertices().map(|(id, _)| id).collect();
        let result = FlipNetwork::from_dijkstra_path(
            mesh,
            verts[0],
            verts[3],
            ShortenOptions::default(),
        );
        assert!(matches!(result, Err(GeoError::NoPath { .. })));
    }

    #[test]
    fn square_diagonal_flip_shortens_path_to_direct_edge() {
        // unit_square's only diagonal joins (0,0)-(1,1); (1,0) and (0,1) are
        // two combinatorial hops apart (length 2) until FlipOut flips that
        // diagonal onto the shorter (1,0)-(0,1) chord (length sqrt(2)).
        let mesh = unit_square();
        let verts: Vec<VertexId> = mesh.iter_vertices().map(|(id, _)| id).collect();
        let mut net = FlipNetwork::from_dijkstra_path(
            mesh,
            verts[1],
            verts[3],
            ShortenOptions::default(),
        )
        .unwrap();
        assert_eq!(net.paths()[0].halfedges().len(), 2);
        assert!((net.total_length() - 2.0).abs() < 1e-5);

        let iterations = net.iterative_shorten();

        assert_eq!(iterations, 1);
        assert!(net.converged());
        assert_eq!(net.paths()[0].halfedges().len(), 1);
        assert!((net.total_length() - 2f64.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn icosphere_antipodal_geodesic_converges_near_pi() {
        let (positions, indices) = Icosphere::build(2); // 162 vertices, 320 faces
        let mesh = MeshConnectivity::build_from_triangles(&positions, &indices).unwrap();
        let verts: Vec<VertexId> = mesh.iter_vertices().map(|(id, _)| id).collect();
        let mut net = FlipNetwork::from_dijkstra_path(
            mesh,
            verts[0],
            verts[81],
            ShortenOptions::default(),
        )
        .unwrap();
        let iterations = net.iterative_shorten();
        assert!(iterations <= 100);
        assert!(net.total_length() <= std::f64::consts::PI + 1e-3);
        assert!(net.min_interior_angle() >= std::f64::consts::PI - 1e-6);
    }
}
