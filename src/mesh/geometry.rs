// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric primitives: triangle law of cosines, Heron's area formula, and
//! the per-face queries built on top of them. Grounded in the teacher's
//! `face_normal`/`face_vertex_average` (`mesh/halfedge.rs`), which already
//! return `Option` rather than panicking on a degenerate face — this module
//! generalizes that pattern to angles and areas, per spec.md §7: a
//! degenerate triangle is "internally caught and surfaced as an absence",
//! not a hard error.

use glam::Vec3;

use super::connectivity::MeshConnectivity;
use super::id_types::{FaceId, HalfEdgeId, VertexId};

/// Interior angle at `p_a`, in the triangle `(p_a, p_b, p_c)`, via the law
/// of cosines. Returns `None` if any side is (numerically) zero-length or
/// the triangle inequality is violated.
pub fn angle_at(p_a: Vec3, p_b: Vec3, p_c: Vec3) -> Option<f32> {
    let ab = (p_b - p_a).length();
    let ac = (p_c - p_a).length();
    let bc = (p_b - p_c).length();
    if ab <= f32::EPSILON || ac <= f32::EPSILON || bc <= f32::EPSILON {
        return None;
    }
    if !satisfies_triangle_inequality(ab, ac, bc) {
        return None;
    }
    let cos_a = ((ab * ab) + (ac * ac) - (bc * bc)) / (2.0 * ab * ac);
    Some(cos_a.clamp(-1.0, 1.0).acos())
}

/// Whether three side lengths can form a (non-degenerate) triangle.
pub fn satisfies_triangle_inequality(a: f32, b: f32, c: f32) -> bool {
    a + b > c && b + c > a && c + a > b
}

/// Triangle area via Heron's formula. `None` on a degenerate triangle.
pub fn triangle_area(p_a: Vec3, p_b: Vec3, p_c: Vec3) -> Option<f32> {
    let a = (p_b - p_c).length();
    let b = (p_c - p_a).length();
    let c = (p_a - p_b).length();
    if !satisfies_triangle_inequality(a, b, c) {
        return None;
    }
    let s = (a + b + c) * 0.5;
    let area_sq = s * (s - a) * (s - b) * (s - c);
    if area_sq <= 0.0 {
        None
    } else {
        Some(area_sq.sqrt())
    }
}

impl MeshConnectivity {
    /// The three interior angles of `f`, one per halfedge, in the order
    /// returned by [`MeshConnectivity::face_halfedges`]: `angles[i]` is the
    /// angle at the vertex `halfedges[i]` points *to*.
    pub fn face_angles(&self, f: FaceId) -> Option<[f32; 3]> {
        let hs = self.face_halfedges(f);
        let v = [self.target(hs[0]), self.target(hs[1]), self.target(hs[2])];
        let p = [self[v[0]].position, self[v[1]].position, self[v[2]].position];
        Some([
            angle_at(p[0], p[1], p[2])?,
            angle_at(p[1], p[2], p[0])?,
            angle_at(p[2], p[0], p[1])?,
        ])
    }

    pub fn face_area(&self, f: FaceId) -> Option<f32> {
        let [a, b, c] = self.face_vertices(f);
        triangle_area(self[a].position, self[b].position, self[c].position)
    }

    /// The angle of `f` at vertex `v`, if `v` is one of `f`'s vertices.
    pub fn face_angle_at(&self, f: FaceId, v: VertexId) -> Option<f32> {
        let hs = self.face_halfedges(f);
        let angles = self.face_angles(f)?;
        hs.iter()
            .position(|&h| self.target(h) == v)
            .map(|i| angles[i])
    }

    /// The halfedge of `f` opposite `v` (the one whose edge doesn't touch
    /// `v`), if `v` is one of `f`'s vertices.
    pub fn face_opposite_halfedge(&self, f: FaceId, v: VertexId) -> Option<HalfEdgeId> {
        let hs = self.face_halfedges(f);
        hs.iter().find(|&&h| self.target(h) != v && self.source(h) != v).copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use glam::vec3;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn right_triangle_angles_sum_to_pi() {
        let a = vec3(0.0, 0.0, 0.0);
        let b = vec3(1.0, 0.0, 0.0);
        let c = vec3(0.0, 1.0, 0.0);
        let angle_a = angle_at(a, b, c).unwrap();
        let angle_b = angle_at(b, c, a).unwrap();
        let angle_c = angle_at(c, a, b).unwrap();
        assert!((angle_a - FRAC_PI_2).abs() < 1e-5);
        assert!(((angle_a + angle_b + angle_c) - PI).abs() < 1e-5);
    }

    #[test]
    fn degenerate_triangle_has_no_angle() {
        let a = vec3(0.0, 0.0, 0.0);
        let b = vec3(1.0, 0.0, 0.0);
        let c = vec3(2.0, 0.0, 0.0); // collinear
        assert!(angle_at(a, b, c).is_none());
    }

    #[test]
    fn unit_right_triangle_area_is_half() {
        let a = vec3(0.0, 0.0, 0.0);
        let b = vec3(1.0, 0.0, 0.0);
        let c = vec3(0.0, 1.0, 0.0);
        assert!((triangle_area(a, b, c).unwrap() - 0.5).abs() < 1e-5);
    }
}
