// Crate-wide error type: a plain enum with hand-written `Display`/`Error`
// impls, covering the full set of error kinds this crate's operations can
// surface to a caller.

use crate::mesh::{FaceId, VertexId};

/// Every fallible operation in this crate returns this typed error on
/// failure. "No path" from Dijkstra is deliberately *not* one of these
/// variants: it is represented as `Option::None` so callers can compose
/// multi-segment searches without matching on an error.
#[derive(Debug, Clone)]
pub enum GeoError {
    /// The input buffers handed to mesh construction were missing,
    /// mis-sized, or referenced a vertex that doesn't exist.
    MalformedInput(String),
    /// An edge was found with more than two incident halfedges.
    NonManifold { detail: String },
    /// A triangle's edge lengths failed the strict triangle inequality, or a
    /// side length used in an angle/area computation was zero.
    DegenerateTriangle { face: Option<FaceId>, detail: String },
    /// Dijkstra could not connect the requested endpoints. Only raised by
    /// the piecewise-path helper, which promotes a single unreachable
    /// segment into a crate-level error for the whole composite request.
    NoPath { from: VertexId, to: VertexId },
    /// A precondition of some operation was violated by the caller: a flip
    /// attempted on a boundary edge or a degree-1 endpoint, an angle query
    /// on a non-interior vertex, a loop built from fewer than three edges,
    /// or a piecewise path requested with fewer than two waypoints.
    Precondition(String),
    /// The edge-ordering optimiser skipped more waypoint edges than the
    /// caller's `max_skipped_edges` allowed, or `require_all_edges` was set
    /// and at least one edge was skipped.
    TooManySkipped { skipped: usize, allowed: usize },
}

impl std::fmt::Display for GeoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoError::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            GeoError::NonManifold { detail } => write!(f, "non-manifold mesh: {detail}"),
            GeoError::DegenerateTriangle { face, detail } => {
                write!(f, "degenerate triangle {face:?}: {detail}")
            }
            GeoError::NoPath { from, to } => {
                write!(f, "no path from {from:?} to {to:?}")
            }
            GeoError::Precondition(msg) => write!(f, "precondition violated: {msg}"),
            GeoError::TooManySkipped { skipped, allowed } => write!(
                f,
                "edge ordering skipped {skipped} edges, but at most {allowed} are allowed"
            ),
        }
    }
}

impl std::error::Error for GeoError {}

/// Convenience alias, used throughout the crate for every fallible
/// operation's return type.
pub type Result<T> = std::result::Result<T, GeoError>;
