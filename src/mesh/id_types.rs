// Type-safe wrappers over the internal slotmap allocator indices used as
// handles. Handles are opaque, `Copy`, and stable for the lifetime of the
// mesh: the mesh never deletes vertices, edges, faces or halfedges (an edge
// flip changes an edge's endpoints and length, never its identity).

slotmap::new_key_type! { pub struct HalfEdgeId; }
slotmap::new_key_type! { pub struct VertexId; }
slotmap::new_key_type! { pub struct EdgeId; }
slotmap::new_key_type! { pub struct FaceId; }
