//! Append-only mesh accumulation and the one-way freeze into GPU arrays.
//!
//! A `MeshBuf` collects vertices and triangles in insertion order; shapes
//! that share a logical vertex reuse its [`VertId`] so the frozen index
//! buffer references one copy. Freezing consumes the buffer, so the
//! "no mutation after freeze" rule is enforced by the type system rather
//! than by a runtime flag.

use cgmath::{Point3, Vector3};

use crate::rendering::vertex::GroundVertex;

/// Handle to a vertex previously appended to a [`MeshBuf`].
///
/// Only valid for the buffer that issued it; feeding a handle to another
/// buffer is a programmer error caught by the face bounds assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertId(pub(crate) u32);

/// Append-only vertex/face builder with an optional texture-coordinate
/// layer.
#[derive(Debug, Default)]
pub struct MeshBuf {
    pos: Vec<Point3<f32>>,
    nrm: Vec<Vector3<f32>>,
    tex: Option<Vec<[f32; 2]>>,
    faces: Vec<[u32; 3]>,
}

impl MeshBuf {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        MeshBuf::default()
    }

    /// Appends a vertex and returns its handle.
    pub fn vertex(&mut self, pos: Point3<f32>, nrm: Vector3<f32>) -> VertId {
        let id = VertId(self.pos.len() as u32);
        self.pos.push(pos);
        self.nrm.push(nrm);
        if let Some(tex) = &mut self.tex {
            tex.push([0.0, 0.0]);
        }
        id
    }

    /// Sets the texture coordinate of `v`, enabling the texture layer on
    /// first use (earlier vertices keep zeroed coordinates).
    pub fn set_tex(&mut self, v: VertId, uv: [f32; 2]) {
        let n = self.pos.len();
        let tex = self.tex.get_or_insert_with(|| vec![[0.0, 0.0]; n]);
        tex[v.0 as usize] = uv;
    }

    /// Appends a triangle over three previously created vertices.
    ///
    /// # Panics
    /// Panics if any handle does not belong to this buffer.
    pub fn face(&mut self, a: VertId, b: VertId, c: VertId) {
        let n = self.pos.len() as u32;
        assert!(
            a.0 < n && b.0 < n && c.0 < n,
            "face references vertex outside this buffer"
        );
        self.faces.push([a.0, b.0, c.0]);
    }

    /// Triangulates the quad `v1..v4` (corners in ring order) along the
    /// flatter diagonal: the one with the smaller absolute height
    /// difference between its endpoints. On a tie the `v1`-`v3` diagonal
    /// is used, so repeated builds of flat ground stay stable.
    pub fn split_quad(&mut self, v1: VertId, v2: VertId, v3: VertId, v4: VertId) {
        let z = |v: VertId| self.pos[v.0 as usize].z;
        if (z(v1) - z(v3)).abs() > (z(v2) - z(v4)).abs() {
            self.face(v1, v2, v4);
            self.face(v2, v3, v4);
        } else {
            self.face(v1, v2, v3);
            self.face(v1, v3, v4);
        }
    }

    /// Position of a previously appended vertex.
    pub fn pos(&self, v: VertId) -> Point3<f32> {
        self.pos[v.0 as usize]
    }

    /// Number of vertices appended so far.
    pub fn vertex_count(&self) -> usize {
        self.pos.len()
    }

    /// Number of triangles appended so far.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Packs the accumulated geometry into immutable GPU arrays, in
    /// insertion order. Consumes the buffer: there is no way to touch the
    /// geometry again afterwards.
    pub fn freeze(self) -> FrozenMesh {
        let tex = self.tex;
        let vertices = self
            .pos
            .iter()
            .zip(self.nrm.iter())
            .enumerate()
            .map(|(i, (p, n))| GroundVertex {
                position: [p.x, p.y, p.z],
                normal: [n.x, n.y, n.z],
                tex_coords: tex.as_ref().map_or([0.0, 0.0], |t| t[i]),
            })
            .collect();
        let indices = self.faces.iter().flat_map(|f| f.iter().copied()).collect();
        FrozenMesh { vertices, indices }
    }
}

/// An immutable, upload-ready mesh: interleaved vertices plus a `u32`
/// triangle index array.
#[derive(Debug, Clone, Default)]
pub struct FrozenMesh {
    vertices: Vec<GroundVertex>,
    indices: Vec<u32>,
}

impl FrozenMesh {
    /// The interleaved vertex array.
    pub fn vertices(&self) -> &[GroundVertex] {
        &self.vertices
    }

    /// The triangle index array (three entries per triangle).
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertex data as bytes for buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as bytes for buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Whether the mesh holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Drops the backing arrays. Called by the owning region's release.
    pub(crate) fn release(&mut self) {
        self.vertices = Vec::new();
        self.indices = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(buf: &mut MeshBuf, x: f32, y: f32, z: f32) -> VertId {
        buf.vertex(Point3::new(x, y, z), Vector3::new(0.0, 0.0, 1.0))
    }

    #[test]
    fn freeze_packs_in_insertion_order() {
        let mut buf = MeshBuf::new();
        let a = v(&mut buf, 0.0, 0.0, 0.0);
        let b = v(&mut buf, 1.0, 0.0, 0.0);
        let c = v(&mut buf, 0.0, 1.0, 0.0);
        buf.face(a, b, c);
        buf.face(c, b, a);

        let mesh = buf.freeze();
        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.vertices()[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.indices(), &[0, 1, 2, 2, 1, 0]);
    }

    #[test]
    fn shared_vertices_are_not_duplicated() {
        let mut buf = MeshBuf::new();
        let a = v(&mut buf, 0.0, 0.0, 0.0);
        let b = v(&mut buf, 1.0, 0.0, 0.0);
        let c = v(&mut buf, 1.0, 1.0, 0.0);
        let d = v(&mut buf, 0.0, 1.0, 0.0);
        buf.face(a, b, c);
        buf.face(a, c, d);
        let mesh = buf.freeze();
        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.indices().len(), 6);
    }

    #[test]
    fn split_quad_prefers_flatter_diagonal() {
        // v1-v3 diagonal spans a 4-unit height difference, v2-v4 is level:
        // the split must run along v2-v4.
        let mut buf = MeshBuf::new();
        let v1 = v(&mut buf, 0.0, 0.0, 0.0);
        let v2 = v(&mut buf, 0.0, 1.0, 2.0);
        let v3 = v(&mut buf, 1.0, 1.0, 4.0);
        let v4 = v(&mut buf, 1.0, 0.0, 2.0);
        buf.split_quad(v1, v2, v3, v4);
        let mesh = buf.freeze();
        assert_eq!(mesh.indices(), &[0, 1, 3, 1, 2, 3]);
    }

    #[test]
    fn split_quad_is_stable_on_flat_ground() {
        let mut buf = MeshBuf::new();
        let v1 = v(&mut buf, 0.0, 0.0, 1.0);
        let v2 = v(&mut buf, 0.0, 1.0, 1.0);
        let v3 = v(&mut buf, 1.0, 1.0, 1.0);
        let v4 = v(&mut buf, 1.0, 0.0, 1.0);
        buf.split_quad(v1, v2, v3, v4);
        let mesh = buf.freeze();
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn tex_layer_backfills_existing_vertices() {
        let mut buf = MeshBuf::new();
        let a = v(&mut buf, 0.0, 0.0, 0.0);
        let b = v(&mut buf, 1.0, 0.0, 0.0);
        buf.set_tex(b, [0.5, 0.5]);
        let c = v(&mut buf, 0.0, 1.0, 0.0);
        buf.face(a, b, c);
        let mesh = buf.freeze();
        assert_eq!(mesh.vertices()[0].tex_coords, [0.0, 0.0]);
        assert_eq!(mesh.vertices()[1].tex_coords, [0.5, 0.5]);
        assert_eq!(mesh.vertices()[2].tex_coords, [0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "outside this buffer")]
    fn face_with_foreign_handle_panics() {
        let mut buf = MeshBuf::new();
        let a = v(&mut buf, 0.0, 0.0, 0.0);
        buf.face(a, VertId(5), VertId(6));
    }
}
