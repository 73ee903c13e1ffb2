use bytemuck::{Pod, Zeroable};
use glam::{Affine3A, Vec2, Vec3};

pub const DEFAULT_NORMAL: Vec3 = Vec3::Z;
pub const DEFAULT_UV: Vec2 = Vec2::ZERO;
pub const DEFAULT_COLOR: Vec3 = Vec3::ONE;

/// Vertex shared by procedural shapes and loaded meshes. 44 bytes, tightly
/// packed, uploaded as-is.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub pos: [f32; 3],
    pub norm: [f32; 3],
    pub uv: [f32; 2],
    pub col: [f32; 3],
}

impl MeshVertex {
    pub fn new(pos: Vec3, norm: Vec3, uv: Vec2, col: Vec3) -> Self {
        Self {
            pos: pos.to_array(),
            norm: norm.to_array(),
            uv: uv.to_array(),
            col: col.to_array(),
        }
    }

    /// Position and colour only; normal and uv take their defaults.
    pub fn colored(pos: Vec3, col: Vec3) -> Self {
        Self::new(pos, DEFAULT_NORMAL, DEFAULT_UV, col)
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.pos)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn push_vertex(&mut self, v: MeshVertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(v);
        index
    }

    pub fn push_triangle(&mut self, a: MeshVertex, b: MeshVertex, c: MeshVertex) {
        for v in [a, b, c] {
            let i = self.push_vertex(v);
            self.indices.push(i);
        }
    }

    /// Emits `b c a` then `a c d`, splitting along the a-c diagonal.
    pub fn push_quad(&mut self, a: MeshVertex, b: MeshVertex, c: MeshVertex, d: MeshVertex) {
        self.push_triangle(b, c, a);
        self.push_triangle(a, c, d);
    }

    /// Append another mesh, rebasing its indices.
    pub fn extend(&mut self, other: &MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    pub fn transform(&mut self, transform: Affine3A) {
        for v in &mut self.vertices {
            v.pos = transform.transform_point3(Vec3::from_array(v.pos)).to_array();
            let n = transform.transform_vector3(Vec3::from_array(v.norm));
            v.norm = n.normalize_or(DEFAULT_NORMAL).to_array();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32) -> MeshVertex {
        MeshVertex::colored(Vec3::new(x, y, 0.0), DEFAULT_COLOR)
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 44);
    }

    #[test]
    fn colored_vertex_uses_defaults() {
        let v = MeshVertex::colored(Vec3::ONE, Vec3::X);
        assert_eq!(v.norm, [0.0, 0.0, 1.0]);
        assert_eq!(v.uv, [0.0, 0.0]);
        assert_eq!(v.col, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn push_quad_splits_along_ac_diagonal() {
        let mut mesh = MeshData::new();
        let (a, b, c, d) = (at(0.0, 0.0), at(1.0, 0.0), at(1.0, 1.0), at(0.0, 1.0));
        mesh.push_quad(a, b, c, d);
        assert_eq!(mesh.vertices, vec![b, c, a, a, c, d]);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn extend_rebases_indices() {
        let mut a = MeshData::new();
        a.push_triangle(at(0.0, 0.0), at(1.0, 0.0), at(0.0, 1.0));
        let b = a.clone();
        a.extend(&b);
        assert_eq!(a.vertices.len(), 6);
        assert_eq!(&a.indices[3..], &[3, 4, 5]);
    }

    #[test]
    fn transform_moves_positions_and_keeps_normals_unit() {
        let mut mesh = MeshData::new();
        mesh.push_triangle(at(1.0, 0.0), at(0.0, 1.0), at(0.0, 0.0));
        mesh.transform(Affine3A::from_scale_rotation_translation(
            Vec3::splat(2.0),
            glam::Quat::IDENTITY,
            Vec3::new(0.0, 0.0, 5.0),
        ));
        assert_eq!(mesh.vertices[0].pos, [2.0, 0.0, 5.0]);
        let n = Vec3::from_array(mesh.vertices[0].norm);
        assert!((n.length() - 1.0).abs() < 1e-6);
    }
}
