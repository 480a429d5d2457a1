//! CPU-side mesh and material data, before upload.
//!
//! [`MeshData`] is what the glTF importer produces and what
//! [`Renderer::create_mesh`](crate::Renderer::create_mesh) consumes. It can also be
//! built by hand or from the built-in primitives:
//!
//! ```
//! use lumen::MeshData;
//!
//! let cube = MeshData::cube();
//! assert_eq!(cube.indices.len(), 36);
//!
//! let sphere = MeshData::sphere(32, 16);
//! let (min, max) = sphere.bounds();
//! assert!(max.y > min.y);
//! ```
//!
//! # Vertex Layout
//!
//! [`PbrVertex`] occupies 56 bytes:
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | tangent   | Float32x3 | 24     | 2               |
//! | bitangent | Float32x3 | 36     | 3               |
//! | uv        | Float32x2 | 48     | 4               |

use glam::{Vec2, Vec3};

/// A vertex carrying a full tangent frame for normal mapping.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PbrVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub uv: [f32; 2],
}

impl PbrVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<PbrVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x3,
            3 => Float32x3,
            4 => Float32x2
        ],
    };

    /// A vertex with an empty tangent frame; see [`MeshData::compute_tangents`].
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
            uv,
        }
    }
}

/// Triangle indices in the width they were authored in.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(indices) => indices.len(),
            IndexData::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            IndexData::U16(_) => wgpu::IndexFormat::Uint16,
            IndexData::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(indices) => bytemuck::cast_slice(indices),
            IndexData::U32(indices) => bytemuck::cast_slice(indices),
        }
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            IndexData::U16(indices) => indices.get(i).map(|&index| index as u32),
            IndexData::U32(indices) => indices.get(i).copied(),
        }
    }

    /// Widen to 32-bit indices.
    pub fn to_u32(&self) -> Vec<u32> {
        match self {
            IndexData::U16(indices) => indices.iter().map(|&index| index as u32).collect(),
            IndexData::U32(indices) => indices.clone(),
        }
    }
}

/// Decoded RGBA8 pixels for one material texture.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl ImageData {
    /// A 1×1 image of a single color.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba8: rgba.to_vec(),
        }
    }
}

/// Material factors and the six optional texture maps.
///
/// Missing maps are replaced at upload time by a neutral 1×1 texture (white, or
/// a flat normal for the normal map) so the factors alone drive shading.
/// Metallic is read from the blue channel and roughness from the green channel,
/// so a glTF metallic-roughness image can serve both slots.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialData {
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
    pub metallic: f32,
    pub roughness: f32,
    pub occlusion_strength: f32,
    pub albedo: Option<ImageData>,
    pub normal: Option<ImageData>,
    pub metallic_map: Option<ImageData>,
    pub roughness_map: Option<ImageData>,
    pub occlusion: Option<ImageData>,
    pub emissive_map: Option<ImageData>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            base_color: [1.0; 4],
            emissive: [0.0; 3],
            metallic: 0.0,
            roughness: 0.5,
            occlusion_strength: 1.0,
            albedo: None,
            normal: None,
            metallic_map: None,
            roughness_map: None,
            occlusion: None,
            emissive_map: None,
        }
    }
}

/// Geometry plus material, ready for [`Renderer::create_mesh`](crate::Renderer::create_mesh).
#[derive(Clone, Debug)]
pub struct MeshData {
    pub vertices: Vec<PbrVertex>,
    pub indices: IndexData,
    pub material: MaterialData,
}

impl MeshData {
    pub fn new(vertices: Vec<PbrVertex>, indices: IndexData) -> Self {
        Self {
            vertices,
            indices,
            material: MaterialData::default(),
        }
    }

    pub fn with_material(mut self, material: MaterialData) -> Self {
        self.material = material;
        self
    }

    /// Computes the axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Derive per-vertex tangents and bitangents from positions and UVs.
    ///
    /// Tangents are accumulated per triangle, then orthogonalized against the
    /// normal. Vertices without usable UV derivatives get an arbitrary frame
    /// perpendicular to the normal.
    pub fn compute_tangents(&mut self) {
        let mut tangents = vec![Vec3::ZERO; self.vertices.len()];
        let mut bitangents = vec![Vec3::ZERO; self.vertices.len()];

        for tri in 0..self.indices.len() / 3 {
            let base = tri * 3;
            let (Some(a), Some(b), Some(c)) = (
                self.indices.get(base),
                self.indices.get(base + 1),
                self.indices.get(base + 2),
            ) else {
                continue;
            };
            let ids = [a, b, c].map(|i| i as usize);
            if ids.iter().any(|&i| i >= self.vertices.len()) {
                continue;
            }
            let [v0, v1, v2] = ids.map(|i| self.vertices[i]);

            let e1 = Vec3::from(v1.position) - Vec3::from(v0.position);
            let e2 = Vec3::from(v2.position) - Vec3::from(v0.position);
            let d1 = Vec2::from(v1.uv) - Vec2::from(v0.uv);
            let d2 = Vec2::from(v2.uv) - Vec2::from(v0.uv);

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let b = (e2 * d1.x - e1 * d2.x) * r;

            for &i in &ids {
                tangents[i] += t;
                bitangents[i] += b;
            }
        }

        for (v, (t, b)) in self.vertices.iter_mut().zip(tangents.into_iter().zip(bitangents)) {
            let n = Vec3::from(v.normal).normalize_or_zero();
            let mut tangent = (t - n * n.dot(t)).normalize_or_zero();
            if tangent == Vec3::ZERO {
                tangent = n.any_orthonormal_vector();
            }
            let handedness = if n.cross(tangent).dot(b) < 0.0 { -1.0 } else { 1.0 };

            v.tangent = tangent.into();
            v.bitangent = (n.cross(tangent) * handedness).into();
        }
    }

    /// A unit cube centered at the origin, one quad per face.
    pub fn cube() -> Self {
        #[rustfmt::skip]
        let vertices = vec![
            // Front face (Z+)
            PbrVertex::new([-0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 1.0]),
            PbrVertex::new([ 0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 1.0]),
            PbrVertex::new([ 0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 0.0]),
            PbrVertex::new([-0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 0.0]),
            // Back face (Z-)
            PbrVertex::new([ 0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 1.0]),
            PbrVertex::new([-0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 1.0]),
            PbrVertex::new([-0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 0.0]),
            PbrVertex::new([ 0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 0.0]),
            // Top face (Y+)
            PbrVertex::new([-0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [0.0, 1.0]),
            PbrVertex::new([ 0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [1.0, 1.0]),
            PbrVertex::new([ 0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [1.0, 0.0]),
            PbrVertex::new([-0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [0.0, 0.0]),
            // Bottom face (Y-)
            PbrVertex::new([-0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [0.0, 1.0]),
            PbrVertex::new([ 0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [1.0, 1.0]),
            PbrVertex::new([ 0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [1.0, 0.0]),
            PbrVertex::new([-0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [0.0, 0.0]),
            // Right face (X+)
            PbrVertex::new([ 0.5, -0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 1.0]),
            PbrVertex::new([ 0.5, -0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 1.0]),
            PbrVertex::new([ 0.5,  0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 0.0]),
            PbrVertex::new([ 0.5,  0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 0.0]),
            // Left face (X-)
            PbrVertex::new([-0.5, -0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 1.0]),
            PbrVertex::new([-0.5, -0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 1.0]),
            PbrVertex::new([-0.5,  0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 0.0]),
            PbrVertex::new([-0.5,  0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 0.0]),
        ];

        #[rustfmt::skip]
        let indices: Vec<u16> = vec![
            0,  1,  2,  2,  3,  0,  // front
            4,  5,  6,  6,  7,  4,  // back
            8,  9,  10, 10, 11, 8,  // top
            12, 13, 14, 14, 15, 12, // bottom
            16, 17, 18, 18, 19, 16, // right
            20, 21, 22, 22, 23, 20, // left
        ];

        let mut mesh = Self::new(vertices, IndexData::U16(indices));
        mesh.compute_tangents();
        mesh
    }

    /// A UV sphere of radius 0.5 with `(segments + 1) × (rings + 1)` vertices.
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();

                let position = [x * 0.5, y * 0.5, z * 0.5];
                let normal = [x, y, z];
                let uv = [seg as f32 / segments as f32, ring as f32 / rings as f32];

                vertices.push(PbrVertex::new(position, normal, uv));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                indices.extend_from_slice(&[current, current + 1, next]);
                indices.extend_from_slice(&[current + 1, next + 1, next]);
            }
        }

        let mut mesh = Self::new(vertices, IndexData::U32(indices));
        mesh.compute_tangents();
        mesh
    }

    /// A square on the XZ plane facing +Y.
    pub fn plane(size: f32) -> Self {
        let half = size * 0.5;
        let vertices = vec![
            PbrVertex::new([-half, 0.0, -half], [0.0, 1.0, 0.0], [0.0, 0.0]),
            PbrVertex::new([-half, 0.0, half], [0.0, 1.0, 0.0], [0.0, 1.0]),
            PbrVertex::new([half, 0.0, half], [0.0, 1.0, 0.0], [1.0, 1.0]),
            PbrVertex::new([half, 0.0, -half], [0.0, 1.0, 0.0], [1.0, 0.0]),
        ];

        let mut mesh = Self::new(vertices, IndexData::U16(vec![0, 1, 2, 2, 3, 0]));
        mesh.compute_tangents();
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_56_bytes() {
        assert_eq!(std::mem::size_of::<PbrVertex>(), 56);
        assert_eq!(PbrVertex::LAYOUT.array_stride, 56);
        assert_eq!(PbrVertex::LAYOUT.attributes[4].offset, 48);
    }

    #[test]
    fn mesh_data_bounds() {
        let vertices = vec![
            PbrVertex::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            PbrVertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            PbrVertex::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let mesh = MeshData::new(vertices, IndexData::U16(vec![0, 1, 2]));

        let (min, max) = mesh.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn index_width_is_preserved() {
        let short = IndexData::U16(vec![0, 1, 2]);
        let long = IndexData::U32(vec![0, 1, 2]);

        assert_eq!(short.format(), wgpu::IndexFormat::Uint16);
        assert_eq!(short.as_bytes().len(), 6);
        assert_eq!(long.format(), wgpu::IndexFormat::Uint32);
        assert_eq!(long.as_bytes().len(), 12);
        assert_eq!(short.to_u32(), long.to_u32());
    }

    #[test]
    fn plane_tangent_frame_follows_uvs() {
        let plane = MeshData::plane(2.0);

        for v in &plane.vertices {
            let t = Vec3::from(v.tangent);
            let b = Vec3::from(v.bitangent);
            let n = Vec3::from(v.normal);
            assert!((t - Vec3::X).length() < 1e-5, "tangent {t}");
            assert!((b - Vec3::Z).length() < 1e-5, "bitangent {b}");
            assert!(t.dot(n).abs() < 1e-5);
        }
    }

    #[test]
    fn cube_tangents_are_perpendicular_to_normals() {
        let cube = MeshData::cube();

        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for v in &cube.vertices {
            let t = Vec3::from(v.tangent);
            let n = Vec3::from(v.normal);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(n).abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_uvs_still_get_a_frame() {
        let vertices = vec![
            PbrVertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            PbrVertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            PbrVertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ];
        let mut mesh = MeshData::new(vertices, IndexData::U16(vec![0, 1, 2]));
        mesh.compute_tangents();

        for v in &mesh.vertices {
            let t = Vec3::from(v.tangent);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(Vec3::Z).abs() < 1e-5);
        }
    }
}
