//! Mesh primitives (plane, box, pyramid)
//!
//! Procedural geometry used by scene-population helpers and tests. Real
//! content arrives through the asset-loading collaborator as the same
//! `MeshData` shape.

use bytemuck::{Pod, Zeroable};
use kiln_core::{Aabb, Vec3};

/// A vertex with position, normal, and UV coordinates
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// CPU-side mesh: vertices, triangle indices, local-space bounds
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl MeshData {
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let positions: Vec<[f32; 3]> = vertices.iter().map(|v| v.position).collect();
        let bounds = Aabb::from_points(&positions)
            .unwrap_or_else(|| Aabb::new(Vec3::ZERO, Vec3::ZERO));
        Self {
            name: name.into(),
            vertices,
            indices,
            bounds,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Create a flat ground plane of `size` x `size` centered at the origin,
/// facing +Y, with UVs spanning the full tile once
pub fn create_plane_mesh(size: f32) -> MeshData {
    let h = size / 2.0;
    let normal = [0.0, 1.0, 0.0];

    let vertices = vec![
        Vertex {
            position: [-h, 0.0, -h],
            normal,
            uv: [0.0, 0.0],
        },
        Vertex {
            position: [h, 0.0, -h],
            normal,
            uv: [1.0, 0.0],
        },
        Vertex {
            position: [h, 0.0, h],
            normal,
            uv: [1.0, 1.0],
        },
        Vertex {
            position: [-h, 0.0, h],
            normal,
            uv: [0.0, 1.0],
        },
    ];
    let indices = vec![0, 2, 1, 0, 3, 2];

    MeshData::new("plane", vertices, indices)
}

/// Create an axis-aligned box mesh with per-face normals
pub fn create_box_mesh(width: f32, height: f32, depth: f32) -> MeshData {
    let hw = width / 2.0;
    let hh = height / 2.0;
    let hd = depth / 2.0;

    // (normal, four corners in CCW order seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-hw, -hh, hd], [hw, -hh, hd], [hw, hh, hd], [-hw, hh, hd]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[hw, -hh, -hd], [-hw, -hh, -hd], [-hw, hh, -hd], [hw, hh, -hd]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[hw, -hh, hd], [hw, -hh, -hd], [hw, hh, -hd], [hw, hh, hd]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-hw, -hh, -hd], [-hw, -hh, hd], [-hw, hh, hd], [-hw, hh, -hd]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-hw, hh, hd], [hw, hh, hd], [hw, hh, -hd], [-hw, hh, -hd]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-hw, -hh, -hd], [hw, -hh, -hd], [hw, -hh, hd], [-hw, -hh, hd]],
        ),
    ];

    let face_uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(face_uvs) {
            vertices.push(Vertex {
                position: *corner,
                normal,
                uv,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::new("box", vertices, indices)
}

/// Create a square pyramid (light-gizmo marker shape): apex at +Y,
/// unit base on the XZ plane
pub fn create_pyramid_mesh(base: f32, height: f32) -> MeshData {
    let hb = base / 2.0;
    let apex = [0.0, height, 0.0];

    let corners = [
        [-hb, 0.0, -hb],
        [hb, 0.0, -hb],
        [hb, 0.0, hb],
        [-hb, 0.0, hb],
    ];

    let mut vertices = Vec::with_capacity(16);
    let mut indices = Vec::with_capacity(18);

    // Four slanted sides, one flat-shaded normal each
    for i in 0..4 {
        let a = Vec3::from_array(corners[i]);
        let b = Vec3::from_array(corners[(i + 1) % 4]);
        let apex_v = Vec3::from_array(apex);
        let normal = (b - a).cross(&(apex_v - a)).normalized().to_array();

        let base_idx = vertices.len() as u32;
        vertices.push(Vertex {
            position: a.to_array(),
            normal,
            uv: [0.0, 1.0],
        });
        vertices.push(Vertex {
            position: b.to_array(),
            normal,
            uv: [1.0, 1.0],
        });
        vertices.push(Vertex {
            position: apex,
            normal,
            uv: [0.5, 0.0],
        });
        indices.extend_from_slice(&[base_idx, base_idx + 1, base_idx + 2]);
    }

    // Base
    let down = [0.0, -1.0, 0.0];
    let base_idx = vertices.len() as u32;
    for (corner, uv) in corners.iter().zip([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]) {
        vertices.push(Vertex {
            position: *corner,
            normal: down,
            uv,
        });
    }
    indices.extend_from_slice(&[
        base_idx,
        base_idx + 1,
        base_idx + 2,
        base_idx,
        base_idx + 2,
        base_idx + 3,
    ]);

    MeshData::new("pyramid", vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_bounds() {
        let plane = create_plane_mesh(1000.0);
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.index_count(), 6);
        assert!((plane.bounds.half_size.x - 500.0).abs() < 1e-3);
        assert!((plane.bounds.half_size.y - 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_box_mesh_shape() {
        let mesh = create_box_mesh(2.0, 4.0, 6.0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        assert!((mesh.bounds.half_size - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_pyramid_mesh_shape() {
        let mesh = create_pyramid_mesh(2.0, 3.0);
        assert_eq!(mesh.index_count(), 4 * 3 + 6);
        assert!((mesh.bounds.max().y - 3.0).abs() < 1e-5);
        assert!((mesh.bounds.min().y - 0.0).abs() < 1e-5);
    }
}
