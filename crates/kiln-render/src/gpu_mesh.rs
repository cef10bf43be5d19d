//! GPU mesh upload and caching

use crate::primitives::MeshData;
use kiln_core::MeshId;
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// Vertex/index buffers for one uploaded mesh
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Cache of uploaded meshes keyed by handle
#[derive(Default)]
pub struct MeshCache {
    meshes: HashMap<MeshId, GpuMesh>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the GPU mesh for a handle, uploading it on first use
    pub fn get_or_upload(
        &mut self,
        device: &wgpu::Device,
        id: MeshId,
        mesh: &MeshData,
    ) -> &GpuMesh {
        self.meshes
            .entry(id)
            .or_insert_with(|| GpuMesh::upload(device, mesh))
    }

    pub fn get(&self, id: MeshId) -> Option<&GpuMesh> {
        self.meshes.get(&id)
    }
}
