//! Deferred G-buffer resources
//!
//! Three color targets (albedo, world normal, metal-roughness) plus depth,
//! created lazily at window resolution and reused until a resize.

use crate::pipeline::{DEPTH_FORMAT, GBUFFER_FORMAT};

/// One G-buffer color attachment
pub struct GBufferTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

fn create_target(device: &wgpu::Device, width: u32, height: u32, label: &str) -> GBufferTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: GBUFFER_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GBufferTarget { texture, view }
}

/// The geometry-pass target set
pub struct GBuffer {
    pub width: u32,
    pub height: u32,
    pub albedo: GBufferTarget,
    pub normal: GBufferTarget,
    pub metal_rough: GBufferTarget,
    pub depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    /// Sampler for reading the color channels in the lighting pass
    pub sampler: wgpu::Sampler,
}

impl GBuffer {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        log::debug!("allocating {}x{} G-buffer", width, height);

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("GBuffer Depth"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("GBuffer Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            width,
            height,
            albedo: create_target(device, width, height, "GBuffer Albedo"),
            normal: create_target(device, width, height, "GBuffer Normal"),
            metal_rough: create_target(device, width, height, "GBuffer MetalRough"),
            depth_texture,
            depth_view,
            sampler,
        }
    }

    /// True when the buffer no longer matches the target resolution
    pub fn needs_resize(&self, width: u32, height: u32) -> bool {
        self.width != width || self.height != height
    }
}
