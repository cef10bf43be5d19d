//! GPU texture cache - uploads asset textures and provides default fallbacks

use crate::assets::TextureData;
use kiln_core::TextureId;
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// A GPU-resident texture with its view and sampler
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Cache of GPU textures keyed by handle, with built-in defaults.
/// The white texture doubles as the "fully lit" shadow-map placeholder for
/// lights whose map has not been generated yet.
pub struct TextureCache {
    textures: HashMap<TextureId, GpuTexture>,
    /// 1x1 white texture (default base color / shadow placeholder)
    pub default_white: GpuTexture,
    /// 1x1 black texture (default metallic-roughness / emissive)
    pub default_black: GpuTexture,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let default_white = Self::create_1x1(device, queue, [255, 255, 255, 255], "Default White");
        let default_black = Self::create_1x1(device, queue, [0, 0, 0, 255], "Default Black");

        Self {
            textures: HashMap::new(),
            default_white,
            default_black,
        }
    }

    fn create_1x1(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: [u8; 4],
        label: &str,
    ) -> GpuTexture {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &color,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        GpuTexture {
            texture,
            view,
            sampler,
        }
    }

    /// Upload a decoded texture to the GPU; no-op if already resident
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        id: TextureId,
        data: &TextureData,
    ) {
        if self.textures.contains_key(&id) {
            return;
        }

        log::debug!(
            "uploading texture '{}' ({}x{}) as {:?}",
            data.name,
            data.width,
            data.height,
            id
        );

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(&data.name),
                size: wgpu::Extent3d {
                    width: data.width,
                    height: data.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data.pixels,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", data.name)),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            ..Default::default()
        });

        self.textures.insert(
            id,
            GpuTexture {
                texture,
                view,
                sampler,
            },
        );
    }

    /// Get a resident texture, or None if never uploaded
    pub fn get(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    /// Resolve an optional slot to a resident texture, falling back to white
    pub fn get_or_white(&self, id: Option<TextureId>) -> &GpuTexture {
        id.and_then(|id| self.get(id)).unwrap_or(&self.default_white)
    }

    /// Resolve an optional slot to a resident texture, falling back to black
    pub fn get_or_black(&self, id: Option<TextureId>) -> &GpuTexture {
        id.and_then(|id| self.get(id)).unwrap_or(&self.default_black)
    }
}
