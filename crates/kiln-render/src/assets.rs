//! Registries for the external collaborator resources the core consumes
//!
//! Meshes, materials and textures arrive from the asset-loading collaborator
//! already parsed; the store hands out index handles and the narrow
//! per-resource views the renderer needs. Lookups return `Option` so a
//! dangling handle degrades to a skipped draw instead of a panic.

use crate::primitives::MeshData;
use kiln_core::{Color, MaterialId, MeshId, TextureId, Vec3};
use std::path::Path;

/// How a material's alpha channel is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    /// Cutout: fragments below `alpha_cutoff` are discarded
    Mask,
    /// Translucent: alpha-blended over what is already in the target
    Blend,
}

/// Shading parameters for a mesh surface
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub base_color: Color,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub two_sided: bool,
    pub emissive_factor: Vec3,
    /// UV multiplier for tiled surfaces (ground planes etc.)
    pub tiling_factor: f32,
    pub color_texture: Option<TextureId>,
    pub emissive_texture: Option<TextureId>,
    pub metallic_roughness_texture: Option<TextureId>,
    /// Carried for completeness; the core's shading does not sample it
    pub normal_texture: Option<TextureId>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: Color::WHITE,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            two_sided: false,
            emissive_factor: Vec3::ZERO,
            tiling_factor: 1.0,
            color_texture: None,
            emissive_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The cutoff uploaded to shaders: MASK materials supply their
    /// threshold, every other mode passes zero (no cutout).
    pub fn effective_alpha_cutoff(&self) -> f32 {
        if self.alpha_mode == AlphaMode::Mask {
            self.alpha_cutoff
        } else {
            0.0
        }
    }
}

/// A decoded RGBA8 texture ready for GPU upload
pub struct TextureData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Wrap raw RGBA8 pixels; length must be width * height * 4
    pub fn from_rgba8(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            name: name.into(),
            width,
            height,
            pixels,
        }
    }

    /// Decode an image file into RGBA8
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let img = image::open(path)
            .map_err(|e| format!("Failed to open image '{}': {}", path.display(), e))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("texture")
            .to_string();
        Ok(Self {
            name,
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

/// Owns the mesh/material/texture definitions the scene references by handle
#[derive(Default)]
pub struct AssetStore {
    meshes: Vec<MeshData>,
    materials: Vec<Material>,
    textures: Vec<TextureData>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshId {
        let id = MeshId::from_raw(self.meshes.len() as u32);
        log::debug!("registered mesh '{}' as {:?}", mesh.name, id);
        self.meshes.push(mesh);
        id
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshData> {
        self.meshes.get(id.index())
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId::from_raw(self.materials.len() as u32);
        self.materials.push(material);
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.index())
    }

    pub fn add_texture(&mut self, texture: TextureData) -> TextureId {
        let id = TextureId::from_raw(self.textures.len() as u32);
        self.textures.push(texture);
        id
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureData> {
        self.textures.get(id.index())
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::create_box_mesh;

    #[test]
    fn test_store_roundtrip() {
        let mut store = AssetStore::new();
        let mesh = store.add_mesh(create_box_mesh(1.0, 1.0, 1.0));
        let material = store.add_material(Material::new("asphalt"));

        assert_eq!(store.mesh(mesh).unwrap().name, "box");
        assert_eq!(store.material(material).unwrap().name, "asphalt");
    }

    #[test]
    fn test_dangling_handle_is_none() {
        let store = AssetStore::new();
        assert!(store.mesh(MeshId::from_raw(3)).is_none());
        assert!(store.material(MaterialId::from_raw(0)).is_none());
    }

    #[test]
    fn test_mask_mode_supplies_cutoff() {
        let mut material = Material::new("leaves");
        material.alpha_cutoff = 0.35;

        material.alpha_mode = AlphaMode::Opaque;
        assert_eq!(material.effective_alpha_cutoff(), 0.0);

        material.alpha_mode = AlphaMode::Mask;
        assert_eq!(material.effective_alpha_cutoff(), 0.35);

        material.alpha_mode = AlphaMode::Blend;
        assert_eq!(material.effective_alpha_cutoff(), 0.0);
    }
}
