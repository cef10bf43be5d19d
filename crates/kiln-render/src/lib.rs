//! Kiln Render - wgpu renderer for Kiln scenes
//!
//! Frames are built in two stages: a pure frame-graph builder walks the
//! scene graph (frustum culling, per-light accumulation, shadow cascade
//! scheduling) and produces an ordered command list; the executor encodes
//! that list onto wgpu. Two color pipelines are supported - shadow-mapped
//! multi-light forward, and a G-buffer deferred path - over the same
//! shadow-map generation.

mod assets;
mod context;
mod demo;
mod frame;
mod gbuffer;
mod gpu_mesh;
mod pipeline;
mod primitives;
mod renderer;
mod settings;
mod shadow;
mod texture_cache;

pub use assets::{AlphaMode, AssetStore, Material, TextureData};
pub use context::{create_depth_texture, ContextError, HeadlessContext, RenderContext};
pub use demo::build_demo_scene;
pub use frame::{
    build_frame, BlendMode, DrawCommand, FrameBuilder, FrameGraph, LightBinding, MeshRef, Pass,
    PassTarget, RenderMode, ShaderId, Viewport,
};
pub use gbuffer::{GBuffer, GBufferTarget};
pub use gpu_mesh::{GpuMesh, MeshCache};
pub use pipeline::{
    DepthVizUniforms, FlatUniforms, ForwardUniforms, GBufferUniforms, Pipelines, PospoUniforms,
    DEPTH_FORMAT, GBUFFER_FORMAT,
};
pub use primitives::{
    create_box_mesh, create_plane_mesh, create_pyramid_mesh, MeshData, Vertex,
};
pub use renderer::{Renderer, ShadowTarget};
pub use settings::{PipelineMode, RendererSettings};
pub use shadow::{
    build_shadow_passes, snap_view_to_texel_grid, CASCADE_EXTENT_FACTORS, SHADOW_WORLD_EXTENT,
};
pub use texture_cache::{GpuTexture, TextureCache};

#[cfg(test)]
mod tests {
    #[test]
    fn light_wgsl_parses() {
        let source = include_str!("light.wgsl");
        naga::front::wgsl::parse_str(source).expect("light.wgsl failed to parse");
    }

    #[test]
    fn flat_wgsl_parses() {
        let source = include_str!("flat.wgsl");
        naga::front::wgsl::parse_str(source).expect("flat.wgsl failed to parse");
    }

    #[test]
    fn deferred_wgsl_parses() {
        let source = include_str!("deferred.wgsl");
        naga::front::wgsl::parse_str(source).expect("deferred.wgsl failed to parse");
    }

    #[test]
    fn deferred_pospo_wgsl_parses() {
        let source = include_str!("deferred_pospo.wgsl");
        naga::front::wgsl::parse_str(source).expect("deferred_pospo.wgsl failed to parse");
    }

    #[test]
    fn depth_wgsl_parses() {
        let source = include_str!("depth.wgsl");
        naga::front::wgsl::parse_str(source).expect("depth.wgsl failed to parse");
    }
}
