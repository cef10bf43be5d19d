//! Pipeline setup: uniform layouts and every (shader, blend, cull, depth)
//! variant the frame graph can request
//!
//! GL-era render state (blend func, cull face, depth func) becomes a small
//! cross product of prebuilt pipelines; the executor picks one per draw
//! command. Forward additive accumulation keeps the original src-alpha/one
//! blend, the deferred lighting quad accumulates one/one.

use crate::frame::{BlendMode, ShaderId};
use crate::primitives::Vertex;
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;

/// Per-draw uniforms for the forward "light" shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ForwardUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// Slot 0 holds the single shadow matrix; all four are read when the
    /// light is a cascaded directional
    pub shadow_viewproj: [[[f32; 4]; 4]; 4],
    pub camera_pos: [f32; 4],
    pub ambient: [f32; 4],
    pub color: [f32; 4],
    /// xyz emissive factor, w UV tiling factor
    pub emissive_tiling: [f32; 4],
    /// xyz light position, w intensity
    pub light_pos_intensity: [f32; 4],
    /// xyz light color, w attenuation radius
    pub light_color_maxdist: [f32; 4],
    /// xyz light direction, w cos(spot half-angle)
    pub light_dir_spotcos: [f32; 4],
    /// x spot exponent, y alpha cutoff
    pub params: [f32; 4],
    /// x light type, y is_cascade, z has_light, w has_shadow_map
    pub flags: [u32; 4],
}

/// Per-draw uniforms for the unlit "flat" shader (also the shadow depth path)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FlatUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub color: [f32; 4],
}

/// Per-draw uniforms for the G-buffer write shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GBufferUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub color: [f32; 4],
    /// x alpha cutoff, y UV tiling factor
    pub params: [f32; 4],
}

/// Per-light uniforms for the deferred lighting quad
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PospoUniforms {
    pub inverse_view_proj: [[f32; 4]; 4],
    pub shadow_viewproj: [[[f32; 4]; 4]; 4],
    pub camera_pos: [f32; 4],
    pub ambient: [f32; 4],
    /// xy = 1/width, 1/height of the target
    pub i_res: [f32; 4],
    pub light_pos_intensity: [f32; 4],
    pub light_color_maxdist: [f32; 4],
    pub light_dir_spotcos: [f32; 4],
    /// x spot exponent
    pub params: [f32; 4],
    /// x light type, y is_cascade, z has_light, w has_shadow_map
    pub flags: [u32; 4],
}

/// Uniforms for the linearized-depth debug view
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DepthVizUniforms {
    /// x near plane, y far plane
    pub near_far: [f32; 4],
}

/// G-buffer color attachment format (albedo, normal, metal-roughness)
pub const GBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Depth format shared by every depth attachment
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Key for the forward pipeline variants
pub type ForwardKey = (BlendMode, bool /* two_sided */, bool /* depth_test */);

/// All prebuilt pipelines plus the bind group layouts the executor needs
/// to assemble per-draw bind groups
pub struct Pipelines {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub forward_texture_layout: wgpu::BindGroupLayout,
    pub gbuffer_texture_layout: wgpu::BindGroupLayout,
    pub pospo_texture_layout: wgpu::BindGroupLayout,
    pub blit_texture_layout: wgpu::BindGroupLayout,
    pub depth_texture_layout: wgpu::BindGroupLayout,

    pub forward: HashMap<ForwardKey, wgpu::RenderPipeline>,
    pub flat_color: wgpu::RenderPipeline,
    pub shadow_depth: wgpu::RenderPipeline,
    pub gbuffer: HashMap<BlendMode, wgpu::RenderPipeline>,
    pub pospo: HashMap<BlendMode, wgpu::RenderPipeline>,
    pub blit: wgpu::RenderPipeline,
    pub depth_viz: wgpu::RenderPipeline,
}

/// Blend state per (shader, mode); `None` disables blending
fn blend_state(shader: ShaderId, blend: BlendMode) -> Option<wgpu::BlendState> {
    match blend {
        BlendMode::Opaque => None,
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Additive => {
            let color = if shader == ShaderId::DeferredPospo {
                // Deferred lights accumulate one + one
                wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                }
            } else {
                // Forward lights accumulate src-alpha + one
                wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                }
            };
            Some(wgpu::BlendState {
                color,
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            })
        }
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn depth_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn comparison_sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
        count: None,
    }
}

/// Everything needed to build one pipeline variant
struct PipelineDesc<'a> {
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    layout: &'a wgpu::PipelineLayout,
    vs_entry: &'a str,
    fs_entry: Option<&'a str>,
    vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    targets: &'a [Option<wgpu::ColorTargetState>],
    cull_back: bool,
    depth: Option<wgpu::DepthStencilState>,
}

fn create_pipeline(device: &wgpu::Device, desc: PipelineDesc) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: Some(desc.vs_entry),
            buffers: desc.vertex_buffers,
            compilation_options: Default::default(),
        },
        fragment: desc.fs_entry.map(|entry| wgpu::FragmentState {
            module: desc.module,
            entry_point: Some(entry),
            targets: desc.targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_back.then_some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: desc.depth,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn depth_state(depth_test: bool, write: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: if depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let light_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Light Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("light.wgsl").into()),
        });
        let flat_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Flat Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("flat.wgsl").into()),
        });
        let deferred_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Deferred Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("deferred.wgsl").into()),
        });
        let pospo_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Deferred Pospo Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("deferred_pospo.wgsl").into()),
        });
        let depth_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Depth Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("depth.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0)],
            label: Some("Uniform Bind Group Layout"),
        });

        // Forward textures: color, emissive, shadow map
        let forward_texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    texture_entry(0),
                    sampler_entry(1),
                    texture_entry(2),
                    sampler_entry(3),
                    depth_texture_entry(4),
                    comparison_sampler_entry(5),
                ],
                label: Some("Forward Texture Bind Group Layout"),
            });

        // G-buffer write: color, metallic-roughness
        let gbuffer_texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    texture_entry(0),
                    sampler_entry(1),
                    texture_entry(2),
                    sampler_entry(3),
                ],
                label: Some("GBuffer Texture Bind Group Layout"),
            });

        // Deferred lighting: three G-buffer channels, scene depth, shadow map
        let pospo_texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    texture_entry(0),
                    texture_entry(1),
                    texture_entry(2),
                    depth_texture_entry(3),
                    sampler_entry(4),
                    depth_texture_entry(5),
                    comparison_sampler_entry(6),
                ],
                label: Some("Pospo Texture Bind Group Layout"),
            });

        // Bindings 1/2 of group 0: binding 0 is the depth-viz uniform in the
        // shared shader module
        let blit_texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[texture_entry(1), sampler_entry(2)],
                label: Some("Blit Texture Bind Group Layout"),
            });

        let depth_texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[depth_texture_entry(0)],
                label: Some("Depth Viz Bind Group Layout"),
            });

        let forward_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Forward Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &forward_texture_layout],
            push_constant_ranges: &[],
        });
        let flat_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Flat Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let gbuffer_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("GBuffer Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &gbuffer_texture_layout],
            push_constant_ranges: &[],
        });
        let pospo_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pospo Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &pospo_texture_layout],
            push_constant_ranges: &[],
        });
        let blit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&blit_texture_layout],
            push_constant_ranges: &[],
        });
        let depth_viz_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Depth Viz Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &depth_texture_layout],
            push_constant_ranges: &[],
        });

        // Forward variants: blend x cull x depth-test
        let mut forward = HashMap::new();
        for blend in [BlendMode::Opaque, BlendMode::Alpha, BlendMode::Additive] {
            for two_sided in [false, true] {
                for depth_test in [false, true] {
                    let pipeline = create_pipeline(
                        device,
                        PipelineDesc {
                            label: "Forward Pipeline",
                            module: &light_shader,
                            layout: &forward_layout,
                            vs_entry: "vs_main",
                            fs_entry: Some("fs_main"),
                            vertex_buffers: &[Vertex::desc()],
                            targets: &[Some(wgpu::ColorTargetState {
                                format: surface_format,
                                blend: blend_state(ShaderId::Light, blend),
                                write_mask: wgpu::ColorWrites::ALL,
                            })],
                            cull_back: !two_sided,
                            depth: Some(depth_state(depth_test, depth_test)),
                        },
                    );
                    forward.insert((blend, two_sided, depth_test), pipeline);
                }
            }
        }

        // Unlit flat color (light gizmos): drawn over everything
        let flat_color = create_pipeline(
            device,
            PipelineDesc {
                label: "Flat Color Pipeline",
                module: &flat_shader,
                layout: &flat_layout,
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                vertex_buffers: &[Vertex::desc()],
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                cull_back: true,
                depth: Some(depth_state(false, false)),
            },
        );

        // Depth-only shadow pipeline; bias fights acne on the shadow maps
        let shadow_depth = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Depth Pipeline"),
            layout: Some(&flat_layout),
            vertex: wgpu::VertexState {
                module: &flat_shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: None, // Depth only, no fragment shader
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // G-buffer write: blending (when a translucent material sneaks in)
        // applies to all three targets, as GL draw buffers did
        let mut gbuffer = HashMap::new();
        for blend in [BlendMode::Opaque, BlendMode::Alpha] {
            let target = |format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend: blend_state(ShaderId::Deferred, blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            };
            let pipeline = create_pipeline(
                device,
                PipelineDesc {
                    label: "GBuffer Pipeline",
                    module: &deferred_shader,
                    layout: &gbuffer_layout,
                    vs_entry: "vs_main",
                    fs_entry: Some("fs_main"),
                    vertex_buffers: &[Vertex::desc()],
                    targets: &[
                        target(GBUFFER_FORMAT),
                        target(GBUFFER_FORMAT),
                        target(GBUFFER_FORMAT),
                    ],
                    cull_back: false,
                    depth: Some(depth_state(true, true)),
                },
            );
            gbuffer.insert(blend, pipeline);
        }

        // Deferred lighting quad: first light replaces, the rest add
        let mut pospo = HashMap::new();
        for blend in [BlendMode::Opaque, BlendMode::Additive] {
            let pipeline = create_pipeline(
                device,
                PipelineDesc {
                    label: "Pospo Pipeline",
                    module: &pospo_shader,
                    layout: &pospo_layout,
                    vs_entry: "vs_fullscreen",
                    fs_entry: Some("fs_main"),
                    vertex_buffers: &[],
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: blend_state(ShaderId::DeferredPospo, blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    cull_back: false,
                    depth: None,
                },
            );
            pospo.insert(blend, pipeline);
        }

        // G-buffer channel blit for the debug quadrant view
        let blit = create_pipeline(
            device,
            PipelineDesc {
                label: "Blit Pipeline",
                module: &depth_shader,
                layout: &blit_layout,
                vs_entry: "vs_fullscreen",
                fs_entry: Some("fs_blit"),
                vertex_buffers: &[],
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                cull_back: false,
                depth: None,
            },
        );

        // Linearized depth for the fourth debug quadrant
        let depth_viz = create_pipeline(
            device,
            PipelineDesc {
                label: "Depth Viz Pipeline",
                module: &depth_shader,
                layout: &depth_viz_layout,
                vs_entry: "vs_fullscreen",
                fs_entry: Some("fs_depth"),
                vertex_buffers: &[],
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                cull_back: false,
                depth: None,
            },
        );

        Self {
            uniform_layout,
            forward_texture_layout,
            gbuffer_texture_layout,
            pospo_texture_layout,
            blit_texture_layout,
            depth_texture_layout,
            forward,
            flat_color,
            shadow_depth,
            gbuffer,
            pospo,
            blit,
            depth_viz,
        }
    }
}
