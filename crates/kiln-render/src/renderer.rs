//! Frame-graph execution on wgpu
//!
//! `Renderer` owns the GPU-side state that outlives a frame: pipelines,
//! mesh/texture caches, per-light shadow targets and the G-buffer. Each
//! frame it builds the graph (pure data), prepares any missing GPU
//! resources, then encodes the passes in graph order - shadow maps for
//! every light strictly before the color pass that samples them.

use crate::assets::AssetStore;
use crate::frame::{
    self, DrawCommand, FrameGraph, LightBinding, MeshRef, PassTarget, ShaderId,
};
use crate::gbuffer::GBuffer;
use crate::gpu_mesh::MeshCache;
use crate::pipeline::{
    DepthVizUniforms, FlatUniforms, ForwardUniforms, GBufferUniforms, Pipelines, PospoUniforms,
    DEPTH_FORMAT,
};
use crate::settings::RendererSettings;
use crate::texture_cache::TextureCache;
use kiln_core::{mat4_inverse, EntityId};
use kiln_scene::{Camera, Scene};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// A light's depth-only render target
pub struct ShadowTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

fn create_shadow_target(device: &wgpu::Device, width: u32, height: u32, label: &str) -> ShadowTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    ShadowTarget {
        texture,
        view,
        width,
        height,
    }
}

/// The wgpu executor for Kiln frame graphs
pub struct Renderer {
    pipelines: Pipelines,
    mesh_cache: MeshCache,
    texture_cache: TextureCache,
    /// One depth target per shadow-casting light, created on its first
    /// shadow pass and reused for the light's lifetime
    shadow_targets: HashMap<EntityId, ShadowTarget>,
    shadow_sampler: wgpu::Sampler,
    /// 1x1 depth texture cleared to 1.0: the "fully lit" placeholder bound
    /// for lights whose map has not been generated
    placeholder_shadow: ShadowTarget,
    gbuffer: Option<GBuffer>,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let pipelines = Pipelines::new(device, surface_format);
        let texture_cache = TextureCache::new(device, queue);

        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            compare: Some(wgpu::CompareFunction::LessEqual),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Clear the placeholder once so unsampled lights read full depth
        let placeholder_shadow = create_shadow_target(device, 1, 1, "Placeholder Shadow");
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Placeholder Shadow Clear"),
        });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Placeholder Shadow Clear Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &placeholder_shadow.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        queue.submit(std::iter::once(encoder.finish()));

        Self {
            pipelines,
            mesh_cache: MeshCache::new(),
            texture_cache,
            shadow_targets: HashMap::new(),
            shadow_sampler,
            placeholder_shadow,
            gbuffer: None,
        }
    }

    /// Build and render one frame. Runs the per-frame scene update, shadow
    /// generation for all lights, then the selected color pipeline.
    #[allow(clippy::too_many_arguments)]
    pub fn render_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &mut Scene,
        assets: &AssetStore,
        camera: &Camera,
        settings: &RendererSettings,
        target_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) {
        let graph = frame::build_frame(scene, assets, camera, settings);
        self.prepare(device, queue, scene, assets, &graph, width, height);
        self.encode(
            device, queue, scene, assets, camera, settings, &graph, target_view, depth_view,
            width, height,
        );
    }

    /// Create every GPU resource the graph will touch, so encoding can run
    /// against an immutable renderer.
    fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        assets: &AssetStore,
        graph: &FrameGraph,
        width: u32,
        height: u32,
    ) {
        for pass in &graph.passes {
            match &pass.target {
                PassTarget::ShadowMap { light, .. } => {
                    let light = &scene.lights[*light];
                    let id = light.info.id;
                    if !self.shadow_targets.contains_key(&id) {
                        let info = light
                            .shadow_map
                            .expect("shadow pass implies an allocated descriptor");
                        log::debug!(
                            "creating {}x{} shadow texture for light '{}'",
                            info.width,
                            info.height,
                            light.info.name
                        );
                        self.shadow_targets.insert(
                            id,
                            create_shadow_target(device, info.width, info.height, "Shadow Map"),
                        );
                    }
                }
                PassTarget::GBuffer => {
                    let stale = self
                        .gbuffer
                        .as_ref()
                        .map(|g| g.needs_resize(width, height))
                        .unwrap_or(true);
                    if stale {
                        self.gbuffer = Some(GBuffer::new(device, width, height));
                    }
                }
                PassTarget::Surface { .. } => {}
            }

            for command in &pass.commands {
                if let MeshRef::Mesh(id) = command.mesh {
                    if let Some(mesh) = assets.mesh(id) {
                        self.mesh_cache.get_or_upload(device, id, mesh);
                    }
                }
                if let Some(material_id) = command.material {
                    if let Some(material) = assets.material(material_id) {
                        for slot in [
                            material.color_texture,
                            material.emissive_texture,
                            material.metallic_roughness_texture,
                        ] {
                            if let Some(texture_id) = slot {
                                if let Some(data) = assets.texture(texture_id) {
                                    self.texture_cache.upload(device, queue, texture_id, data);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    fn shadow_view_for(&self, scene: &Scene, binding: &LightBinding) -> &wgpu::TextureView {
        if binding.has_shadow_map {
            if let Some(target) = self
                .shadow_targets
                .get(&scene.lights[binding.index].info.id)
            {
                return &target.view;
            }
        }
        &self.placeholder_shadow.view
    }

    fn draw_uniform_bind_group(
        &self,
        device: &wgpu::Device,
        contents: &[u8],
    ) -> wgpu::BindGroup {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw Uniform"),
            contents,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.pipelines.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("Draw Uniform Bind Group"),
        })
    }

    fn forward_uniforms(
        &self,
        assets: &AssetStore,
        command: &DrawCommand,
    ) -> ForwardUniforms {
        let material = command.material.and_then(|id| assets.material(id));
        let (emissive, tiling) = material
            .map(|m| (m.emissive_factor.to_array(), m.tiling_factor))
            .unwrap_or(([0.0; 3], 1.0));

        let mut uniforms = ForwardUniforms {
            view_proj: command.camera_viewprojection,
            model: command.model,
            shadow_viewproj: [kiln_core::mat4_identity(); 4],
            camera_pos: [
                command.camera_eye[0],
                command.camera_eye[1],
                command.camera_eye[2],
                1.0,
            ],
            ambient: [command.ambient[0], command.ambient[1], command.ambient[2], 0.0],
            color: command.color,
            emissive_tiling: [emissive[0], emissive[1], emissive[2], tiling],
            light_pos_intensity: [0.0; 4],
            light_color_maxdist: [0.0; 4],
            light_dir_spotcos: [0.0; 4],
            params: [0.0, command.alpha_cutoff, 0.0, 0.0],
            flags: [0; 4],
        };

        if let Some(light) = &command.light {
            uniforms.shadow_viewproj = if light.is_cascade {
                light.cascade_viewprojection
            } else {
                [light.shadow_viewprojection; 4]
            };
            uniforms.light_pos_intensity = [
                light.position[0],
                light.position[1],
                light.position[2],
                light.intensity,
            ];
            uniforms.light_color_maxdist = [
                light.color[0],
                light.color[1],
                light.color[2],
                light.max_dist,
            ];
            uniforms.light_dir_spotcos = [
                light.direction[0],
                light.direction[1],
                light.direction[2],
                light.spot_cosine,
            ];
            uniforms.params[0] = light.spot_exponent;
            uniforms.flags = [
                light.kind.as_u32(),
                light.is_cascade as u32,
                1,
                light.has_shadow_map as u32,
            ];
        }

        uniforms
    }

    fn forward_texture_bind_group(
        &self,
        device: &wgpu::Device,
        scene: &Scene,
        assets: &AssetStore,
        command: &DrawCommand,
    ) -> wgpu::BindGroup {
        let material = command.material.and_then(|id| assets.material(id));
        let color = self
            .texture_cache
            .get_or_white(material.and_then(|m| m.color_texture));
        let emissive = self
            .texture_cache
            .get_or_black(material.and_then(|m| m.emissive_texture));
        let shadow_view = command
            .light
            .as_ref()
            .map(|binding| self.shadow_view_for(scene, binding))
            .unwrap_or(&self.placeholder_shadow.view);

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.pipelines.forward_texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&color.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&emissive.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&emissive.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
            ],
            label: Some("Forward Texture Bind Group"),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        assets: &AssetStore,
        camera: &Camera,
        settings: &RendererSettings,
        graph: &FrameGraph,
        target_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        // The first surface pass clears; later ones (deferred lighting
        // followed by markers) load what is already there
        let mut surface_cleared = false;

        for pass in &graph.passes {
            match &pass.target {
                PassTarget::ShadowMap {
                    light,
                    viewport,
                    clear_depth,
                } => {
                    let target = &self.shadow_targets[&scene.lights[*light].info.id];
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Shadow Pass"),
                        color_attachments: &[],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &target.view,
                            depth_ops: Some(wgpu::Operations {
                                load: if *clear_depth {
                                    wgpu::LoadOp::Clear(1.0)
                                } else {
                                    wgpu::LoadOp::Load
                                },
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });

                    if let Some(vp) = viewport {
                        render_pass.set_viewport(
                            vp.x as f32,
                            vp.y as f32,
                            vp.width as f32,
                            vp.height as f32,
                            0.0,
                            1.0,
                        );
                    }

                    render_pass.set_pipeline(&self.pipelines.shadow_depth);
                    for command in &pass.commands {
                        let MeshRef::Mesh(mesh_id) = command.mesh else {
                            continue;
                        };
                        let Some(mesh) = self.mesh_cache.get(mesh_id) else {
                            continue;
                        };

                        let uniforms = FlatUniforms {
                            view_proj: command.camera_viewprojection,
                            model: command.model,
                            camera_pos: [
                                command.camera_eye[0],
                                command.camera_eye[1],
                                command.camera_eye[2],
                                1.0,
                            ],
                            color: command.color,
                        };
                        let bind =
                            self.draw_uniform_bind_group(device, bytemuck::cast_slice(&[uniforms]));

                        render_pass.set_bind_group(0, &bind, &[]);
                        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        render_pass
                            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                    }
                }

                PassTarget::GBuffer => {
                    let Some(gbuffer) = &self.gbuffer else {
                        log::warn!("G-buffer pass without an allocated G-buffer");
                        continue;
                    };

                    let color_attachment = |view| {
                        Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                                store: wgpu::StoreOp::Store,
                            },
                        })
                    };

                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("GBuffer Pass"),
                        color_attachments: &[
                            color_attachment(&gbuffer.albedo.view),
                            color_attachment(&gbuffer.normal.view),
                            color_attachment(&gbuffer.metal_rough.view),
                        ],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &gbuffer.depth_view,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });

                    for command in &pass.commands {
                        let MeshRef::Mesh(mesh_id) = command.mesh else {
                            continue;
                        };
                        let Some(mesh) = self.mesh_cache.get(mesh_id) else {
                            continue;
                        };
                        let Some(pipeline) = self.pipelines.gbuffer.get(&command.blend) else {
                            continue;
                        };

                        let material = command.material.and_then(|id| assets.material(id));
                        let tiling = material.map(|m| m.tiling_factor).unwrap_or(1.0);
                        let uniforms = GBufferUniforms {
                            view_proj: command.camera_viewprojection,
                            model: command.model,
                            camera_pos: [
                                command.camera_eye[0],
                                command.camera_eye[1],
                                command.camera_eye[2],
                                1.0,
                            ],
                            color: command.color,
                            params: [command.alpha_cutoff, tiling, 0.0, 0.0],
                        };
                        let bind =
                            self.draw_uniform_bind_group(device, bytemuck::cast_slice(&[uniforms]));

                        let color = self
                            .texture_cache
                            .get_or_white(material.and_then(|m| m.color_texture));
                        let metal_rough = self
                            .texture_cache
                            .get_or_black(material.and_then(|m| m.metallic_roughness_texture));
                        let textures = device.create_bind_group(&wgpu::BindGroupDescriptor {
                            layout: &self.pipelines.gbuffer_texture_layout,
                            entries: &[
                                wgpu::BindGroupEntry {
                                    binding: 0,
                                    resource: wgpu::BindingResource::TextureView(&color.view),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 1,
                                    resource: wgpu::BindingResource::Sampler(&color.sampler),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 2,
                                    resource: wgpu::BindingResource::TextureView(&metal_rough.view),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 3,
                                    resource: wgpu::BindingResource::Sampler(&metal_rough.sampler),
                                },
                            ],
                            label: Some("GBuffer Texture Bind Group"),
                        });

                        render_pass.set_pipeline(pipeline);
                        render_pass.set_bind_group(0, &bind, &[]);
                        render_pass.set_bind_group(1, &textures, &[]);
                        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        render_pass
                            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                    }
                }

                PassTarget::Surface { clear } => {
                    let clear_now = *clear && !surface_cleared;
                    surface_cleared = true;

                    let (quad_commands, mesh_commands): (Vec<&DrawCommand>, Vec<&DrawCommand>) =
                        pass.commands
                            .iter()
                            .partition(|c| c.shader == ShaderId::DeferredPospo);

                    let mut color_loaded = !clear_now;
                    if !quad_commands.is_empty() {
                        self.encode_lighting_quads(
                            device,
                            &mut encoder,
                            scene,
                            camera,
                            settings,
                            &quad_commands,
                            target_view,
                            color_loaded,
                            width,
                            height,
                        );
                        color_loaded = true;
                    }

                    if !mesh_commands.is_empty() || quad_commands.is_empty() {
                        self.encode_surface_meshes(
                            device,
                            &mut encoder,
                            scene,
                            assets,
                            settings,
                            &mesh_commands,
                            target_view,
                            depth_view,
                            color_loaded,
                        );
                    }
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Deferred lighting accumulation (and optional G-buffer debug view):
    /// full-screen draws without a depth attachment
    #[allow(clippy::too_many_arguments)]
    fn encode_lighting_quads(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        camera: &Camera,
        settings: &RendererSettings,
        commands: &[&DrawCommand],
        target_view: &wgpu::TextureView,
        color_loaded: bool,
        width: u32,
        height: u32,
    ) {
        let Some(gbuffer) = &self.gbuffer else {
            log::warn!("deferred lighting pass without an allocated G-buffer");
            return;
        };

        let [r, g, b, a] = settings.clear_color.map(|c| c as f64);
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Deferred Lighting Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: if color_loaded {
                        wgpu::LoadOp::Load
                    } else {
                        wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a })
                    },
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for command in commands {
            let Some(pipeline) = self.pipelines.pospo.get(&command.blend) else {
                continue;
            };

            let mut uniforms = PospoUniforms {
                inverse_view_proj: mat4_inverse(&command.camera_viewprojection),
                shadow_viewproj: [kiln_core::mat4_identity(); 4],
                camera_pos: [
                    command.camera_eye[0],
                    command.camera_eye[1],
                    command.camera_eye[2],
                    1.0,
                ],
                ambient: [command.ambient[0], command.ambient[1], command.ambient[2], 0.0],
                i_res: [1.0 / width as f32, 1.0 / height as f32, 0.0, 0.0],
                light_pos_intensity: [0.0; 4],
                light_color_maxdist: [0.0; 4],
                light_dir_spotcos: [0.0; 4],
                params: [0.0; 4],
                flags: [0; 4],
            };

            if let Some(light) = &command.light {
                uniforms.shadow_viewproj = if light.is_cascade {
                    light.cascade_viewprojection
                } else {
                    [light.shadow_viewprojection; 4]
                };
                uniforms.light_pos_intensity = [
                    light.position[0],
                    light.position[1],
                    light.position[2],
                    light.intensity,
                ];
                uniforms.light_color_maxdist = [
                    light.color[0],
                    light.color[1],
                    light.color[2],
                    light.max_dist,
                ];
                uniforms.light_dir_spotcos = [
                    light.direction[0],
                    light.direction[1],
                    light.direction[2],
                    light.spot_cosine,
                ];
                uniforms.params[0] = light.spot_exponent;
                uniforms.flags = [
                    light.kind.as_u32(),
                    light.is_cascade as u32,
                    1,
                    light.has_shadow_map as u32,
                ];
            }

            let bind = self.draw_uniform_bind_group(device, bytemuck::cast_slice(&[uniforms]));
            let shadow_view = command
                .light
                .as_ref()
                .map(|binding| self.shadow_view_for(scene, binding))
                .unwrap_or(&self.placeholder_shadow.view);

            let textures = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.pipelines.pospo_texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.albedo.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.normal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.metal_rough.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.depth_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::Sampler(&gbuffer.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: wgpu::BindingResource::TextureView(shadow_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 6,
                        resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                    },
                ],
                label: Some("Pospo Texture Bind Group"),
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &bind, &[]);
            render_pass.set_bind_group(1, &textures, &[]);
            render_pass.draw(0..3, 0..1);
        }

        // Debug view: the viewport split into the four G-buffer channels
        if settings.show_gbuffers {
            let (hw, hh) = (width as f32 / 2.0, height as f32 / 2.0);
            let channels = [
                (&gbuffer.albedo.view, 0.0, hh),
                (&gbuffer.normal.view, hw, hh),
                (&gbuffer.metal_rough.view, 0.0, 0.0),
            ];

            for (view, x, y) in channels {
                let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &self.pipelines.blit_texture_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&gbuffer.sampler),
                        },
                    ],
                    label: Some("Blit Bind Group"),
                });
                render_pass.set_viewport(x, y, hw, hh, 0.0, 1.0);
                render_pass.set_pipeline(&self.pipelines.blit);
                render_pass.set_bind_group(0, &bind, &[]);
                render_pass.draw(0..3, 0..1);
            }

            // Fourth quadrant: linearized depth
            let uniforms = DepthVizUniforms {
                near_far: [camera.near, camera.far, 0.0, 0.0],
            };
            let uniform_bind =
                self.draw_uniform_bind_group(device, bytemuck::cast_slice(&[uniforms]));
            let depth_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.pipelines.depth_texture_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.depth_view),
                }],
                label: Some("Depth Viz Bind Group"),
            });
            render_pass.set_viewport(hw, 0.0, hw, hh, 0.0, 1.0);
            render_pass.set_pipeline(&self.pipelines.depth_viz);
            render_pass.set_bind_group(0, &uniform_bind, &[]);
            render_pass.set_bind_group(1, &depth_bind, &[]);
            render_pass.draw(0..3, 0..1);
        }
    }

    /// Forward lit draws and flat gizmos: mesh draws with a depth attachment
    #[allow(clippy::too_many_arguments)]
    fn encode_surface_meshes(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        assets: &AssetStore,
        settings: &RendererSettings,
        commands: &[&DrawCommand],
        target_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        color_loaded: bool,
    ) {
        let [r, g, b, a] = settings.clear_color.map(|c| c as f64);
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Color Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: if color_loaded {
                        wgpu::LoadOp::Load
                    } else {
                        wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a })
                    },
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for command in commands {
            let MeshRef::Mesh(mesh_id) = command.mesh else {
                continue;
            };
            let Some(mesh) = self.mesh_cache.get(mesh_id) else {
                log::warn!("draw references mesh {:?} that never uploaded", mesh_id);
                continue;
            };

            match command.shader {
                ShaderId::Light => {
                    let key = (command.blend, command.two_sided, command.depth_test);
                    let Some(pipeline) = self.pipelines.forward.get(&key) else {
                        continue;
                    };
                    let uniforms = self.forward_uniforms(assets, command);
                    let bind =
                        self.draw_uniform_bind_group(device, bytemuck::cast_slice(&[uniforms]));
                    let textures =
                        self.forward_texture_bind_group(device, scene, assets, command);

                    render_pass.set_pipeline(pipeline);
                    render_pass.set_bind_group(0, &bind, &[]);
                    render_pass.set_bind_group(1, &textures, &[]);
                }
                ShaderId::Flat => {
                    let uniforms = FlatUniforms {
                        view_proj: command.camera_viewprojection,
                        model: command.model,
                        camera_pos: [
                            command.camera_eye[0],
                            command.camera_eye[1],
                            command.camera_eye[2],
                            1.0,
                        ],
                        color: command.color,
                    };
                    let bind =
                        self.draw_uniform_bind_group(device, bytemuck::cast_slice(&[uniforms]));
                    render_pass.set_pipeline(&self.pipelines.flat_color);
                    render_pass.set_bind_group(0, &bind, &[]);
                }
                _ => continue,
            }

            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}
