//! Frame-graph construction
//!
//! Each frame is first built as plain data: an ordered list of passes, each
//! an ordered list of draw commands with explicit blend/depth/cull state.
//! The wgpu executor in `renderer.rs` then encodes the graph verbatim. All
//! ordering rules live here - light accumulation order, the single draw
//! path per node per mode, shadow-before-color sequencing - which keeps
//! them testable without a GPU device.

use crate::assets::{AlphaMode, AssetStore, Material};
use crate::settings::{PipelineMode, RendererSettings};
use crate::shadow;
use kiln_core::{mat4_identity, mat4_mul, Mat4, MaterialId, MeshId, Vec3};
use kiln_scene::{
    box_in_frustum, Camera, Light, LightKind, Prefab, Scene, CASCADE_SLOTS,
};

/// Which draw path `render_node` takes for a mesh node. Exactly one path is
/// dispatched per node per traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Depth-only rendering into a light's shadow target
    Shadow,
    /// G-buffer attribute write (deferred geometry pass)
    Deferred,
    /// Lit rendering straight into the color target
    Forward,
}

/// Blend state for one draw command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Blending disabled; fragment replaces the target
    Opaque,
    /// Classic src-alpha over one-minus-src-alpha
    Alpha,
    /// Additive accumulation (one + one)
    Additive,
}

/// Fixed shader identifiers, looked up by name in the pipeline set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderId {
    /// Forward lit shading
    Light,
    /// Unlit flat color (shadow depth and light gizmos)
    Flat,
    /// G-buffer attribute write
    Deferred,
    /// Deferred lighting composition (full-screen)
    DeferredPospo,
    /// Linearized depth visualization
    Depth,
}

impl ShaderId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Flat => "flat",
            Self::Deferred => "deferred",
            Self::DeferredPospo => "deferred_pospo",
            Self::Depth => "depth",
        }
    }
}

/// Pixel-space viewport restriction (cascade quadrants, debug views)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Geometry a command draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshRef {
    Mesh(MeshId),
    /// Vertex-buffer-less full-screen triangle
    FullscreenTriangle,
}

/// Per-light uniform values for one accumulation draw
#[derive(Debug, Clone)]
pub struct LightBinding {
    /// Index into the scene's light list
    pub index: usize,
    pub kind: LightKind,
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    pub max_dist: f32,
    /// Cosine of the spot half-angle
    pub spot_cosine: f32,
    pub spot_exponent: f32,
    pub is_cascade: bool,
    /// Single shadow view-projection (spot, point, plain directional)
    pub shadow_viewprojection: Mat4,
    /// Four stored quadrant matrices for cascaded directionals
    pub cascade_viewprojection: [Mat4; CASCADE_SLOTS],
    /// Bind the light's own depth target; false falls back to the fully-lit
    /// white placeholder
    pub has_shadow_map: bool,
}

fn light_binding(index: usize, light: &Light) -> LightBinding {
    let shadow_viewprojection = light
        .camera
        .as_ref()
        .map(|camera| camera.view_projection)
        .unwrap_or_else(mat4_identity);

    LightBinding {
        index,
        kind: light.kind(),
        position: light.position().to_array(),
        direction: light.direction().to_array(),
        color: light.color.to_array(),
        intensity: light.intensity,
        max_dist: light.max_dist,
        spot_cosine: light.spot_cosine(),
        spot_exponent: light.spot_exponent,
        is_cascade: light.is_cascade && light.kind() == LightKind::Directional,
        shadow_viewprojection,
        cascade_viewprojection: light.shadow_viewprojection,
        has_shadow_map: light.shadow_map.is_some(),
    }
}

/// One draw with all the state the executor needs to encode it
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub shader: ShaderId,
    pub blend: BlendMode,
    pub depth_test: bool,
    /// Disables back-face culling
    pub two_sided: bool,
    pub mesh: MeshRef,
    pub model: Mat4,
    pub material: Option<MaterialId>,
    /// Base color uniform (material color, or gizmo tint for flat draws)
    pub color: [f32; 4],
    pub alpha_cutoff: f32,
    pub ambient: [f32; 3],
    pub camera_viewprojection: Mat4,
    pub camera_eye: [f32; 3],
    pub light: Option<LightBinding>,
}

/// Where a pass renders
#[derive(Debug, Clone)]
pub enum PassTarget {
    /// A light's depth-only target; `viewport` restricts cascade quadrants
    ShadowMap {
        /// Index into the scene's light list
        light: usize,
        viewport: Option<Viewport>,
        clear_depth: bool,
    },
    /// The deferred geometry targets
    GBuffer,
    /// The final color target
    Surface { clear: bool },
}

/// An ordered group of draw commands into one target
#[derive(Debug)]
pub struct Pass {
    pub target: PassTarget,
    pub commands: Vec<DrawCommand>,
}

/// A whole frame: shadow passes first, then the color pass(es)
#[derive(Debug, Default)]
pub struct FrameGraph {
    pub passes: Vec<Pass>,
}

impl FrameGraph {
    pub fn draw_count(&self) -> usize {
        self.passes.iter().map(|p| p.commands.len()).sum()
    }

    /// Passes rendering into the final color target
    pub fn surface_passes(&self) -> impl Iterator<Item = &Pass> {
        self.passes
            .iter()
            .filter(|p| matches!(p.target, PassTarget::Surface { .. }))
    }
}

/// View-dependent state shared by every command of one scene walk
pub(crate) struct ViewContext<'a> {
    pub planes: [[f32; 4]; 6],
    pub viewprojection: Mat4,
    pub eye: [f32; 3],
    /// Visible lights in scene order; empty for depth and G-buffer walks
    pub lights: &'a [(usize, LightBinding)],
    pub ambient: Vec3,
}

impl<'a> ViewContext<'a> {
    pub fn from_camera(camera: &Camera, lights: &'a [(usize, LightBinding)], ambient: Vec3) -> Self {
        Self {
            planes: camera.frustum_planes(),
            viewprojection: camera.view_projection,
            eye: camera.eye.to_array(),
            lights,
            ambient,
        }
    }

    /// A view defined by a bare view-projection matrix (latched cascade)
    pub fn from_matrix(viewprojection: Mat4, eye: [f32; 3]) -> Self {
        Self {
            planes: kiln_scene::frustum_planes(&viewprojection),
            viewprojection,
            eye,
            lights: &[],
            ambient: Vec3::ZERO,
        }
    }
}

/// Builds frame graphs from a scene + asset store
pub struct FrameBuilder<'a> {
    scene: &'a Scene,
    assets: &'a AssetStore,
}

impl<'a> FrameBuilder<'a> {
    pub fn new(scene: &'a Scene, assets: &'a AssetStore) -> Self {
        Self { scene, assets }
    }

    /// Walk every prefab entity and emit one command per visible,
    /// in-frustum mesh node (per light in forward mode).
    pub(crate) fn emit_scene(&self, mode: RenderMode, ctx: &ViewContext) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        for entity in &self.scene.entities {
            if !entity.info.visible {
                continue;
            }
            let prefab = self.scene.prefab(entity.prefab);
            self.render_node(
                mode,
                prefab,
                prefab.root(),
                &mat4_identity(),
                &entity.info.model,
                ctx,
                &mut commands,
            );
        }
        commands
    }

    /// Recursively render a node and its descendants.
    ///
    /// The node's global transform is its local hierarchy (accumulated in
    /// `parent_local`, rooted at identity) with the prefab placement applied
    /// last. Children always receive the original placement matrix and the
    /// accumulated local chain.
    #[allow(clippy::too_many_arguments)]
    fn render_node(
        &self,
        mode: RenderMode,
        prefab: &Prefab,
        node_id: kiln_core::NodeId,
        parent_local: &Mat4,
        placement: &Mat4,
        ctx: &ViewContext,
        commands: &mut Vec<DrawCommand>,
    ) {
        let node = prefab.node(node_id);
        if !node.visible {
            // Invisible prunes the whole subtree
            return;
        }

        let local_global = mat4_mul(parent_local, &node.local);
        let model = mat4_mul(placement, &local_global);

        if let (Some(mesh_id), Some(material_id)) = (node.mesh, node.material) {
            match (self.assets.mesh(mesh_id), self.assets.material(material_id)) {
                (Some(mesh), Some(material)) => {
                    let world_bounds = mesh.bounds.transform(&model);
                    if box_in_frustum(&ctx.planes, world_bounds.center, world_bounds.half_size) {
                        match mode {
                            RenderMode::Shadow => {
                                self.emit_depth(mesh_id, material, &model, ctx, commands)
                            }
                            RenderMode::Deferred => {
                                self.emit_gbuffer(mesh_id, material_id, material, &model, ctx, commands)
                            }
                            RenderMode::Forward => {
                                self.emit_forward_lit(mesh_id, material_id, material, &model, ctx, commands)
                            }
                        }
                    }
                }
                _ => {
                    log::warn!(
                        "prefab '{}' node references missing mesh {:?} or material {:?}",
                        prefab.name,
                        mesh_id,
                        material_id
                    );
                }
            }
        }

        // Children recurse regardless of whether this node drew anything
        for child in &node.children {
            self.render_node(mode, prefab, *child, &local_global, placement, ctx, commands);
        }
    }

    /// Depth-only draw for shadow maps. Translucent materials never cast
    /// shadows; culling is disabled so thin geometry still writes depth.
    fn emit_depth(
        &self,
        mesh: MeshId,
        material: &Material,
        model: &Mat4,
        ctx: &ViewContext,
        commands: &mut Vec<DrawCommand>,
    ) {
        if material.alpha_mode == AlphaMode::Blend {
            return;
        }
        commands.push(DrawCommand {
            shader: ShaderId::Flat,
            blend: BlendMode::Opaque,
            depth_test: true,
            two_sided: true,
            mesh: MeshRef::Mesh(mesh),
            model: *model,
            material: None,
            color: [1.0, 1.0, 1.0, 1.0],
            alpha_cutoff: 0.0,
            ambient: [0.0; 3],
            camera_viewprojection: ctx.viewprojection,
            camera_eye: ctx.eye,
            light: None,
        });
    }

    /// G-buffer attribute write for the deferred geometry pass
    fn emit_gbuffer(
        &self,
        mesh: MeshId,
        material_id: MaterialId,
        material: &Material,
        model: &Mat4,
        ctx: &ViewContext,
        commands: &mut Vec<DrawCommand>,
    ) {
        let blend = if material.alpha_mode == AlphaMode::Blend {
            BlendMode::Alpha
        } else {
            BlendMode::Opaque
        };
        commands.push(DrawCommand {
            shader: ShaderId::Deferred,
            blend,
            depth_test: true,
            two_sided: true,
            mesh: MeshRef::Mesh(mesh),
            model: *model,
            material: Some(material_id),
            color: material.base_color.to_array(),
            alpha_cutoff: material.effective_alpha_cutoff(),
            ambient: [0.0; 3],
            camera_viewprojection: ctx.viewprojection,
            camera_eye: ctx.eye,
            light: None,
        });
    }

    /// Forward lit shading: one draw per visible light, or a single
    /// ambient-only draw when no lights exist.
    ///
    /// The first visible light owns the opaque/alpha slot and the ambient
    /// term; every later light accumulates additively with ambient zeroed
    /// so it is contributed exactly once.
    fn emit_forward_lit(
        &self,
        mesh: MeshId,
        material_id: MaterialId,
        material: &Material,
        model: &Mat4,
        ctx: &ViewContext,
        commands: &mut Vec<DrawCommand>,
    ) {
        if ctx.lights.is_empty() {
            commands.push(DrawCommand {
                shader: ShaderId::Light,
                blend: BlendMode::Opaque,
                depth_test: false,
                two_sided: material.two_sided,
                mesh: MeshRef::Mesh(mesh),
                model: *model,
                material: Some(material_id),
                color: material.base_color.to_array(),
                alpha_cutoff: material.effective_alpha_cutoff(),
                ambient: ctx.ambient.to_array(),
                camera_viewprojection: ctx.viewprojection,
                camera_eye: ctx.eye,
                light: None,
            });
            return;
        }

        for (slot, (_, binding)) in ctx.lights.iter().enumerate() {
            let blend = if slot == 0 {
                if material.alpha_mode == AlphaMode::Blend {
                    BlendMode::Alpha
                } else {
                    BlendMode::Opaque
                }
            } else {
                BlendMode::Additive
            };
            let ambient = if slot == 0 { ctx.ambient } else { Vec3::ZERO };

            commands.push(DrawCommand {
                shader: ShaderId::Light,
                blend,
                depth_test: true,
                two_sided: material.two_sided,
                mesh: MeshRef::Mesh(mesh),
                model: *model,
                material: Some(material_id),
                color: material.base_color.to_array(),
                alpha_cutoff: material.effective_alpha_cutoff(),
                ambient: ambient.to_array(),
                camera_viewprojection: ctx.viewprojection,
                camera_eye: ctx.eye,
                light: Some(binding.clone()),
            });
        }
    }

    /// The forward color pass
    pub fn forward_pass(&self, camera: &Camera, settings: &RendererSettings) -> Pass {
        let lights: Vec<(usize, LightBinding)> = self
            .scene
            .visible_lights()
            .map(|(i, light)| (i, light_binding(i, light)))
            .collect();
        let ctx = ViewContext::from_camera(camera, &lights, self.scene.effective_ambient());

        let mut commands = self.emit_scene(RenderMode::Forward, &ctx);
        if settings.light_markers {
            commands.extend(self.light_marker_commands(camera));
        }

        Pass {
            target: PassTarget::Surface { clear: true },
            commands,
        }
    }

    /// The deferred pipeline: G-buffer geometry pass, then full-screen
    /// lighting accumulation.
    pub fn deferred_passes(&self, camera: &Camera, settings: &RendererSettings) -> Vec<Pass> {
        let ctx = ViewContext::from_camera(camera, &[], Vec3::ZERO);
        let geometry = Pass {
            target: PassTarget::GBuffer,
            commands: self.emit_scene(RenderMode::Deferred, &ctx),
        };

        let ambient = self.scene.effective_ambient();
        let mut commands = Vec::new();
        let visible: Vec<(usize, &Light)> = self.scene.visible_lights().collect();

        let quad_command = |blend, ambient: Vec3, light: Option<LightBinding>| DrawCommand {
            shader: ShaderId::DeferredPospo,
            blend,
            depth_test: false,
            two_sided: false,
            mesh: MeshRef::FullscreenTriangle,
            model: mat4_identity(),
            material: None,
            color: [1.0, 1.0, 1.0, 1.0],
            alpha_cutoff: 0.0,
            ambient: ambient.to_array(),
            camera_viewprojection: camera.view_projection,
            camera_eye: camera.eye.to_array(),
            light,
        };

        if visible.is_empty() {
            // No lights: the quad still composites the G-buffer once, unlit
            commands.push(quad_command(BlendMode::Opaque, ambient, None));
        } else {
            for (slot, (index, light)) in visible.iter().enumerate() {
                let blend = if slot == 0 {
                    BlendMode::Opaque
                } else {
                    BlendMode::Additive
                };
                // The ambient uniform stays bound across light passes; each
                // accumulation re-adds it, matching the viewer's look
                commands.push(quad_command(blend, ambient, Some(light_binding(*index, light))));
            }
        }

        let mut lighting = Pass {
            target: PassTarget::Surface { clear: true },
            commands,
        };
        if settings.light_markers {
            lighting.commands.extend(self.light_marker_commands(camera));
        }

        vec![geometry, lighting]
    }

    /// Debug gizmo pass: each light's marker mesh drawn unlit at the
    /// light's placement
    fn light_marker_commands(&self, camera: &Camera) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        for light in &self.scene.lights {
            let Some(mesh) = light.marker_mesh else {
                continue;
            };
            let [r, g, b] = light.color.to_array();
            commands.push(DrawCommand {
                shader: ShaderId::Flat,
                blend: BlendMode::Opaque,
                depth_test: false,
                two_sided: false,
                mesh: MeshRef::Mesh(mesh),
                model: light.info.model,
                material: None,
                color: [r, g, b, 1.0],
                alpha_cutoff: 0.0,
                ambient: [0.0; 3],
                camera_viewprojection: camera.view_projection,
                camera_eye: camera.eye.to_array(),
                light: None,
            });
        }
        commands
    }
}

/// Build the whole frame: per-frame light update, shadow maps for every
/// light, then the color pass for the selected pipeline. Shadow passes
/// always precede the color pass that samples them.
pub fn build_frame(
    scene: &mut Scene,
    assets: &AssetStore,
    camera: &Camera,
    settings: &RendererSettings,
) -> FrameGraph {
    scene.update(camera);

    let mut passes = shadow::build_shadow_passes(scene, assets);

    let builder = FrameBuilder::new(scene, assets);
    match settings.pipeline {
        PipelineMode::Forward => passes.push(builder.forward_pass(camera, settings)),
        PipelineMode::Deferred => passes.extend(builder.deferred_passes(camera, settings)),
    }

    FrameGraph { passes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Material;
    use crate::primitives::{create_box_mesh, create_plane_mesh};
    use kiln_core::Transform;
    use kiln_scene::{Light, Node, PrefabEntity, ShadowMapInfo};

    fn viewer() -> Camera {
        let mut camera = Camera::new();
        camera.look_at(Vec3::new(0.0, 50.0, 100.0), Vec3::ZERO, Vec3::UP);
        camera.set_perspective(60.0, 1.0, 0.1, 10000.0);
        camera
    }

    /// A scene containing one floor entity using the given material
    fn floor_scene(material: Material) -> (Scene, AssetStore) {
        let mut assets = AssetStore::new();
        let mesh = assets.add_mesh(create_plane_mesh(100.0));
        let material = assets.add_material(material);

        let mut scene = Scene::new();
        let mut prefab = Prefab::new("floor");
        let root = prefab.root();
        prefab.node_mut(root).mesh = Some(mesh);
        prefab.node_mut(root).material = Some(material);
        let prefab = scene.add_prefab(prefab);
        scene.add_entity(PrefabEntity::new(prefab));

        (scene, assets)
    }

    /// A directional light positioned so the floor lands in its shadow
    /// frustum, tracking the `viewer()` camera
    fn tracking_directional() -> Light {
        let mut light = Light::new(LightKind::Directional);
        light.set_position(Vec3::new(0.0, 100.0, 200.0));
        light.target_vector = Vec3::new(0.0, 50.0, 100.0);
        light
    }

    #[test]
    fn zero_lights_emit_one_unlit_draw_per_node() {
        let (scene, assets) = floor_scene(Material::new("mat"));
        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());

        assert_eq!(pass.commands.len(), 1);
        let command = &pass.commands[0];
        assert_eq!(command.blend, BlendMode::Opaque);
        assert_eq!(command.shader, ShaderId::Light);
        assert!(!command.depth_test);
        assert!(command.light.is_none());
        assert_eq!(command.ambient, scene.effective_ambient().to_array());
    }

    #[test]
    fn disabled_ambient_is_zero_for_the_frame() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        scene.ambient_enabled = false;
        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());
        assert_eq!(pass.commands[0].ambient, [0.0; 3]);
    }

    #[test]
    fn light_accumulation_order_and_ambient_ownership() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        scene.add_light(Light::new(LightKind::Point));
        scene.add_light(Light::new(LightKind::Spot));
        scene.add_light(Light::new(LightKind::Point));

        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());

        // One draw per (node, light): 1 node x 3 lights
        assert_eq!(pass.commands.len(), 3);
        assert_eq!(pass.commands[0].blend, BlendMode::Opaque);
        assert_eq!(pass.commands[1].blend, BlendMode::Additive);
        assert_eq!(pass.commands[2].blend, BlendMode::Additive);

        // Ambient contributed exactly once, by the first light
        assert_eq!(pass.commands[0].ambient, scene.effective_ambient().to_array());
        assert_eq!(pass.commands[1].ambient, [0.0; 3]);
        assert_eq!(pass.commands[2].ambient, [0.0; 3]);

        // Accumulation follows scene light order
        let indices: Vec<usize> = pass
            .commands
            .iter()
            .map(|c| c.light.as_ref().unwrap().index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn first_visible_light_owns_the_opaque_slot() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        scene.add_light(Light::new(LightKind::Point)).info.visible = false;
        scene.add_light(Light::new(LightKind::Spot));

        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());

        assert_eq!(pass.commands.len(), 1);
        assert_eq!(pass.commands[0].blend, BlendMode::Opaque);
        assert_eq!(pass.commands[0].light.as_ref().unwrap().index, 1);
    }

    #[test]
    fn translucent_material_alpha_blends_on_the_first_light() {
        let mut material = Material::new("glass");
        material.alpha_mode = AlphaMode::Blend;
        let (mut scene, assets) = floor_scene(material);
        scene.add_light(Light::new(LightKind::Point));
        scene.add_light(Light::new(LightKind::Point));

        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());

        assert_eq!(pass.commands[0].blend, BlendMode::Alpha);
        assert_eq!(pass.commands[1].blend, BlendMode::Additive);
    }

    #[test]
    fn mask_material_supplies_its_cutoff() {
        let mut material = Material::new("leaves");
        material.alpha_mode = AlphaMode::Mask;
        material.alpha_cutoff = 0.35;
        let (scene, assets) = floor_scene(material);

        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());
        assert!((pass.commands[0].alpha_cutoff - 0.35).abs() < 1e-6);
    }

    #[test]
    fn invisible_node_prunes_its_whole_subtree() {
        let (mut scene, mut assets) = floor_scene(Material::new("mat"));
        let mesh = assets.add_mesh(create_box_mesh(2.0, 2.0, 2.0));
        let material = assets.add_material(Material::new("child"));

        // Give the floor prefab an invisible root: nothing under it draws
        let prefab_id = scene.entities[0].prefab;
        let prefab = scene.prefab_mut(prefab_id);
        let root = prefab.root();
        prefab.add_child(root, Node::new().with_mesh(mesh, material));
        prefab.node_mut(root).visible = false;

        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());
        assert_eq!(pass.commands.len(), 0);
    }

    #[test]
    fn children_of_a_meshless_node_are_still_visited() {
        let mut assets = AssetStore::new();
        let mesh = assets.add_mesh(create_box_mesh(2.0, 2.0, 2.0));
        let material = assets.add_material(Material::new("mat"));

        // Root carries no drawables, only children do
        let mut prefab = Prefab::new("group");
        let root = prefab.root();
        prefab.add_child(
            root,
            Node::new()
                .with_mesh(mesh, material)
                .with_local(Transform::from_position(Vec3::new(5.0, 0.0, 0.0)).to_matrix()),
        );
        let child = prefab.add_child(
            root,
            Node::new().with_local(Transform::from_position(Vec3::new(-5.0, 0.0, 0.0)).to_matrix()),
        );
        prefab.add_child(
            child,
            Node::new()
                .with_mesh(mesh, material)
                .with_local(Transform::from_position(Vec3::new(0.0, 0.0, 7.0)).to_matrix()),
        );

        let mut scene = Scene::new();
        let prefab = scene.add_prefab(prefab);
        scene.add_entity(PrefabEntity::new(prefab)).info.model =
            Transform::from_position(Vec3::new(0.0, 10.0, 0.0)).to_matrix();

        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());
        assert_eq!(pass.commands.len(), 2);

        // Each node's global matrix chains its local hierarchy, with the
        // prefab placement applied last
        let translations: Vec<[f32; 3]> = pass
            .commands
            .iter()
            .map(|c| [c.model[3][0], c.model[3][1], c.model[3][2]])
            .collect();
        assert!(translations.contains(&[5.0, 10.0, 0.0]));
        assert!(translations.contains(&[-5.0, 10.0, 7.0]));
    }

    #[test]
    fn node_fully_outside_the_frustum_is_culled() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        // Push the floor far behind the camera
        scene.entities[0].info.model =
            Transform::from_position(Vec3::new(0.0, 0.0, 100_000.0)).to_matrix();

        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());
        assert_eq!(pass.commands.len(), 0);
    }

    #[test]
    fn dangling_resource_handles_skip_the_draw() {
        let mut assets = AssetStore::new();
        let material = assets.add_material(Material::new("mat"));

        let mut prefab = Prefab::new("broken");
        let root = prefab.root();
        prefab.node_mut(root).mesh = Some(MeshId::from_raw(99));
        prefab.node_mut(root).material = Some(material);

        let mut scene = Scene::new();
        let prefab = scene.add_prefab(prefab);
        scene.add_entity(PrefabEntity::new(prefab));

        let pass = FrameBuilder::new(&scene, &assets)
            .forward_pass(&viewer(), &RendererSettings::default());
        assert_eq!(pass.commands.len(), 0);
    }

    #[test]
    fn translucent_materials_never_cast_shadows() {
        let mut material = Material::new("glass");
        material.alpha_mode = AlphaMode::Blend;
        let (mut scene, assets) = floor_scene(material);
        let mut light = Light::new(LightKind::Spot);
        light.set_position(Vec3::new(0.0, 50.0, 0.0));
        scene.add_light(light);

        let passes = crate::shadow::build_shadow_passes(&mut scene, &assets);
        assert_eq!(passes.len(), 1);
        assert!(passes[0].commands.is_empty());
    }

    #[test]
    fn directional_forward_frame_end_to_end() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        scene.add_light(tracking_directional());

        let camera = viewer();
        let graph = build_frame(&mut scene, &assets, &camera, &RendererSettings::default());

        // Shadow generation precedes the color pass
        assert_eq!(graph.passes.len(), 2);
        let shadow_pass = &graph.passes[0];
        match &shadow_pass.target {
            PassTarget::ShadowMap {
                light,
                viewport,
                clear_depth,
            } => {
                assert_eq!(*light, 0);
                assert!(viewport.is_none());
                assert!(clear_depth);
            }
            other => panic!("expected shadow pass first, got {:?}", other),
        }
        assert_eq!(shadow_pass.commands.len(), 1);
        assert_eq!(shadow_pass.commands[0].shader, ShaderId::Flat);

        // The light now exposes its full-size depth target
        assert_eq!(
            scene.lights[0].shadow_map,
            Some(ShadowMapInfo {
                width: 1024,
                height: 1024
            })
        );

        // Exactly one color draw for the floor, blending disabled
        let surface = graph.surface_passes().next().unwrap();
        assert_eq!(surface.commands.len(), 1);
        let command = &surface.commands[0];
        assert_eq!(command.blend, BlendMode::Opaque);
        let binding = command.light.as_ref().unwrap();
        assert!(binding.has_shadow_map);
        assert!(!binding.is_cascade);

        // A second frame reuses the descriptor: still the same allocation
        let graph2 = build_frame(&mut scene, &assets, &camera, &RendererSettings::default());
        assert_eq!(graph2.passes.len(), 2);
        assert_eq!(
            scene.lights[0].shadow_map,
            Some(ShadowMapInfo {
                width: 1024,
                height: 1024
            })
        );
    }

    #[test]
    fn cascade_quadrants_cover_the_atlas_and_latch_the_far_slot() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        let mut light = tracking_directional();
        light.is_cascade = true;
        scene.add_light(light);

        let mut camera = viewer();
        let graph = build_frame(&mut scene, &assets, &camera, &RendererSettings::default());

        // Four quadrant passes plus the color pass
        let shadow_passes: Vec<&Pass> = graph
            .passes
            .iter()
            .filter(|p| matches!(p.target, PassTarget::ShadowMap { .. }))
            .collect();
        assert_eq!(shadow_passes.len(), 4);

        for (quadrant, pass) in shadow_passes.iter().enumerate() {
            let PassTarget::ShadowMap {
                viewport,
                clear_depth,
                ..
            } = &pass.target
            else {
                unreachable!();
            };
            let vp = viewport.expect("cascade passes restrict their quadrant");
            assert_eq!((vp.width, vp.height), (512, 512));
            let expected = [(0, 0), (512, 0), (0, 512), (512, 512)][quadrant];
            assert_eq!((vp.x, vp.y), expected);
            // Only the first quadrant clears the shared atlas
            assert_eq!(*clear_depth, quadrant == 0);
        }

        let first_frame = scene.lights[0].shadow_viewprojection;
        assert!(scene.lights[0].far_cascade_valid());

        // Move the viewer and render again: near quadrants re-snap, the
        // far quadrant keeps its stored matrix
        camera.look_at(Vec3::new(40.0, 50.0, 100.0), Vec3::ZERO, Vec3::UP);
        build_frame(&mut scene, &assets, &camera, &RendererSettings::default());
        let second_frame = scene.lights[0].shadow_viewprojection;

        assert_ne!(first_frame[0], second_frame[0]);
        assert_eq!(first_frame[3], second_frame[3]);

        // Invalidation forces the far quadrant to recompute
        scene.lights[0].invalidate_far_cascade();
        camera.look_at(Vec3::new(80.0, 50.0, 100.0), Vec3::ZERO, Vec3::UP);
        build_frame(&mut scene, &assets, &camera, &RendererSettings::default());
        assert_ne!(second_frame[3], scene.lights[0].shadow_viewprojection[3]);

        // The color pass binds the full cascade matrix array
        let graph = build_frame(&mut scene, &assets, &camera, &RendererSettings::default());
        let surface = graph.surface_passes().next().unwrap();
        let binding = surface.commands[0].light.as_ref().unwrap();
        assert!(binding.is_cascade);
    }

    #[test]
    fn point_lights_get_a_flattened_cleared_target() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        scene.add_light(Light::new(LightKind::Point));

        let passes = crate::shadow::build_shadow_passes(&mut scene, &assets);
        assert_eq!(passes.len(), 1);
        match &passes[0].target {
            PassTarget::ShadowMap { clear_depth, .. } => assert!(clear_depth),
            other => panic!("expected shadow pass, got {:?}", other),
        }
        assert!(passes[0].commands.is_empty());
        assert_eq!(
            scene.lights[0].shadow_map,
            Some(ShadowMapInfo {
                width: 512,
                height: 3072
            })
        );
    }

    #[test]
    fn ambient_lights_take_no_shadow_path() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        scene.add_light(Light::new(LightKind::Ambient));

        let passes = crate::shadow::build_shadow_passes(&mut scene, &assets);
        assert!(passes.is_empty());
        assert!(scene.lights[0].shadow_map.is_none());
    }

    #[test]
    fn deferred_pipeline_pass_structure() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        let mut spot = Light::new(LightKind::Spot);
        spot.set_position(Vec3::new(0.0, 50.0, 0.0));
        scene.add_light(spot);
        scene.add_light(Light::new(LightKind::Point));

        let settings = RendererSettings {
            pipeline: PipelineMode::Deferred,
            ..Default::default()
        };
        let graph = build_frame(&mut scene, &assets, &viewer(), &settings);

        // Shadow passes, then geometry, then lighting
        assert!(matches!(
            graph.passes[0].target,
            PassTarget::ShadowMap { .. }
        ));
        assert!(matches!(
            graph.passes[1].target,
            PassTarget::ShadowMap { .. }
        ));
        let geometry = &graph.passes[2];
        assert!(matches!(geometry.target, PassTarget::GBuffer));
        assert_eq!(geometry.commands.len(), 1);
        assert_eq!(geometry.commands[0].shader, ShaderId::Deferred);
        assert_eq!(geometry.commands[0].blend, BlendMode::Opaque);
        assert!(geometry.commands[0].depth_test);

        // First light replaces, the second adds; both draw the quad
        let lighting = &graph.passes[3];
        assert!(matches!(lighting.target, PassTarget::Surface { .. }));
        assert_eq!(lighting.commands.len(), 2);
        assert_eq!(lighting.commands[0].blend, BlendMode::Opaque);
        assert_eq!(lighting.commands[1].blend, BlendMode::Additive);
        for command in &lighting.commands {
            assert_eq!(command.mesh, MeshRef::FullscreenTriangle);
            assert_eq!(command.shader, ShaderId::DeferredPospo);
            assert!(!command.depth_test);
        }
    }

    #[test]
    fn deferred_zero_lights_draws_the_quad_once() {
        let (mut scene, assets) = floor_scene(Material::new("mat"));
        let settings = RendererSettings {
            pipeline: PipelineMode::Deferred,
            ..Default::default()
        };
        let graph = build_frame(&mut scene, &assets, &viewer(), &settings);

        let lighting = graph.surface_passes().next().unwrap();
        assert_eq!(lighting.commands.len(), 1);
        assert_eq!(lighting.commands[0].blend, BlendMode::Opaque);
        assert!(lighting.commands[0].light.is_none());
    }

    #[test]
    fn light_markers_draw_after_the_lit_scene() {
        let (mut scene, mut assets) = floor_scene(Material::new("mat"));
        let marker = assets.add_mesh(create_box_mesh(1.0, 1.0, 1.0));
        let mut light = Light::new(LightKind::Point);
        light.set_color(0.8, 0.3, 0.1);
        light.marker_mesh = Some(marker);
        scene.add_light(light);

        let settings = RendererSettings {
            light_markers: true,
            ..Default::default()
        };
        let pass = FrameBuilder::new(&scene, &assets).forward_pass(&viewer(), &settings);

        let marker_command = pass.commands.last().unwrap();
        assert_eq!(marker_command.shader, ShaderId::Flat);
        assert_eq!(marker_command.blend, BlendMode::Opaque);
        assert!(!marker_command.depth_test);
        assert_eq!(marker_command.color, [0.8, 0.3, 0.1, 1.0]);
    }
}
