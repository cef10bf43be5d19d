//! Shadow-map generation
//!
//! One depth-only pass per spot light and plain directional light, four
//! quadrant passes into a shared atlas for cascaded directionals. The
//! view-matrix translation is snapped to a texel-sized grid before each
//! directional render: without it, sub-texel shifts of the light frustum
//! make shadow edges shimmer whenever the viewer moves.

use crate::assets::AssetStore;
use crate::frame::{FrameBuilder, Pass, PassTarget, RenderMode, ViewContext, Viewport};
use kiln_core::Mat4;
use kiln_scene::{Camera, Light, LightKind, Scene, ShadowMapInfo};

/// Base orthographic width of a directional shadow volume, in world units
pub const SHADOW_WORLD_EXTENT: f32 = 512.0;

/// Ortho width of each cascade quadrant as a multiple of the base extent.
/// Quadrant 3 covers the widest radius and is latched after its first
/// computation.
pub const CASCADE_EXTENT_FACTORS: [f32; 4] = [0.5, 1.0, 2.0, 4.0];

/// Snap the view-matrix translation to a world-space grid so shadow texels
/// land on stable world positions. `round(x / g) * g` is a projection:
/// re-snapping an already-snapped translation is a no-op.
pub fn snap_view_to_texel_grid(camera: &mut Camera, grid: f32) {
    camera.view_matrix[3][0] = (camera.view_matrix[3][0] / grid).round() * grid;
    camera.view_matrix[3][1] = (camera.view_matrix[3][1] / grid).round() * grid;
    camera.refresh_view_projection();
}

/// Pixel rectangle of a cascade quadrant within the atlas
fn quadrant_viewport(quadrant: usize, width: u32, height: u32) -> Viewport {
    let (hw, hh) = (width / 2, height / 2);
    let (x, y) = match quadrant {
        0 => (0, 0),
        1 => (hw, 0),
        2 => (0, hh),
        _ => (hw, hh),
    };
    Viewport {
        x,
        y,
        width: hw,
        height: hh,
    }
}

/// One planned depth render: target region plus the view it renders from
struct ShadowView {
    light: usize,
    viewport: Option<Viewport>,
    clear_depth: bool,
    viewprojection: Mat4,
    eye: [f32; 3],
    /// Point lights keep a cleared target but render no geometry into it
    empty: bool,
}

/// Reconfigure a light's camera for this frame's shadow render(s) and plan
/// the depth passes. Mutates the camera in place (ortho extents, snapped
/// translation) and updates the light's stored cascade matrices.
fn plan_light(index: usize, light: &mut Light) -> Vec<ShadowView> {
    let Some((tex_width, _tex_height)) = light.shadow_resolution() else {
        return Vec::new();
    };

    match light.kind() {
        LightKind::Ambient => Vec::new(),

        LightKind::Point => {
            // Flattened target: allocated and cleared, no cubemap render
            let camera = light.camera.as_ref().expect("point light owns a camera");
            vec![ShadowView {
                light: index,
                viewport: None,
                clear_depth: true,
                viewprojection: camera.view_projection,
                eye: camera.eye.to_array(),
                empty: true,
            }]
        }

        LightKind::Spot => {
            let camera = light.camera.as_ref().expect("spot light owns a camera");
            vec![ShadowView {
                light: index,
                viewport: None,
                clear_depth: true,
                viewprojection: camera.view_projection,
                eye: camera.eye.to_array(),
                empty: false,
            }]
        }

        LightKind::Directional if !light.is_cascade => {
            let camera = light.camera.as_mut().expect("directional light owns a camera");
            let half = SHADOW_WORLD_EXTENT / 2.0;
            camera.set_orthographic(-half, half, -half, half, camera.near, camera.far);

            let grid = SHADOW_WORLD_EXTENT / (tex_width as f32 * 0.5);
            snap_view_to_texel_grid(camera, grid);

            vec![ShadowView {
                light: index,
                viewport: None,
                clear_depth: true,
                viewprojection: camera.view_projection,
                eye: camera.eye.to_array(),
                empty: false,
            }]
        }

        LightKind::Directional => {
            let far_valid = light.far_cascade_valid();
            let (width, height) = light
                .shadow_map
                .map(|info| (info.width, info.height))
                .unwrap_or((tex_width, tex_width));

            let mut views = Vec::with_capacity(CASCADE_EXTENT_FACTORS.len());
            for (quadrant, factor) in CASCADE_EXTENT_FACTORS.iter().enumerate() {
                let is_far = quadrant == CASCADE_EXTENT_FACTORS.len() - 1;

                let (viewprojection, eye) = if is_far && far_valid {
                    // The widest quadrant is static once computed: reuse the
                    // stored matrix, skip the per-frame snap entirely
                    let camera = light.camera.as_ref().expect("directional light owns a camera");
                    (light.shadow_viewprojection[quadrant], camera.eye.to_array())
                } else {
                    let camera =
                        light.camera.as_mut().expect("directional light owns a camera");
                    let world_width = SHADOW_WORLD_EXTENT * factor;
                    let half = world_width / 2.0;
                    camera.set_orthographic(-half, half, -half, half, camera.near, camera.far);

                    // World size of one atlas texel: the quadrant's world
                    // footprint over its pixel footprint (half the atlas)
                    let grid = world_width / (tex_width as f32 * 0.5);
                    snap_view_to_texel_grid(camera, grid);

                    light.shadow_viewprojection[quadrant] = camera.view_projection;
                    let result = (camera.view_projection, camera.eye.to_array());
                    if is_far {
                        light.latch_far_cascade();
                    }
                    result
                };

                views.push(ShadowView {
                    light: index,
                    viewport: Some(quadrant_viewport(quadrant, width, height)),
                    clear_depth: quadrant == 0,
                    viewprojection,
                    eye,
                    empty: false,
                });
            }
            views
        }
    }
}

/// Generate this frame's shadow passes for every light in the scene.
///
/// Allocates each shadow-casting light's depth-target descriptor exactly
/// once, on its first pass; ambient lights are no-ops. Must run before the
/// color pass that samples the resulting maps.
pub fn build_shadow_passes(scene: &mut Scene, assets: &AssetStore) -> Vec<Pass> {
    let mut views = Vec::new();
    for (index, light) in scene.lights.iter_mut().enumerate() {
        if !light.casts_shadows() {
            continue;
        }

        if light.shadow_map.is_none() {
            let (width, height) = light
                .shadow_resolution()
                .expect("shadow-casting light has a target size");
            light.shadow_map = Some(ShadowMapInfo { width, height });
            log::debug!(
                "allocated {}x{} shadow target for light '{}'",
                width,
                height,
                light.info.name
            );
        }

        views.extend(plan_light(index, light));
    }

    let builder = FrameBuilder::new(scene, assets);
    views
        .into_iter()
        .map(|view| {
            let commands = if view.empty {
                Vec::new()
            } else {
                let ctx = ViewContext::from_matrix(view.viewprojection, view.eye);
                builder.emit_scene(RenderMode::Shadow, &ctx)
            };
            Pass {
                target: PassTarget::ShadowMap {
                    light: view.light,
                    viewport: view.viewport,
                    clear_depth: view.clear_depth,
                },
                commands,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::Vec3;
    use kiln_scene::Camera;

    #[test]
    fn test_snap_is_idempotent() {
        let mut camera = Camera::new();
        camera.look_at(
            Vec3::new(123.456, 78.9, -42.0),
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::UP,
        );

        snap_view_to_texel_grid(&mut camera, 2.0);
        let first = (camera.view_matrix[3][0], camera.view_matrix[3][1]);

        snap_view_to_texel_grid(&mut camera, 2.0);
        let second = (camera.view_matrix[3][0], camera.view_matrix[3][1]);

        assert_eq!(first, second);
        assert_eq!(first.0 % 2.0, 0.0);
        assert_eq!(first.1 % 2.0, 0.0);
    }

    #[test]
    fn test_snap_refreshes_view_projection() {
        let mut camera = Camera::new();
        camera.look_at(Vec3::new(3.3, 7.7, 10.0), Vec3::ZERO, Vec3::UP);
        let before = camera.view_projection;

        snap_view_to_texel_grid(&mut camera, 4.0);
        assert_ne!(before, camera.view_projection);
    }

    #[test]
    fn test_quadrant_viewports_tile_the_atlas() {
        let viewports: Vec<Viewport> = (0..4).map(|q| quadrant_viewport(q, 1024, 1024)).collect();
        assert_eq!(viewports[0], Viewport { x: 0, y: 0, width: 512, height: 512 });
        assert_eq!(viewports[1], Viewport { x: 512, y: 0, width: 512, height: 512 });
        assert_eq!(viewports[2], Viewport { x: 0, y: 512, width: 512, height: 512 });
        assert_eq!(viewports[3], Viewport { x: 512, y: 512, width: 512, height: 512 });
    }
}
