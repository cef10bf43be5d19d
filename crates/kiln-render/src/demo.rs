//! Procedural demo scene population
//!
//! Mirrors the stock viewer content: a tiled ground plane, a couple of
//! lights and a primitive prefab. Used by embedding applications as a
//! starting point and by tests as a realistic fixture.

use crate::assets::{AssetStore, Material};
use crate::primitives::{create_box_mesh, create_plane_mesh, create_pyramid_mesh};
use kiln_core::{Transform, Vec3};
use kiln_scene::{Light, LightKind, Prefab, PrefabEntity, Scene};

/// Build the demo scene into a fresh `Scene`, registering its meshes and
/// materials in `assets`
pub fn build_demo_scene(assets: &mut AssetStore) -> Scene {
    let mut scene = Scene::new();
    scene.ambient_light = Vec3::new(0.1, 0.1, 0.1);

    // Ground plane
    let floor_mesh = assets.add_mesh(create_plane_mesh(1000.0));
    let mut asphalt = Material::new("asphalt");
    asphalt.tiling_factor = 10.0;
    let asphalt = assets.add_material(asphalt);

    let mut floor_prefab = Prefab::new("floor");
    let root = floor_prefab.root();
    floor_prefab.node_mut(root).mesh = Some(floor_mesh);
    floor_prefab.node_mut(root).material = Some(asphalt);
    let floor_prefab = scene.add_prefab(floor_prefab);

    scene.add_entity(PrefabEntity::new(floor_prefab)).info.name = "floor".to_string();

    // Gizmo marker shared by the lights
    let marker = assets.add_mesh(create_pyramid_mesh(8.0, 12.0));

    let mut point = Light::new(LightKind::Point);
    point.set_position(Vec3::new(0.0, 200.0, 0.0));
    point.set_color(0.8, 0.3, 0.1);
    point.marker_mesh = Some(marker);
    scene.add_light(point);

    let mut directional = Light::new(LightKind::Directional);
    directional.set_position(Vec3::new(100.0, 750.0, 0.0));
    directional.set_color(0.1, 0.2, 0.4);
    directional.intensity = 2.0;
    // Ride above and beside the viewer so the shadow volume tracks it
    directional.target_vector = Vec3::new(100.0, 750.0, 0.0);
    directional.marker_mesh = Some(marker);
    scene.add_light(directional);

    // A primitive prefab to cast shadows onto the floor
    let box_mesh = assets.add_mesh(create_box_mesh(10.0, 10.0, 10.0));
    let gray = assets.add_material(Material::new("gray"));

    let mut box_prefab = Prefab::new("crate");
    let root = box_prefab.root();
    box_prefab.node_mut(root).mesh = Some(box_mesh);
    box_prefab.node_mut(root).material = Some(gray);
    let box_prefab = scene.add_prefab(box_prefab);

    let entity = scene.add_entity(PrefabEntity::new(box_prefab));
    entity.info.name = "crate".to_string();
    entity.info.model = Transform {
        position: Vec3::new(0.0, 50.0, 0.0),
        rotation: Vec3::ZERO,
        scale: Vec3::new(10.0, 10.0, 10.0),
    }
    .to_matrix();

    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scene_shape() {
        let mut assets = AssetStore::new();
        let scene = build_demo_scene(&mut assets);

        assert_eq!(scene.entities.len(), 2);
        assert_eq!(scene.lights.len(), 2);
        assert_eq!(scene.lights[0].kind(), LightKind::Point);
        assert_eq!(scene.lights[1].kind(), LightKind::Directional);
        assert_eq!(assets.mesh_count(), 3);
    }
}
