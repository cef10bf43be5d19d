//! The scene aggregate: entities, lights, ambient term, selection
//!
//! An explicitly constructed context object, created once at startup and
//! passed by reference into the renderer and update functions. All scene
//! mutation and rendering stay on one thread.

use crate::camera::Camera;
use crate::entity::{Entity, EntityKind, PrefabEntity};
use crate::light::{Light, LightKind};
use crate::node::Prefab;
use kiln_core::{EntityId, PrefabId, Vec3};

/// Owns all placed entities and lights plus the prefab store they reference
pub struct Scene {
    prefabs: Vec<Prefab>,
    pub entities: Vec<PrefabEntity>,
    pub lights: Vec<Light>,

    pub ambient_light: Vec3,
    /// When false the ambient term is zero for the frame; the stored color
    /// is left untouched.
    pub ambient_enabled: bool,

    next_entity_id: u32,
    next_light_id: u32,
    selected: Option<(EntityKind, EntityId)>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            prefabs: Vec::new(),
            entities: Vec::new(),
            lights: Vec::new(),
            ambient_light: Vec3::new(0.1, 0.1, 0.1),
            ambient_enabled: true,
            next_entity_id: 0,
            next_light_id: 0,
            selected: None,
        }
    }

    /// Register a prefab, returning its handle
    pub fn add_prefab(&mut self, prefab: Prefab) -> PrefabId {
        let id = PrefabId::from_raw(self.prefabs.len() as u32);
        self.prefabs.push(prefab);
        id
    }

    pub fn prefab(&self, id: PrefabId) -> &Prefab {
        &self.prefabs[id.index()]
    }

    pub fn prefab_mut(&mut self, id: PrefabId) -> &mut Prefab {
        &mut self.prefabs[id.index()]
    }

    /// Place a prefab instance, assigning the next sequential entity id
    pub fn add_entity(&mut self, mut entity: PrefabEntity) -> &mut PrefabEntity {
        entity
            .info
            .assign_id(EntityId::from_raw(self.next_entity_id));
        self.next_entity_id += 1;
        self.entities.push(entity);
        self.entities.last_mut().expect("just pushed")
    }

    /// Add a light, assigning the next sequential light id
    pub fn add_light(&mut self, mut light: Light) -> &mut Light {
        light.info.assign_id(EntityId::from_raw(self.next_light_id));
        self.next_light_id += 1;
        self.lights.push(light);
        self.lights.last_mut().expect("just pushed")
    }

    /// The ambient term the current frame should use
    pub fn effective_ambient(&self) -> Vec3 {
        if self.ambient_enabled {
            self.ambient_light
        } else {
            Vec3::ZERO
        }
    }

    /// Lights that contribute to shading this frame, in scene order.
    /// Accumulation order matters: the first visible light owns the
    /// opaque/ambient slot.
    pub fn visible_lights(&self) -> impl Iterator<Item = (usize, &Light)> {
        self.lights
            .iter()
            .enumerate()
            .filter(|(_, light)| light.info.visible)
    }

    /// Weak selection by kind + id; no ownership implied
    pub fn select(&mut self, kind: EntityKind, id: EntityId) {
        self.selected = Some((kind, id));
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<(EntityKind, EntityId)> {
        self.selected
    }

    /// Per-frame camera-dependent light update. Must run before shadow-map
    /// generation: directional lights re-anchor to the viewer here.
    pub fn update(&mut self, camera: &Camera) {
        for light in &mut self.lights {
            if light.kind() == LightKind::Directional {
                light.update_directional(camera);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Prefab;

    #[test]
    fn test_ids_are_sequential_per_type() {
        let mut scene = Scene::new();
        let prefab = scene.add_prefab(Prefab::new("p"));

        let e0 = scene.add_entity(PrefabEntity::new(prefab)).id();
        let e1 = scene.add_entity(PrefabEntity::new(prefab)).id();
        let l0 = scene.add_light(Light::new(LightKind::Spot)).id();
        let l1 = scene.add_light(Light::new(LightKind::Directional)).id();

        assert_eq!(e0.raw(), 0);
        assert_eq!(e1.raw(), 1);
        // Light ids restart from zero: counters are per entity type
        assert_eq!(l0.raw(), 0);
        assert_eq!(l1.raw(), 1);
    }

    #[test]
    fn test_effective_ambient_toggle() {
        let mut scene = Scene::new();
        scene.ambient_light = Vec3::new(0.2, 0.3, 0.4);

        assert_eq!(scene.effective_ambient(), Vec3::new(0.2, 0.3, 0.4));
        scene.ambient_enabled = false;
        assert_eq!(scene.effective_ambient(), Vec3::ZERO);
        // The stored color is untouched by the toggle
        assert_eq!(scene.ambient_light, Vec3::new(0.2, 0.3, 0.4));
    }

    #[test]
    fn test_visible_lights_filters_and_keeps_order() {
        let mut scene = Scene::new();
        scene.add_light(Light::new(LightKind::Spot));
        scene.add_light(Light::new(LightKind::Point)).info.visible = false;
        scene.add_light(Light::new(LightKind::Directional));

        let visible: Vec<usize> = scene.visible_lights().map(|(i, _)| i).collect();
        assert_eq!(visible, vec![0, 2]);
    }

    #[test]
    fn test_update_re_aims_directional_lights_only() {
        let mut scene = Scene::new();
        scene.add_light(Light::new(LightKind::Spot));
        {
            let light = scene.add_light(Light::new(LightKind::Directional));
            light.target_vector = Vec3::new(100.0, 200.0, 0.0);
        }

        let mut viewer = Camera::new();
        viewer.look_at(Vec3::new(5.0, 0.0, 5.0), Vec3::ZERO, Vec3::UP);
        scene.update(&viewer);

        let directional = scene.lights[1].camera.as_ref().unwrap();
        assert!((directional.eye - Vec3::new(105.0, 200.0, 5.0)).length() < 1e-6);
        // The spot light's camera is untouched by update
        let spot = scene.lights[0].camera.as_ref().unwrap();
        assert!((spot.eye - Vec3::ZERO).length() < 1e-6);
    }
}
