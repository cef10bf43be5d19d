//! Placed entities and the flat capability trait over them

use kiln_core::{mat4_identity, EntityId, Mat4, PrefabId, Transform, Vec3};
use serde::{Deserialize, Serialize};

/// Entity kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Prefab,
    Light,
}

/// State shared by every placed entity: identity, placement, flags
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub id: EntityId,
    pub name: String,
    /// Placement matrix applied last when resolving node transforms
    pub model: Mat4,
    pub visible: bool,
    pub selected: bool,
}

impl EntityInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::from_raw(0),
            name: name.into(),
            model: mat4_identity(),
            visible: true,
            selected: false,
        }
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        self.id = id;
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.model[3][0], self.model[3][1], self.model[3][2])
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.model[3][0] = position.x;
        self.model[3][1] = position.y;
        self.model[3][2] = position.z;
    }

    /// World-space forward direction (-Z axis of the placement matrix)
    pub fn front(&self) -> Vec3 {
        Vec3::new(-self.model[2][0], -self.model[2][1], -self.model[2][2]).normalized()
    }
}

/// Snapshot of an entity for inspection panels. Plain data - the editor
/// overlay consuming it is outside this crate.
#[derive(Debug, Clone, Serialize)]
pub struct EntityDescription {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
}

/// Flat capability interface over the placed entity kinds
pub trait Entity {
    fn info(&self) -> &EntityInfo;
    fn info_mut(&mut self) -> &mut EntityInfo;
    fn kind(&self) -> EntityKind;

    fn id(&self) -> EntityId {
        self.info().id
    }

    fn name(&self) -> &str {
        &self.info().name
    }

    /// Inspection hook: decomposed placement plus identity
    fn describe(&self) -> EntityDescription {
        let info = self.info();
        EntityDescription {
            id: info.id,
            kind: self.kind(),
            name: info.name.clone(),
            transform: Transform::from_matrix(&info.model),
            visible: info.visible,
        }
    }
}

/// An instance of a prefab placed in the scene
#[derive(Debug, Clone)]
pub struct PrefabEntity {
    pub info: EntityInfo,
    pub prefab: PrefabId,
}

impl PrefabEntity {
    pub fn new(prefab: PrefabId) -> Self {
        Self {
            info: EntityInfo::new("Prefab"),
            prefab,
        }
    }
}

impl Entity for PrefabEntity {
    fn info(&self) -> &EntityInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut EntityInfo {
        &mut self.info
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Prefab
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_info_position() {
        let mut info = EntityInfo::new("thing");
        info.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(info.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_front_is_negative_z_for_identity() {
        let info = EntityInfo::new("thing");
        assert!((info.front() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_describe_decomposes_placement() {
        let mut entity = PrefabEntity::new(PrefabId::from_raw(0));
        entity.info.model = Transform::from_position(Vec3::new(4.0, 0.0, -2.0)).to_matrix();

        let desc = entity.describe();
        assert_eq!(desc.kind, EntityKind::Prefab);
        assert!((desc.transform.position - Vec3::new(4.0, 0.0, -2.0)).length() < 1e-5);
    }
}
