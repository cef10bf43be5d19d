//! Kiln Scene - scene data model for the Kiln renderer
//!
//! This crate owns everything the renderer reads each frame:
//! - `Camera` - view/projection state with a frustum containment test
//! - `Prefab`/`Node` - the arena-based scene graph
//! - `PrefabEntity`/`Light` - placed entities behind the `Entity` trait
//! - `Scene` - the aggregate context object driving per-frame updates

mod camera;
mod entity;
mod light;
mod node;
mod scene;

pub use camera::{box_in_frustum, frustum_planes, Camera};
pub use entity::{Entity, EntityDescription, EntityInfo, EntityKind, PrefabEntity};
pub use light::{Light, LightKind, ShadowMapInfo, CASCADE_SLOTS};
pub use node::{Node, Prefab};
pub use scene::Scene;
