//! Kiln Core - Foundational types for the Kiln renderer
//!
//! This crate provides the types every other Kiln crate depends on:
//! - `EntityId`, `NodeId`, `PrefabId` and the resource handle newtypes
//! - `Transform`, `Vec3`, `Color` - Spatial types
//! - `Aabb` - axis-aligned bounding boxes for frustum culling
//! - Error types and Result alias

mod aabb;
mod error;
mod id;
mod types;

pub use aabb::Aabb;
pub use error::{KilnError, Result};
pub use id::{EntityId, MaterialId, MeshId, NodeId, PrefabId, TextureId};
pub use types::{
    mat4_identity, mat4_inverse, mat4_mul, mat4_mul_point, mat4_transpose, Color, Mat4, Transform,
    Vec3,
};
