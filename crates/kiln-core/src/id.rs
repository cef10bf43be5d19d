//! Handle newtypes for scene objects and external resources
//!
//! Entities, scene-graph nodes and GPU-side resources are all addressed by
//! index-style handles. Counters live on the owning store (`Scene`,
//! `AssetStore`) rather than in process-global state, so two scenes never
//! share an id space.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! handle_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a handle from a raw index
            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw index value
            pub fn raw(&self) -> u32 {
                self.0
            }

            /// Index into the owning store's backing vector
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle_type! {
    /// Identifier of an entity, assigned sequentially per entity kind by the
    /// owning `Scene` at insertion.
    EntityId
}

handle_type! {
    /// Index of a node within a prefab's node arena
    NodeId
}

handle_type! {
    /// Handle to a prefab (a node tree) in the scene's prefab store
    PrefabId
}

handle_type! {
    /// Handle to a mesh definition in the asset store
    MeshId
}

handle_type! {
    /// Handle to a material definition in the asset store
    MaterialId
}

handle_type! {
    /// Handle to a texture in the asset store
    TextureId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip() {
        let id = MeshId::from_raw(7);
        assert_eq!(id.raw(), 7);
        assert_eq!(id.index(), 7);
        assert_eq!(format!("{:?}", id), "MeshId(7)");
    }

    #[test]
    fn test_handle_ordering() {
        assert!(EntityId::from_raw(1) < EntityId::from_raw(2));
        assert_ne!(NodeId::from_raw(0), NodeId::from_raw(1));
    }
}
