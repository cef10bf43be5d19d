//! Error types for Kiln

use thiserror::Error;

/// The main error type for Kiln operations
#[derive(Debug, Error)]
pub enum KilnError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Prefab not found: {0}")]
    PrefabNotFound(String),

    #[error("Mesh not found: {0}")]
    MeshNotFound(String),

    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    #[error("Texture not found: {0}")]
    TextureNotFound(String),

    #[error("Scene error: {0}")]
    SceneError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Settings error: {0}")]
    SettingsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for Kiln operations
pub type Result<T> = std::result::Result<T, KilnError>;
