//! Renderer configuration
//!
//! Loaded from TOML by the embedding application; defaults mirror the
//! viewer's stock behavior.

use kiln_core::{KilnError, Result};
use serde::{Deserialize, Serialize};

/// Which color pipeline renders the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Shadow-mapped multi-light forward rendering
    #[default]
    Forward,
    /// G-buffer geometry pass + full-screen lighting accumulation
    Deferred,
}

/// Renderer settings, deserializable from a TOML table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub pipeline: PipelineMode,
    /// Split the viewport into the four G-buffer channels (deferred only)
    pub show_gbuffers: bool,
    /// Draw each light's marker mesh unlit at its placement
    pub light_markers: bool,
    pub clear_color: [f32; 4],
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            pipeline: PipelineMode::Forward,
            show_gbuffers: false,
            light_markers: false,
            clear_color: [0.1, 0.1, 0.1, 1.0],
        }
    }
}

impl RendererSettings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| KilnError::SettingsError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RendererSettings::default();
        assert_eq!(settings.pipeline, PipelineMode::Forward);
        assert!(!settings.show_gbuffers);
        assert!(!settings.light_markers);
    }

    #[test]
    fn test_parse_partial_toml() {
        let settings = RendererSettings::from_toml_str(
            r#"
            pipeline = "deferred"
            show_gbuffers = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.pipeline, PipelineMode::Deferred);
        assert!(settings.show_gbuffers);
        // Unspecified fields keep their defaults
        assert_eq!(settings.clear_color, [0.1, 0.1, 0.1, 1.0]);
    }

    #[test]
    fn test_parse_rejects_unknown_pipeline() {
        assert!(RendererSettings::from_toml_str(r#"pipeline = "raytraced""#).is_err());
    }
}
