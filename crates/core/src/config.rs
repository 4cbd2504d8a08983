//! Application configuration loaded from TOML.
//!
//! Every field has a default, so an empty or missing file yields a usable
//! configuration. Only the sections present in the file override defaults.
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//!
//! [renderer]
//! clear_color = [0.1, 0.1, 0.1, 1.0]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub renderer: RendererConfig,
    pub scene: SceneConfig,
    pub controls: ControlsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Chorus Engine".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Enable the Khronos validation layer.
    pub validation: bool,
    /// Color attachment clear value (RGBA).
    pub clear_color: [f32; 4],
    /// Compiled SPIR-V vertex shader.
    pub vertex_shader: PathBuf,
    /// Compiled SPIR-V fragment shader.
    pub fragment_shader: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            clear_color: [0.01, 0.01, 0.01, 1.0],
            vertex_shader: PathBuf::from("shaders/simple.vert.spv"),
            fragment_shader: PathBuf::from("shaders/simple.frag.spv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Wavefront OBJ file rendered by the demo scene.
    pub model: PathBuf,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/cube.obj"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlsConfig {
    /// Translation speed in units per second.
    pub move_speed: f32,
    /// Rotation speed in radians per second.
    pub look_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            look_speed: 1.5,
        }
    }
}

impl AppConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load the configuration at `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for malformed TOML and [`Error::Io`] when the
    /// file exists but cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
