//! Engine configuration, loaded from an optional TOML file.
//!
//! Every field has a default, so a missing file or a partial file both work.
//! A file that exists but fails to parse is an error; silently rendering with
//! defaults would mask the typo.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Window creation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            title: "Vulkan Engine".to_string(),
        }
    }
}

/// Paths to compiled SPIR-V shader binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("shaders/vert.spv"),
            fragment: PathBuf::from("shaders/frag.spv"),
        }
    }
}

/// Paths to the scene's model and texture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub model: PathBuf,
    pub texture: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("assets/chalet.obj"),
            texture: PathBuf::from("assets/chalet.jpg"),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub shaders: ShaderConfig,
    pub assets: AssetConfig,
}

impl EngineConfig {
    /// Load from `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config = toml::from_str(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_expected_window() {
        let config = EngineConfig::default();
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 480);
        assert_eq!(config.shaders.vertex, PathBuf::from("shaders/vert.spv"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [window]
            title = "Chalet"
            width = 1280
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "Chalet");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 480);
        assert_eq!(config.shaders.fragment, PathBuf::from("shaders/frag.spv"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            EngineConfig::load_or_default(Path::new("/nonexistent/engine.toml")).unwrap();
        assert_eq!(config.window.height, 480);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        assert!(toml::from_str::<EngineConfig>("window = 3").is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = EngineConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.window.title, config.window.title);
        assert_eq!(parsed.assets.model, config.assets.model);
    }
}
