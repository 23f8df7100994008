//! Editor configuration.

use crate::render::CameraSettings;
use crate::scene::SpinMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "LEVELEDIT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "leveledit.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub camera: CameraSettings,
    /// Directory model references are resolved against.
    pub asset_root: PathBuf,
    pub default_level_name: String,
    pub default_model: String,
    /// Add one entity when content loads into an empty level.
    pub spawn_default_entity: bool,
    pub spin_mode: SpinMode,
    /// Show camera position in the window title.
    pub debug_overlay: bool,
    pub gizmo_length: f32,
    pub clear_color: [f32; 4],
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            asset_root: PathBuf::from("assets"),
            default_level_name: "Untitled".to_string(),
            default_model: "Cube".to_string(),
            spawn_default_entity: true,
            spin_mode: SpinMode::PerSecond,
            debug_overlay: true,
            gizmo_length: 1.0,
            clear_color: [25.0 / 255.0, 40.0 / 255.0, 80.0 / 255.0, 1.0],
        }
    }
}

impl EditorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.camera.validate()?;
        if !self.gizmo_length.is_finite() {
            return Err("gizmo_length must be finite".to_string());
        }
        if self.clear_color.iter().any(|channel| !channel.is_finite()) {
            return Err("clear_color must be finite".to_string());
        }
        Ok(())
    }

    /// `$LEVELEDIT_CONFIG`, else `./leveledit.json` if present, else defaults.
    /// A file that cannot be read, parsed or validated is logged and ignored.
    pub fn from_env() -> Self {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !local.is_file() {
                    return Self::default();
                }
                local
            }
        };
        match Self::from_file(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("{err}; using default config");
                Self::default()
            }
        }
    }
}
