//! Viewer settings, read from `config.json` in the platform config directory.
//!
//! The file is optional and every field has a default, so a partial file only
//! overrides what it names.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::render::DrawColor;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub draw_color: DrawColor,
    pub stroke_width: f32,
    pub font_size: f32,
    pub window_size: [f32; 2],
    /// `env_logger` filter directives, e.g. `"info"` or `"dicom_annotator=debug"`.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            draw_color: DrawColor::default(),
            stroke_width: 1.5,
            font_size: 14.0,
            window_size: [1200.0, 800.0],
            log_filter: "info".to_owned(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dicom-annotator", "dicom-annotator")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let config = AppConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "font_size": 20.0, "draw_color": { "r": 0.0, "g": 1.0, "b": 0.0 } }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.font_size, 20.0);
        assert_eq!(config.draw_color, DrawColor { r: 0.0, g: 1.0, b: 0.0 });
        assert_eq!(config.stroke_width, AppConfig::default().stroke_width);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("config.json");
        fs::write(&path, "{ font_size: ").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::Serde(_))));
    }
}
