//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, asset storage, external tools and pipeline
//! limits. Every section defaults sensibly so a completely empty `{}` file is
//! valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub tools: ToolsConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if !self.storage.root.exists() {
            warnings.push(format!(
                "storage.root {} does not exist; every asset lookup will fail",
                self.storage.root.display()
            ));
        }

        if let Some(ref ffmpeg) = self.tools.ffmpeg_path {
            if !ffmpeg.exists() {
                warnings.push(format!(
                    "tools.ffmpeg_path {} does not exist; falling back to PATH",
                    ffmpeg.display()
                ));
            }
        }

        let p = &self.pipeline;
        if p.image_timeout_secs == 0 {
            warnings.push("pipeline.image_timeout_secs is 0; every image request will time out".into());
        }
        if p.video_timeout_secs == 0 {
            warnings.push("pipeline.video_timeout_secs is 0; every video request will time out".into());
        }
        if p.stream_buffer_chunks == 0 {
            warnings.push("pipeline.stream_buffer_chunks is 0; using 1".into());
        }
        if p.stream_chunk_bytes < 1024 {
            warnings.push(format!(
                "pipeline.stream_chunk_bytes {} is very small; streaming will be slow",
                p.stream_chunk_bytes
            ));
        }
        if p.max_output_pixels == 0 {
            warnings.push("pipeline.max_output_pixels is 0; every resize will fail".into());
        }
        if !(1..=100).contains(&p.default_image_quality) {
            warnings.push(format!(
                "pipeline.default_image_quality {} is outside 1..=100 and will be clamped",
                p.default_image_quality
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Source asset storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory that public ids are resolved against.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

/// Limits and defaults applied by the transformation pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on a whole image chain.
    pub image_timeout_secs: u64,
    /// Upper bound on a whole video transcode.
    pub video_timeout_secs: u64,
    /// Number of chunks the video sink buffers before applying backpressure.
    pub stream_buffer_chunks: usize,
    /// Read size for transcode output chunks.
    pub stream_chunk_bytes: usize,
    /// JPEG quality used by `q_auto` when no quality is given.
    pub default_image_quality: u8,
    /// ffmpeg `-qscale:v` used by `q_auto` when no quality is given.
    pub default_video_qscale: u32,
    /// Box blur radius used by `b_blurred` when no radius is given.
    pub default_blur_radius: u32,
    /// Largest image (width x height) a resize may produce.
    pub max_output_pixels: u64,
}

impl PipelineConfig {
    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn video_timeout(&self) -> Duration {
        Duration::from_secs(self.video_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_timeout_secs: 30,
            video_timeout_secs: 600,
            stream_buffer_chunks: 16,
            stream_chunk_bytes: 64 * 1024,
            default_image_quality: 80,
            default_video_qscale: 5,
            default_blur_radius: 10,
            max_output_pixels: 50_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.root, PathBuf::from("uploads"));
        assert!(config.tools.ffmpeg_path.is_none());
        assert_eq!(config.pipeline.default_image_quality, 80);
        assert_eq!(config.pipeline.default_video_qscale, 5);
        assert_eq!(config.pipeline.default_blur_radius, 10);
        assert_eq!(config.pipeline.max_output_pixels, 50_000_000);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config =
            Config::from_json(r#"{"server": {"port": 9000}, "pipeline": {"video_timeout_secs": 5}}"#)
                .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.pipeline.video_timeout(), Duration::from_secs(5));
        assert_eq!(config.pipeline.image_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(Some(&dir.path().join("absent.json")));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediaforge.json");
        std::fs::write(&path, r#"{"storage": {"root": "/srv/assets"}}"#).unwrap();
        let config = Config::load_or_default(Some(&path));
        assert_eq!(config.storage.root, PathBuf::from("/srv/assets"));
    }

    #[test]
    fn validate_reports_problems() {
        let mut config = Config::default();
        config.server.port = 0;
        config.storage.root = PathBuf::from("/definitely/not/here");
        config.pipeline.default_image_quality = 0;
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("server.port")));
        assert!(warnings.iter().any(|w| w.contains("storage.root")));
        assert!(warnings.iter().any(|w| w.contains("default_image_quality")));
    }

    #[test]
    fn validate_clean_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.root = dir.path().to_path_buf();
        assert!(config.validate().is_empty());
    }
}
