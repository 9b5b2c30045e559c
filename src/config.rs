use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    pipeline::postprocess::BytePatch,
};

/// Main configuration for webm-slicer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where intermediate segments and artifacts are written
    pub storage: StorageConfig,

    /// External encoder settings
    pub encoder: EncoderConfig,

    /// Segmentation and batching settings
    pub pipeline: PipelineConfig,

    /// Frame rate stepping for oversized artifacts
    pub retry: RetryConfig,

    /// Optional hooks applied to every accepted artifact
    pub post_process: PostProcessConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.encoder.validate()?;
        self.pipeline.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}

/// Intermediate storage layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Working directory that holds both namespaces
    pub root: PathBuf,

    /// Namespace for losslessly split source segments
    pub segments_dir: String,

    /// Namespace for encoded artifacts
    pub artifacts_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            segments_dir: "segments".to_string(),
            artifacts_dir: "artifacts".to_string(),
        }
    }
}

/// External encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,

    /// Codec passed to `-c:v`
    pub video_codec: String,

    /// Target bitrate passed to `-b:v`
    pub video_bitrate: String,

    /// Output width in pixels, height follows the aspect ratio
    pub target_width: u32,

    /// Drop the audio stream from artifacts
    pub strip_audio: bool,

    /// File extension (and container) of the artifacts
    pub artifact_extension: String,

    /// ffmpeg `-loglevel`
    pub log_level: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        let (ffmpeg_path, ffprobe_path) = if cfg!(windows) {
            ("./ffmpeg.exe", "./ffprobe.exe")
        } else {
            ("ffmpeg", "ffprobe")
        };

        Self {
            ffmpeg_path: ffmpeg_path.to_string(),
            ffprobe_path: ffprobe_path.to_string(),
            video_codec: "libvpx-vp9".to_string(),
            video_bitrate: "4k".to_string(),
            target_width: 512,
            strip_audio: true,
            artifact_extension: "webm".to_string(),
            log_level: "error".to_string(),
        }
    }
}

impl EncoderConfig {
    fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(ConfigError::InvalidValue {
                key: "encoder.target_width".to_string(),
                value: self.target_width.to_string()
            }.into());
        }

        if self.artifact_extension.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "encoder.artifact_extension".to_string(),
                value: String::new()
            }.into());
        }

        Ok(())
    }
}

/// Segmentation and batch execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Length of every segment except possibly the last (seconds)
    pub window_seconds: u32,

    /// Artifacts must be strictly smaller than this many bytes
    pub size_ceiling_bytes: u64,

    /// Worker threads per batch; half the logical cores when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_seconds: 120,
            size_ceiling_bytes: 256_000,
            worker_threads: None,
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.window_seconds".to_string(),
                value: self.window_seconds.to_string()
            }.into());
        }

        if self.size_ceiling_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.size_ceiling_bytes".to_string(),
                value: self.size_ceiling_bytes.to_string()
            }.into());
        }

        if self.worker_threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.worker_threads".to_string(),
                value: "0".to_string()
            }.into());
        }

        Ok(())
    }
}

/// Frame rate stepping configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Frame rate of the first transcode pass
    pub initial_fps: u32,

    /// Frame rate of the first retry round, lowered by one every round
    pub retry_start_fps: u32,

    /// Lowest frame rate attempted before giving up
    pub min_fps: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_fps: 10,
            retry_start_fps: 9,
            min_fps: 1,
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.min_fps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retry.min_fps".to_string(),
                value: self.min_fps.to_string()
            }.into());
        }

        // Every round must use a strictly lower fps than the pass before it.
        if self.retry_start_fps >= self.initial_fps || self.min_fps > self.retry_start_fps {
            return Err(ConfigError::InvalidValue {
                key: "retry.fps_range".to_string(),
                value: format!("{}>{}>={}", self.initial_fps, self.retry_start_fps, self.min_fps)
            }.into());
        }

        Ok(())
    }
}

/// Post-processing hooks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Overwrite a single byte of every final artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_patch: Option<BytePatch>,
}
