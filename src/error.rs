use thiserror::Error;

/// Main error type for the webm-slicer library
#[derive(Error, Debug)]
pub enum SlicerError {
    #[error("Media tool error: {0}")]
    Media(#[from] MediaError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised by the probe/split/transcode capabilities
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to probe duration of {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("Invalid media duration: {duration}")]
    InvalidDuration { duration: f64 },

    #[error("Failed to split segment {segment_id}: {reason}")]
    SplitFailed { segment_id: usize, reason: String },

    #[error("Failed to transcode segment {segment_id} at {fps} fps: {reason}")]
    TranscodeFailed {
        segment_id: usize,
        fps: u32,
        reason: String,
    },

    #[error("Required tool not available: {tool}")]
    ToolNotFound { tool: String },
}

/// Errors raised while orchestrating batches
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Worker job {index} panicked: {message}")]
    WorkerPanicked { index: usize, message: String },

    #[error("Failed to build worker pool: {reason}")]
    PoolBuildFailed { reason: String },

    #[error("Segment {segment_id} is {size} bytes, ceiling is {ceiling} bytes")]
    SizeExceeded {
        segment_id: usize,
        size: u64,
        ceiling: u64,
    },

    #[error("Post-processing of {path} failed: {reason}")]
    PostProcessFailed { path: String, reason: String },

    #[error("Storage operation failed on {path}: {reason}")]
    StorageFailed { path: String, reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using SlicerError
pub type Result<T> = std::result::Result<T, SlicerError>;

impl SlicerError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is worth retrying on the next run
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Media(MediaError::SplitFailed { .. }) => true,
            Self::Media(MediaError::TranscodeFailed { .. }) => true,
            Self::Pipeline(PipelineError::StorageFailed { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Media(MediaError::ToolNotFound { tool }) => {
                format!("Could not run '{}'. Install FFmpeg or point the [encoder] section of the config at it.", tool)
            }
            Self::Media(MediaError::ProbeFailed { path, .. }) => {
                format!("Could not read the duration of '{}'. Please check the file exists and is a video.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_convert_into_slicer_error() {
        let err: SlicerError = MediaError::InvalidDuration { duration: -1.0 }.into();
        assert!(matches!(err, SlicerError::Media(MediaError::InvalidDuration { .. })));
        assert_eq!(err.to_string(), "Media tool error: Invalid media duration: -1");
    }

    #[test]
    fn test_recoverable_classification() {
        let transient: SlicerError = MediaError::TranscodeFailed {
            segment_id: 2,
            fps: 9,
            reason: "exit status 1".to_string(),
        }
        .into();
        assert!(transient.is_recoverable());

        let fatal: SlicerError = MediaError::InvalidDuration { duration: 0.0 }.into();
        assert!(!fatal.is_recoverable());
    }

    #[test]
    fn test_user_message_for_missing_tool() {
        let err: SlicerError = MediaError::ToolNotFound { tool: "ffprobe".to_string() }.into();
        assert!(err.user_message().contains("'ffprobe'"));
    }
}
