use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::media::types::Artifact;

/// One final artifact as reported to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub segment_id: usize,
    pub path: PathBuf,
    pub fps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl From<&Artifact> for ArtifactRecord {
    fn from(artifact: &Artifact) -> Self {
        Self {
            segment_id: artifact.segment_id,
            path: artifact.path.clone(),
            fps: artifact.fps,
            size_bytes: artifact.size_bytes(),
        }
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub source: PathBuf,
    pub started_at: DateTime<Local>,
    pub duration_seconds: f64,
    pub segment_count: usize,
    pub retry_rounds: u32,
    pub elapsed_seconds: f64,
    pub artifacts: Vec<ArtifactRecord>,
}

impl RunSummary {
    /// Final frame rate of every segment, in segment order
    pub fn final_fps(&self) -> Vec<u32> {
        self.artifacts.iter().map(|a| a.fps).collect()
    }

    /// Write the summary as TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "report".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Why a run did not produce a full set of artifacts under the ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    InvalidDuration,
    ProbeFailed,
    SplitFailed,
    TranscodeFailed,
    Exhausted,
    PostProcessFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidDuration => "invalid duration",
            Self::ProbeFailed => "probe failed",
            Self::SplitFailed => "split failed",
            Self::TranscodeFailed => "transcode failed",
            Self::Exhausted => "retry range exhausted",
            Self::PostProcessFailed => "post-processing failed",
        };
        f.write_str(label)
    }
}

/// Structured failure report
///
/// `segment_ids` lists the segments responsible (the oversized ones when the
/// retry range was exhausted). `artifacts` holds whatever was produced, which
/// stays on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFailure {
    pub reason: FailureReason,
    pub detail: String,
    pub segment_ids: Vec<usize>,
    pub artifacts: Vec<ArtifactRecord>,
}

impl PipelineFailure {
    pub fn new<S: Into<String>>(reason: FailureReason, detail: S) -> Self {
        Self {
            reason,
            detail: detail.into(),
            segment_ids: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_segments(mut self, segment_ids: Vec<usize>) -> Self {
        self.segment_ids = segment_ids;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Vec<ArtifactRecord>) -> Self {
        self.artifacts = artifacts;
        self
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.detail)?;
        if !self.segment_ids.is_empty() {
            write!(f, " (segments {:?})", self.segment_ids)?;
        }
        Ok(())
    }
}

/// Terminal status of a run
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Success(RunSummary),
    Failure(PipelineFailure),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Success(summary) => Some(summary),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}
