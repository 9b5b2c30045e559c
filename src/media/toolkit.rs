use std::path::{Path, PathBuf};

use crate::{
    error::Result,
    media::types::{TimeRange, TranscodeParams},
};

/// Request to cut one segment out of the source without re-encoding
#[derive(Debug, Clone, PartialEq)]
pub struct SplitJob {
    pub segment_id: usize,
    pub source: PathBuf,
    pub range: TimeRange,
    pub output: PathBuf,
}

/// Request to encode one raw segment into an artifact
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub segment_id: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub params: TranscodeParams,
}

/// The media capabilities the pipeline depends on
///
/// The pipeline never knows how these are carried out. The shipped
/// implementation shells out to ffmpeg, tests use an in-process fake.
/// Implementations are shared across worker threads.
pub trait MediaToolkit: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Total playable duration of `source` in seconds
    fn probe_duration(&self, source: &Path) -> Result<f64>;

    /// Extract `job.range` of `job.source` into `job.output`
    ///
    /// Returns `MediaError::SplitFailed` when the cut could not be produced.
    fn split(&self, job: &SplitJob) -> Result<()>;

    /// Encode `job.input` into `job.output` using `job.params`
    ///
    /// Returns `MediaError::TranscodeFailed` when the encoder fails.
    fn transcode(&self, job: &TranscodeJob) -> Result<()>;

    /// Check that the toolkit can run at all
    fn check_available(&self) -> Result<()> {
        Ok(())
    }
}
