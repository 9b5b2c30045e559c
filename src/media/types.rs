use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Half-open time range `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length of the range in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A contiguous slice of the source media
///
/// The `id` is dense (`0..N-1`) and is the join key for every later stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: usize,
    pub range: TimeRange,
    pub source: PathBuf,
}

/// Losslessly extracted copy of one segment
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegmentFile {
    pub segment_id: usize,
    pub path: PathBuf,
}

/// Encoded output of one segment at a given frame rate
///
/// The size is read from disk on first request and cached afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub segment_id: usize,
    pub path: PathBuf,
    pub fps: u32,
    size_bytes: Option<u64>,
}

impl Artifact {
    pub fn new<P: Into<PathBuf>>(segment_id: usize, path: P, fps: u32) -> Self {
        Self {
            segment_id,
            path: path.into(),
            fps,
            size_bytes: None,
        }
    }

    /// Size on disk, stat-ing the file on first call
    pub fn measure(&mut self) -> Result<u64> {
        if let Some(size) = self.size_bytes {
            return Ok(size);
        }

        let size = std::fs::metadata(&self.path)?.len();
        self.size_bytes = Some(size);
        Ok(size)
    }

    /// Size if it has been measured already
    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }
}

/// Parameters for a single transcode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeParams {
    pub fps: u32,
    pub target_width: u32,
}

/// Format seconds as `HH:MM:SS`, truncating fractions
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

pub(crate) fn file_name_of(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("<unnamed>")
}
