//! In-process media toolkit for pipeline tests

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{MediaError, Result};
use crate::media::toolkit::{MediaToolkit, SplitJob, TranscodeJob};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Probe,
    Split { segment_id: usize, start: f64, end: f64 },
    Transcode { segment_id: usize, fps: u32 },
}

type SizeFn = dyn Fn(usize, u32) -> usize + Send + Sync;

/// Writes artifacts whose size is a pure function of `(segment id, fps)`
pub struct FakeToolkit {
    duration: Option<f64>,
    size_of: Box<SizeFn>,
    failing_splits: Vec<usize>,
    failing_transcodes: Vec<(usize, u32)>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeToolkit {
    pub fn new<F>(duration: f64, size_of: F) -> Self
    where
        F: Fn(usize, u32) -> usize + Send + Sync + 'static,
    {
        Self {
            duration: Some(duration),
            size_of: Box::new(size_of),
            failing_splits: Vec::new(),
            failing_transcodes: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A toolkit whose probe always fails
    pub fn unreadable() -> Self {
        Self {
            duration: None,
            ..Self::new(0.0, |_, _| 0)
        }
    }

    pub fn failing_split(mut self, segment_id: usize) -> Self {
        self.failing_splits.push(segment_id);
        self
    }

    pub fn failing_transcode(mut self, segment_id: usize, fps: u32) -> Self {
        self.failing_transcodes.push((segment_id, fps));
        self
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Segment ids transcoded at each fps, in the order the calls were made
pub fn transcodes_at(calls: &[Call], fps: u32) -> Vec<usize> {
    let mut ids: Vec<usize> = calls
        .iter()
        .filter_map(|call| match call {
            Call::Transcode { segment_id, fps: f } if *f == fps => Some(*segment_id),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids
}

impl MediaToolkit for FakeToolkit {
    fn name(&self) -> &str {
        "fake"
    }

    fn probe_duration(&self, source: &Path) -> Result<f64> {
        self.record(Call::Probe);
        self.duration.ok_or_else(|| {
            MediaError::ProbeFailed {
                path: source.display().to_string(),
                reason: "corrupt input".to_string(),
            }
            .into()
        })
    }

    fn split(&self, job: &SplitJob) -> Result<()> {
        self.record(Call::Split {
            segment_id: job.segment_id,
            start: job.range.start,
            end: job.range.end,
        });

        if self.failing_splits.contains(&job.segment_id) {
            return Err(MediaError::SplitFailed {
                segment_id: job.segment_id,
                reason: "exit status 1".to_string(),
            }
            .into());
        }

        std::fs::write(&job.output, format!("raw {}", job.segment_id))?;
        Ok(())
    }

    fn transcode(&self, job: &TranscodeJob) -> Result<()> {
        self.record(Call::Transcode { segment_id: job.segment_id, fps: job.params.fps });

        if self.failing_transcodes.contains(&(job.segment_id, job.params.fps)) {
            return Err(MediaError::TranscodeFailed {
                segment_id: job.segment_id,
                fps: job.params.fps,
                reason: "exit status 1".to_string(),
            }
            .into());
        }

        let size = (self.size_of)(job.segment_id, job.params.fps);
        std::fs::write(&job.output, vec![0x1a; size])?;
        Ok(())
    }
}
