use tracing::{debug, info};

use crate::error::Result;
use crate::media::toolkit::{MediaToolkit, SplitJob, TranscodeJob};
use crate::media::types::{Artifact, RawSegmentFile, Segment, TranscodeParams};
use crate::pipeline::pool::{collect_batch, BatchFailure, WorkerPool};
use crate::pipeline::workspace::Workspace;

/// Turns segments and raw files into worker-pool batches
pub struct BatchRunner<'a> {
    pool: &'a WorkerPool,
    toolkit: &'a dyn MediaToolkit,
    workspace: &'a Workspace,
    target_width: u32,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        pool: &'a WorkerPool,
        toolkit: &'a dyn MediaToolkit,
        workspace: &'a Workspace,
        target_width: u32,
    ) -> Self {
        Self { pool, toolkit, workspace, target_width }
    }

    /// Cut every segment out of its source, one job per segment
    pub fn split_all(
        &self,
        segments: &[Segment],
    ) -> std::result::Result<Vec<RawSegmentFile>, BatchFailure<RawSegmentFile>> {
        let toolkit = self.toolkit;
        let ids: Vec<usize> = segments.iter().map(|s| s.id).collect();

        let jobs: Vec<_> = segments
            .iter()
            .map(|segment| {
                let job = SplitJob {
                    segment_id: segment.id,
                    source: segment.source.clone(),
                    range: segment.range,
                    output: self.workspace.segment_path(segment.id, &segment.source),
                };
                info!("Creating segment {} [{:.2}s, {:.2}s)",
                      segment.id, segment.range.start, segment.range.end);

                move || -> Result<RawSegmentFile> {
                    toolkit.split(&job)?;
                    debug!("Created {}", job.output.display());
                    Ok(RawSegmentFile { segment_id: job.segment_id, path: job.output })
                }
            })
            .collect();

        collect_batch(self.pool.run_all(jobs), &ids)
    }

    /// Encode the given raw files at `fps`, one job per file
    pub fn transcode_all(
        &self,
        raws: &[&RawSegmentFile],
        fps: u32,
    ) -> std::result::Result<Vec<Artifact>, BatchFailure<Artifact>> {
        let toolkit = self.toolkit;
        let params = TranscodeParams { fps, target_width: self.target_width };
        let ids: Vec<usize> = raws.iter().map(|raw| raw.segment_id).collect();

        let jobs: Vec<_> = raws
            .iter()
            .map(|raw| {
                let job = TranscodeJob {
                    segment_id: raw.segment_id,
                    input: raw.path.clone(),
                    output: self.workspace.artifact_path(raw.segment_id),
                    params,
                };

                move || -> Result<Artifact> {
                    debug!("Converting segment {} at {} fps", job.segment_id, job.params.fps);
                    toolkit.transcode(&job)?;
                    info!("Converted segment {} to {} at {} fps",
                          job.segment_id, job.output.display(), job.params.fps);
                    Ok(Artifact::new(job.segment_id, job.output, job.params.fps))
                }
            })
            .collect();

        collect_batch(self.pool.run_all(jobs), &ids)
    }
}
