use tracing::{info, warn};

use crate::error::{Result, SlicerError};
use crate::media::types::{Artifact, RawSegmentFile};
use crate::pipeline::artifacts::ArtifactSet;
use crate::pipeline::pool::BatchFailure;
use crate::pipeline::stages::BatchRunner;
use crate::pipeline::verifier::{SizeVerdict, SizeVerifier};

/// Frame rate for the next round and how many rounds are left
///
/// One value is shared by every rejected segment of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub current_fps: u32,
    pub remaining_steps: u32,
}

/// What the controller does after an evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing was rejected
    Satisfied,

    /// Rejects remain and no lower frame rate is allowed
    Exhausted { oversized: Vec<usize> },

    /// Re-encode `segment_ids` at `fps`, then evaluate again from `next`
    Retry {
        fps: u32,
        segment_ids: Vec<usize>,
        next: RetryState,
    },
}

impl RetryState {
    /// Rounds run at `start_fps`, `start_fps - 1`, … down to `min_fps`
    pub fn new(start_fps: u32, min_fps: u32) -> Self {
        let remaining_steps = if start_fps >= min_fps && start_fps > 0 {
            start_fps - min_fps.max(1) + 1
        } else {
            0
        };

        Self { current_fps: start_fps, remaining_steps }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_steps == 0
    }

    /// Decide the next step from the ids rejected by the last evaluation
    pub fn advance(self, rejected: Vec<usize>) -> Transition {
        if rejected.is_empty() {
            return Transition::Satisfied;
        }

        if self.is_exhausted() {
            return Transition::Exhausted { oversized: rejected };
        }

        Transition::Retry {
            fps: self.current_fps,
            segment_ids: rejected,
            next: RetryState {
                current_fps: self.current_fps - 1,
                remaining_steps: self.remaining_steps - 1,
            },
        }
    }
}

/// Terminal result of the retry loop
#[derive(Debug)]
pub enum RetryOutcome {
    Satisfied { rounds: u32 },
    Exhausted { rounds: u32, oversized: Vec<SizeVerdict> },
    TranscodeFailed { rounds: u32, failure: BatchFailure<Artifact> },
}

impl RetryOutcome {
    pub fn rounds(&self) -> u32 {
        match self {
            Self::Satisfied { rounds }
            | Self::Exhausted { rounds, .. }
            | Self::TranscodeFailed { rounds, .. } => *rounds,
        }
    }
}

/// Drives oversized artifacts toward the ceiling by lowering their frame rate
pub struct RetryController<'a> {
    runner: &'a BatchRunner<'a>,
    verifier: SizeVerifier,
    start_fps: u32,
    min_fps: u32,
}

impl<'a> RetryController<'a> {
    pub fn new(runner: &'a BatchRunner<'a>, verifier: SizeVerifier, start_fps: u32, min_fps: u32) -> Self {
        Self { runner, verifier, start_fps, min_fps }
    }

    /// Evaluate, re-encode the rejects, repeat until nothing is rejected or
    /// the frame rate range is used up
    ///
    /// The first evaluation covers every artifact. Later evaluations only
    /// cover the artifacts produced by the round before, so an accepted
    /// artifact keeps its verdict. Re-encoded artifacts replace their entry
    /// in `artifacts` by segment id.
    pub fn converge(&self, artifacts: &mut ArtifactSet, raws: &[RawSegmentFile]) -> Result<RetryOutcome> {
        let mut state = RetryState::new(self.start_fps, self.min_fps);
        let mut candidates = artifacts.ids();
        let mut rounds = 0;

        loop {
            let verification = self.verifier.verify(artifacts.select(&candidates))?;
            let rejected_ids = verification.rejected_ids();

            // Keep the measured sizes on the live entries
            for verdict in verification.accepted.iter().chain(&verification.rejected) {
                artifacts.upsert(verdict.artifact.clone());
            }

            match state.advance(rejected_ids) {
                Transition::Satisfied => {
                    info!("All {} artifacts are under {} bytes after {} retry rounds",
                          artifacts.len(), self.verifier.ceiling(), rounds);
                    return Ok(RetryOutcome::Satisfied { rounds });
                }
                Transition::Exhausted { oversized } => {
                    for verdict in &verification.rejected {
                        warn!("{}", verdict.exceeded(self.verifier.ceiling()));
                    }
                    warn!("Segments {:?} are still too large at the lowest frame rate", oversized);
                    return Ok(RetryOutcome::Exhausted { rounds, oversized: verification.rejected });
                }
                Transition::Retry { fps, segment_ids, next } => {
                    rounds += 1;
                    info!("Retry round {} started: {} segments at {} fps {:?}",
                          rounds, segment_ids.len(), fps, segment_ids);

                    let retry_raws = segment_ids
                        .iter()
                        .map(|&id| {
                            raws.iter().find(|raw| raw.segment_id == id).ok_or_else(|| {
                                SlicerError::generic(format!("no raw segment file for segment {}", id))
                            })
                        })
                        .collect::<Result<Vec<&RawSegmentFile>>>()?;

                    match self.runner.transcode_all(&retry_raws, fps) {
                        Ok(fresh) => {
                            for artifact in fresh {
                                artifacts.upsert(artifact);
                            }
                        }
                        Err(mut failure) => {
                            // The rest of the batch already replaced its files
                            for mut artifact in failure.completed.drain(..) {
                                if let Err(e) = artifact.measure() {
                                    warn!("Could not measure {}: {}", artifact.path.display(), e);
                                }
                                artifacts.upsert(artifact);
                            }
                            return Ok(RetryOutcome::TranscodeFailed { rounds, failure });
                        }
                    }

                    candidates = segment_ids;
                    state = next;
                }
            }
        }
    }
}
