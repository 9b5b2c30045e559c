use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::media::types::Artifact;

/// An artifact together with its measured size and the budget decision
#[derive(Debug, Clone, PartialEq)]
pub struct SizeVerdict {
    pub artifact: Artifact,
    pub size_bytes: u64,
    pub within_budget: bool,
}

impl SizeVerdict {
    pub fn segment_id(&self) -> usize {
        self.artifact.segment_id
    }

    /// The error describing why this artifact was rejected
    pub fn exceeded(&self, ceiling: u64) -> PipelineError {
        PipelineError::SizeExceeded {
            segment_id: self.segment_id(),
            size: self.size_bytes,
            ceiling,
        }
    }
}

/// Result of checking a set of artifacts against the ceiling
#[derive(Debug, Clone, Default)]
pub struct Verification {
    pub accepted: Vec<SizeVerdict>,
    pub rejected: Vec<SizeVerdict>,
}

impl Verification {
    pub fn rejected_ids(&self) -> Vec<usize> {
        self.rejected.iter().map(SizeVerdict::segment_id).collect()
    }

    pub fn is_satisfied(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Partitions artifacts by size against an exclusive byte ceiling
///
/// Only `size < ceiling` is accepted; an artifact of exactly `ceiling` bytes
/// is rejected.
#[derive(Debug, Clone, Copy)]
pub struct SizeVerifier {
    ceiling: u64,
}

impl SizeVerifier {
    pub fn new(ceiling: u64) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    pub fn accepts(&self, size_bytes: u64) -> bool {
        size_bytes < self.ceiling
    }

    /// Measure each artifact and split them into accepted and rejected,
    /// keeping input order inside each list
    pub fn verify<I>(&self, artifacts: I) -> Result<Verification>
    where
        I: IntoIterator<Item = Artifact>,
    {
        let mut verification = Verification::default();

        for mut artifact in artifacts {
            let size_bytes = artifact.measure()?;
            let within_budget = self.accepts(size_bytes);

            debug!("{} is {} bytes ({} ceiling {})",
                   artifact.file_name(), size_bytes,
                   if within_budget { "under" } else { "at or over" }, self.ceiling);

            let verdict = SizeVerdict { artifact, size_bytes, within_budget };
            if within_budget {
                verification.accepted.push(verdict);
            } else {
                verification.rejected.push(verdict);
            }
        }

        Ok(verification)
    }
}
