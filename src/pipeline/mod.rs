//! # Slicing Pipeline
//!
//! Plans fixed-length segments, runs split and transcode batches on a bounded
//! worker pool, and steps the frame rate of oversized artifacts down until
//! every artifact fits the byte ceiling.

pub mod artifacts;
pub mod orchestrator;
pub mod planner;
pub mod pool;
pub mod postprocess;
pub mod report;
pub mod retry;
pub mod stages;
pub mod verifier;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use artifacts::ArtifactSet;
pub use orchestrator::PipelineOrchestrator;
pub use planner::{plan_boundaries, plan_segments};
pub use pool::{BatchFailure, WorkerPool};
pub use postprocess::{BytePatch, PostProcessor};
pub use report::{ArtifactRecord, FailureReason, PipelineFailure, PipelineOutcome, RunSummary};
pub use retry::{RetryController, RetryOutcome, RetryState, Transition};
pub use verifier::{SizeVerdict, SizeVerifier, Verification};
pub use workspace::Workspace;
