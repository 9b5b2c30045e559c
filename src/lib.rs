//! # webm-slicer
//!
//! Split a video into fixed-length chunks, transcode every chunk in parallel and
//! squeeze each one under a byte budget by stepping its frame rate down.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use webm_slicer::{
//!     config::Config,
//!     media::FfmpegToolkit,
//!     pipeline::{PipelineOrchestrator, PipelineOutcome},
//! };
//!
//! # fn main() -> webm_slicer::Result<()> {
//! let config = Config::default();
//! let toolkit = FfmpegToolkit::new(config.encoder.clone());
//!
//! let orchestrator = PipelineOrchestrator::new(config, Box::new(toolkit));
//! match orchestrator.run("input_video.mp4")? {
//!     PipelineOutcome::Success(summary) => println!("{} segments", summary.segment_count),
//!     PipelineOutcome::Failure(failure) => eprintln!("{}", failure),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`media`] - Segment/artifact types and the probe/split/transcode capabilities
//! - [`pipeline`] - Planner, worker pool, size verifier, retry controller and orchestrator
//! - [`config`] - Configuration management
//!
//! ## Custom Toolkits
//!
//! The pipeline only talks to media tools through the
//! [`MediaToolkit`](media::MediaToolkit) trait:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use webm_slicer::media::{MediaToolkit, SplitJob, TranscodeJob};
//! use webm_slicer::Result;
//!
//! struct RemoteEncoder;
//!
//! impl MediaToolkit for RemoteEncoder {
//!     fn name(&self) -> &str {
//!         "remote"
//!     }
//!
//!     fn probe_duration(&self, source: &Path) -> Result<f64> {
//!         // Ask the remote service
//!         Ok(600.0)
//!     }
//!
//!     fn split(&self, job: &SplitJob) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     fn transcode(&self, job: &TranscodeJob) -> Result<()> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{Result, SlicerError},
    media::{FfmpegToolkit, MediaToolkit},
    pipeline::{PipelineOrchestrator, PipelineOutcome},
};
