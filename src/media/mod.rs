//! # Media Module
//!
//! Data types shared by every pipeline stage and the capabilities the pipeline
//! consumes (probe, split, transcode), with an ffmpeg-backed implementation.

pub mod types;
pub mod toolkit;
pub mod ffmpeg;

pub use types::{format_timestamp, Artifact, RawSegmentFile, Segment, TimeRange, TranscodeParams};
pub use toolkit::{MediaToolkit, SplitJob, TranscodeJob};
pub use ffmpeg::FfmpegToolkit;
