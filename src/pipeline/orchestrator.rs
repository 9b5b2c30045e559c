use std::path::Path;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{MediaError, Result, SlicerError},
    media::{format_timestamp, MediaToolkit, RawSegmentFile, Segment},
    pipeline::{
        artifacts::ArtifactSet,
        planner::plan_segments,
        pool::{collect_batch, WorkerPool},
        postprocess::PostProcessor,
        report::{ArtifactRecord, FailureReason, PipelineFailure, PipelineOutcome, RunSummary},
        retry::{RetryController, RetryOutcome},
        stages::BatchRunner,
        verifier::SizeVerifier,
        workspace::Workspace,
    },
};

/// Runs one source video through the whole slicing pipeline
///
/// The pipeline follows a fixed sequence:
/// 1. Storage - Clear what the previous run left behind
/// 2. Planning - Probe the duration and cut it into fixed windows
/// 3. Splitting - Extract every window losslessly, in parallel
/// 4. Transcoding - Encode every window at the initial frame rate, in parallel
/// 5. Retrying - Re-encode oversized windows at lower frame rates
/// 6. Post-processing - Apply configured hooks to the accepted artifacts
pub struct PipelineOrchestrator {
    config: Config,
    toolkit: Box<dyn MediaToolkit>,
    post_processors: Vec<Box<dyn PostProcessor>>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator, registering the hooks enabled in `config`
    pub fn new(config: Config, toolkit: Box<dyn MediaToolkit>) -> Self {
        let mut post_processors: Vec<Box<dyn PostProcessor>> = Vec::new();
        if let Some(patch) = config.post_process.byte_patch {
            post_processors.push(Box::new(patch));
        }

        Self { config, toolkit, post_processors }
    }

    /// Register an extra post-processing hook
    pub fn with_post_processor(mut self, hook: Box<dyn PostProcessor>) -> Self {
        self.post_processors.push(hook);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Main entry point - slice, transcode and squeeze `source`
    ///
    /// Returns `Ok(PipelineOutcome::Failure(..))` for every failure that is
    /// part of the pipeline contract (unreadable input, failed split or
    /// transcode, exhausted retries, failed hook). `Err` is reserved for
    /// infrastructure problems such as storage I/O.
    pub fn run<P: AsRef<Path>>(&self, source: P) -> Result<PipelineOutcome> {
        let source = source.as_ref();
        let started = Instant::now();
        let started_at = Local::now();

        self.config.validate()?;

        info!("🎬 Starting webm-slicer run");
        info!("   Source: {:?}", source);
        info!("   Ceiling: {} bytes", self.config.pipeline.size_ceiling_bytes);
        info!("   Toolkit: {}", self.toolkit.name());

        // Step 1: Storage
        let workspace = Workspace::new(&self.config.storage, &self.config.encoder.artifact_extension);
        workspace.prepare()?;
        workspace.clear()?;

        // Step 2: Planning
        let duration = match self.toolkit.probe_duration(source) {
            Ok(duration) => duration,
            Err(e) => return Ok(Self::fail_before_work(FailureReason::ProbeFailed, e)),
        };
        info!("Duration of {}: {}", source.display(), format_timestamp(duration));

        let segments = match plan_segments(source, duration, self.config.pipeline.window_seconds) {
            Ok(segments) => segments,
            Err(e) => return Ok(Self::fail_before_work(FailureReason::InvalidDuration, e)),
        };
        info!("Splitting into {} segments of up to {}s",
              segments.len(), self.config.pipeline.window_seconds);

        let pool = WorkerPool::with_configured(self.config.pipeline.worker_threads)?;
        let runner = BatchRunner::new(
            &pool,
            self.toolkit.as_ref(),
            &workspace,
            self.config.encoder.target_width,
        );

        // Step 3: Splitting
        let raws = match self.split_phase(&runner, &segments) {
            Ok(raws) => raws,
            Err(failure) => return Ok(PipelineOutcome::Failure(failure)),
        };

        // Step 4: Transcoding
        let mut artifacts = match self.transcode_phase(&runner, &raws) {
            Ok(artifacts) => artifacts,
            Err(failure) => return Ok(PipelineOutcome::Failure(failure)),
        };

        // Step 5: Retrying
        let verifier = SizeVerifier::new(self.config.pipeline.size_ceiling_bytes);
        let controller = RetryController::new(
            &runner,
            verifier,
            self.config.retry.retry_start_fps,
            self.config.retry.min_fps,
        );
        let outcome = controller.converge(&mut artifacts, &raws)?;
        let retry_rounds = outcome.rounds();

        match outcome {
            RetryOutcome::Satisfied { .. } => {}
            RetryOutcome::Exhausted { oversized, .. } => {
                warn!("Could not convert all segments to the allowed size");
                let ids: Vec<usize> = oversized.iter().map(|v| v.segment_id()).collect();
                let detail = oversized
                    .iter()
                    .map(|v| v.exceeded(verifier.ceiling()).to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Ok(PipelineOutcome::Failure(
                    PipelineFailure::new(FailureReason::Exhausted, detail)
                        .with_segments(ids)
                        .with_artifacts(Self::records(&artifacts)),
                ));
            }
            RetryOutcome::TranscodeFailed { failure, .. } => {
                return Ok(PipelineOutcome::Failure(
                    PipelineFailure::new(FailureReason::TranscodeFailed, failure.detail())
                        .with_segments(failure.segment_ids)
                        .with_artifacts(Self::records(&artifacts)),
                ));
            }
        }

        // Step 6: Post-processing
        if let Err(failure) = self.post_process_phase(&pool, &artifacts) {
            return Ok(PipelineOutcome::Failure(failure.with_artifacts(Self::records(&artifacts))));
        }

        let summary = RunSummary {
            source: source.to_path_buf(),
            started_at,
            duration_seconds: duration,
            segment_count: segments.len(),
            retry_rounds,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            artifacts: Self::records(&artifacts),
        };

        info!("🎉 Run complete:");
        info!("   Segments: {}", summary.segment_count);
        info!("   Retry rounds: {}", summary.retry_rounds);
        info!("   Final fps per segment: {:?}", summary.final_fps());
        info!("   Elapsed: {:.2}s", summary.elapsed_seconds);

        Ok(PipelineOutcome::Success(summary))
    }

    fn split_phase(
        &self,
        runner: &BatchRunner<'_>,
        segments: &[Segment],
    ) -> std::result::Result<Vec<RawSegmentFile>, PipelineFailure> {
        info!("✂️  Splitting {} segments...", segments.len());

        let raws = runner.split_all(segments).map_err(|failure| {
            PipelineFailure::new(FailureReason::SplitFailed, failure.detail())
                .with_segments(failure.segment_ids)
        })?;

        info!("   ✅ Splitting done. {} segments created", raws.len());
        Ok(raws)
    }

    fn transcode_phase(
        &self,
        runner: &BatchRunner<'_>,
        raws: &[RawSegmentFile],
    ) -> std::result::Result<ArtifactSet, PipelineFailure> {
        let fps = self.config.retry.initial_fps;
        info!("🎞️  Converting {} segments at {} fps...", raws.len(), fps);

        let raw_refs: Vec<&RawSegmentFile> = raws.iter().collect();
        let artifacts: ArtifactSet = runner
            .transcode_all(&raw_refs, fps)
            .map_err(|failure| {
                let completed: Vec<ArtifactRecord> = failure
                    .completed
                    .iter()
                    .cloned()
                    .map(|mut artifact| {
                        if let Err(e) = artifact.measure() {
                            warn!("Could not measure {}: {}", artifact.path.display(), e);
                        }
                        ArtifactRecord::from(&artifact)
                    })
                    .collect();
                PipelineFailure::new(FailureReason::TranscodeFailed, failure.detail())
                    .with_segments(failure.segment_ids)
                    .with_artifacts(completed)
            })?
            .into_iter()
            .collect();

        info!("   ✅ Converting done. {} artifacts created", artifacts.len());
        Ok(artifacts)
    }

    fn post_process_phase(
        &self,
        pool: &WorkerPool,
        artifacts: &ArtifactSet,
    ) -> std::result::Result<(), PipelineFailure> {
        for hook in &self.post_processors {
            debug!("Applying {} to {} artifacts", hook.name(), artifacts.len());

            let hook: &dyn PostProcessor = hook.as_ref();
            let jobs: Vec<_> = artifacts
                .iter()
                .map(|artifact| move || hook.apply(artifact))
                .collect();

            collect_batch(pool.run_all(jobs), &artifacts.ids()).map_err(|failure| {
                PipelineFailure::new(FailureReason::PostProcessFailed, failure.detail())
                    .with_segments(failure.segment_ids)
            })?;

            info!("Applied {} to {} artifacts", hook.name(), artifacts.len());
        }
        Ok(())
    }

    fn fail_before_work(reason: FailureReason, error: SlicerError) -> PipelineOutcome {
        warn!("Aborting before any work: {}", error);
        let reason = match error {
            SlicerError::Media(MediaError::InvalidDuration { .. }) => FailureReason::InvalidDuration,
            _ => reason,
        };
        PipelineOutcome::Failure(PipelineFailure::new(reason, error.user_message()))
    }

    fn records(artifacts: &ArtifactSet) -> Vec<ArtifactRecord> {
        artifacts.iter().map(ArtifactRecord::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::pipeline::postprocess::BytePatch;
    use crate::pipeline::testing::{transcodes_at, Call, FakeToolkit};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn config_in(root: &Path) -> Config {
        let mut config = Config::default();
        config.storage = StorageConfig { root: root.to_path_buf(), ..StorageConfig::default() };
        config.pipeline.worker_threads = Some(2);
        config.pipeline.size_ceiling_bytes = 1000;
        config
    }

    fn split_ranges(calls: &[Call]) -> Vec<(usize, f64, f64)> {
        let mut ranges: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                Call::Split { segment_id, start, end } => Some((*segment_id, *start, *end)),
                _ => None,
            })
            .collect();
        ranges.sort_by_key(|r| r.0);
        ranges
    }

    #[test]
    fn test_all_under_budget_needs_no_retry() {
        let dir = tempdir().unwrap();
        let toolkit = FakeToolkit::new(250.0, |_, _| 999);
        let calls = toolkit.call_log();

        let orchestrator = PipelineOrchestrator::new(config_in(dir.path()), Box::new(toolkit));
        let outcome = orchestrator.run(dir.path().join("input_video.mp4")).unwrap();

        let summary = outcome.summary().expect("run should succeed");
        assert_eq!(summary.segment_count, 3);
        assert_eq!(summary.retry_rounds, 0);
        assert_eq!(summary.final_fps(), vec![10, 10, 10]);
        assert_eq!(summary.artifacts.iter().map(|a| a.segment_id).collect::<Vec<_>>(), vec![0, 1, 2]);

        let calls = calls.lock().unwrap();
        assert_eq!(
            split_ranges(&calls),
            vec![(0, 0.0, 120.0), (1, 120.0, 240.0), (2, 240.0, 250.0)]
        );
        assert_eq!(transcodes_at(&calls, 10), vec![0, 1, 2]);
        assert!(transcodes_at(&calls, 9).is_empty());
    }

    #[test]
    fn test_oversized_segment_steps_down_two_rounds() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.retry.initial_fps = 9;
        config.retry.retry_start_fps = 8;

        let toolkit = FakeToolkit::new(250.0, |id, fps| if id == 1 && fps >= 8 { 1000 } else { 400 });
        let calls = toolkit.call_log();

        let outcome = PipelineOrchestrator::new(config, Box::new(toolkit))
            .run(dir.path().join("input_video.mp4"))
            .unwrap();

        let summary = outcome.summary().expect("run should succeed");
        assert_eq!(summary.retry_rounds, 2);
        assert_eq!(summary.final_fps(), vec![9, 7, 9]);

        let calls = calls.lock().unwrap();
        assert_eq!(transcodes_at(&calls, 9), vec![0, 1, 2]);
        assert_eq!(transcodes_at(&calls, 8), vec![1]);
        assert_eq!(transcodes_at(&calls, 7), vec![1]);
    }

    #[test]
    fn test_persistently_oversized_segment_exhausts() {
        let dir = tempdir().unwrap();
        let toolkit = FakeToolkit::new(250.0, |id, _| if id == 0 { 5000 } else { 10 });

        let outcome = PipelineOrchestrator::new(config_in(dir.path()), Box::new(toolkit))
            .run(dir.path().join("input_video.mp4"))
            .unwrap();

        let failure = outcome.failure().expect("run should fail");
        assert_eq!(failure.reason, FailureReason::Exhausted);
        assert_eq!(failure.segment_ids, vec![0]);
        assert!(failure.detail.contains("Segment 0 is 5000 bytes"));
        assert_eq!(failure.artifacts.len(), 3);
        assert_eq!(failure.artifacts[0].fps, 1);
        assert!(failure.artifacts.iter().all(|a| a.path.exists()));
    }

    #[test]
    fn test_split_failure_is_terminal() {
        let dir = tempdir().unwrap();
        let toolkit = FakeToolkit::new(250.0, |_, _| 10).failing_split(2);
        let calls = toolkit.call_log();

        let outcome = PipelineOrchestrator::new(config_in(dir.path()), Box::new(toolkit))
            .run(dir.path().join("input_video.mp4"))
            .unwrap();

        let failure = outcome.failure().expect("run should fail");
        assert_eq!(failure.reason, FailureReason::SplitFailed);
        assert_eq!(failure.segment_ids, vec![2]);

        // Siblings still ran, nothing was transcoded
        let calls = calls.lock().unwrap();
        assert_eq!(split_ranges(&calls).len(), 3);
        assert!(!calls.iter().any(|c| matches!(c, Call::Transcode { .. })));
    }

    #[test]
    fn test_probe_failure_aborts_before_work() {
        let dir = tempdir().unwrap();
        let toolkit = FakeToolkit::unreadable();
        let calls = toolkit.call_log();

        let outcome = PipelineOrchestrator::new(config_in(dir.path()), Box::new(toolkit))
            .run(dir.path().join("broken.mp4"))
            .unwrap();

        assert_eq!(outcome.failure().map(|f| f.reason), Some(FailureReason::ProbeFailed));
        assert_eq!(*calls.lock().unwrap(), vec![Call::Probe]);
    }

    #[test]
    fn test_zero_duration_is_invalid() {
        let dir = tempdir().unwrap();
        let toolkit = FakeToolkit::new(0.0, |_, _| 10);

        let outcome = PipelineOrchestrator::new(config_in(dir.path()), Box::new(toolkit))
            .run(dir.path().join("empty.mp4"))
            .unwrap();

        assert_eq!(outcome.failure().map(|f| f.reason), Some(FailureReason::InvalidDuration));
    }

    #[test]
    fn test_initial_transcode_failure_is_reported() {
        let dir = tempdir().unwrap();
        let toolkit = FakeToolkit::new(130.0, |_, _| 10).failing_transcode(1, 10);

        let outcome = PipelineOrchestrator::new(config_in(dir.path()), Box::new(toolkit))
            .run(dir.path().join("input_video.mp4"))
            .unwrap();

        let failure = outcome.failure().expect("run should fail");
        assert_eq!(failure.reason, FailureReason::TranscodeFailed);
        assert_eq!(failure.segment_ids, vec![1]);
        assert_eq!(failure.artifacts.len(), 1);
        assert_eq!(failure.artifacts[0].segment_id, 0);
        assert_eq!(failure.artifacts[0].fps, 10);
        assert_eq!(failure.artifacts[0].size_bytes, Some(10));
    }

    #[test]
    fn test_retry_failure_reports_artifacts_as_on_disk() {
        let dir = tempdir().unwrap();
        let toolkit = FakeToolkit::new(240.0, |_, fps| 200 * fps as usize).failing_transcode(0, 9);

        let outcome = PipelineOrchestrator::new(config_in(dir.path()), Box::new(toolkit))
            .run(dir.path().join("input_video.mp4"))
            .unwrap();

        let failure = outcome.failure().expect("run should fail");
        assert_eq!(failure.reason, FailureReason::TranscodeFailed);
        assert_eq!(failure.segment_ids, vec![0]);
        assert_eq!(failure.artifacts.len(), 2);

        let untouched = &failure.artifacts[0];
        assert_eq!((untouched.fps, untouched.size_bytes), (10, Some(2000)));

        let reencoded = &failure.artifacts[1];
        assert_eq!((reencoded.fps, reencoded.size_bytes), (9, Some(1800)));
        assert_eq!(std::fs::metadata(&reencoded.path).unwrap().len(), 1800);
    }

    #[test]
    fn test_runs_are_idempotent_and_clear_stale_files() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let size_of = |id: usize, fps: u32| if id % 2 == 1 { 200 * fps as usize } else { 300 };

        let first = PipelineOrchestrator::new(config.clone(), Box::new(FakeToolkit::new(610.0, size_of)))
            .run(dir.path().join("input_video.mp4"))
            .unwrap();

        let stale = dir.path().join("artifacts").join("artifact_0099.webm");
        std::fs::write(&stale, b"left over").unwrap();

        let second = PipelineOrchestrator::new(config, Box::new(FakeToolkit::new(610.0, size_of)))
            .run(dir.path().join("input_video.mp4"))
            .unwrap();

        let (first, second) = (first.summary().unwrap(), second.summary().unwrap());
        assert_eq!(first.segment_count, 6);
        assert_eq!(first.segment_count, second.segment_count);
        assert_eq!(first.final_fps(), second.final_fps());
        assert_eq!(first.final_fps(), vec![10, 4, 10, 4, 10, 4]);
        assert!(!stale.exists());
    }

    #[test]
    fn test_byte_patch_applies_after_success() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.post_process.byte_patch = Some(BytePatch { offset: 254, value: 0x30 });

        let outcome = PipelineOrchestrator::new(config, Box::new(FakeToolkit::new(200.0, |_, _| 600)))
            .run(dir.path().join("input_video.mp4"))
            .unwrap();

        let summary = outcome.summary().expect("run should succeed");
        for record in &summary.artifacts {
            let data = std::fs::read(&record.path).unwrap();
            assert_eq!(data[254], 0x30);
            assert_eq!(data[253], 0x1a);
        }
    }

    #[test]
    fn test_failing_hook_is_reported() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.post_process.byte_patch = Some(BytePatch { offset: 800, value: 0x30 });

        let outcome = PipelineOrchestrator::new(config, Box::new(FakeToolkit::new(200.0, |_, _| 600)))
            .run(dir.path().join("input_video.mp4"))
            .unwrap();

        let failure = outcome.failure().expect("run should fail");
        assert_eq!(failure.reason, FailureReason::PostProcessFailed);
        assert_eq!(failure.segment_ids, vec![0, 1]);
        assert_eq!(failure.artifacts.len(), 2);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.pipeline.window_seconds = 0;

        let result = PipelineOrchestrator::new(config, Box::new(FakeToolkit::new(10.0, |_, _| 1)))
            .run(PathBuf::from("input_video.mp4"));
        assert!(result.is_err());
    }
}
