use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result, SlicerError};

/// Bounded-parallelism executor for batches of independent jobs
///
/// Every call to [`WorkerPool::run_all`] is one batch: it blocks until each
/// job has finished, so batches never overlap.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Half the logical cores, never less than one
    pub fn default_parallelism() -> usize {
        (num_cpus::get() / 2).max(1)
    }

    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("slicer-worker-{}", i))
            .build()
            .map_err(|e| PipelineError::PoolBuildFailed { reason: e.to_string() })?;

        info!("Detected {} CPU cores, running batches on {} worker threads",
              num_cpus::get(), threads);

        Ok(Self { pool, threads })
    }

    /// Pool sized by `configured`, or half the cores when unset
    pub fn with_configured(configured: Option<usize>) -> Result<Self> {
        Self::new(configured.unwrap_or_else(Self::default_parallelism))
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run every job and return their results in submission order
    ///
    /// A failing or panicking job becomes an `Err` in its own slot and does
    /// not stop the rest of the batch.
    pub fn run_all<T, F>(&self, jobs: Vec<F>) -> Vec<Result<T>>
    where
        T: Send,
        F: FnOnce() -> Result<T> + Send,
    {
        debug!("Running batch of {} jobs on {} threads", jobs.len(), self.threads);

        self.pool.install(|| {
            jobs.into_par_iter()
                .enumerate()
                .map(|(index, job)| {
                    panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        warn!("Worker job {} panicked: {}", index, message);
                        Err(PipelineError::WorkerPanicked { index, message }.into())
                    })
                })
                .collect()
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Per-segment failures collected from one batch
///
/// `completed` holds the results of the jobs in the same batch that did
/// succeed, in submission order. Their side effects are already on disk.
#[derive(Debug)]
pub struct BatchFailure<T> {
    pub segment_ids: Vec<usize>,
    pub errors: Vec<SlicerError>,
    pub completed: Vec<T>,
}

impl<T> BatchFailure<T> {
    /// One line per failed segment
    pub fn detail(&self) -> String {
        self.segment_ids
            .iter()
            .zip(&self.errors)
            .map(|(id, err)| format!("segment {}: {}", id, err))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Split a batch's results into the successes or the full set of failures
///
/// `segment_ids[i]` names the segment that job `i` worked on. On failure the
/// successes travel along in `BatchFailure::completed`.
pub fn collect_batch<T>(
    results: Vec<Result<T>>,
    segment_ids: &[usize],
) -> std::result::Result<Vec<T>, BatchFailure<T>> {
    let mut successes = Vec::with_capacity(results.len());
    let mut failed_ids = Vec::new();
    let mut errors = Vec::new();

    for (result, &segment_id) in results.into_iter().zip(segment_ids) {
        match result {
            Ok(value) => successes.push(value),
            Err(e) => {
                warn!("Segment {} failed: {}", segment_id, e);
                failed_ids.push(segment_id);
                errors.push(e);
            }
        }
    }

    if errors.is_empty() {
        Ok(successes)
    } else {
        Err(BatchFailure { segment_ids: failed_ids, errors, completed: successes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_default_parallelism_is_at_least_one() {
        assert!(WorkerPool::default_parallelism() >= 1);
        assert!(WorkerPool::default_parallelism() <= num_cpus::get().max(1));
    }

    #[test]
    fn test_results_follow_submission_order() {
        let pool = WorkerPool::new(4).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);

        for n in [0usize, 1, 3, 17, 64] {
            let delays: Vec<u64> = (0..n).map(|_| rng.gen_range(0..15)).collect();
            let jobs: Vec<_> = delays
                .iter()
                .enumerate()
                .map(|(i, &delay)| {
                    move || {
                        std::thread::sleep(Duration::from_millis(delay));
                        Ok(i * 10)
                    }
                })
                .collect();

            let results = pool.run_all(jobs);
            assert_eq!(results.len(), n);
            for (i, result) in results.into_iter().enumerate() {
                assert_eq!(result.unwrap(), i * 10);
            }
        }
    }

    #[test]
    fn test_failure_does_not_abort_siblings() {
        let pool = WorkerPool::new(2).unwrap();
        let finished = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<_> = (0..6)
            .map(|i| {
                let finished = Arc::clone(&finished);
                move || {
                    if i == 1 {
                        return Err(SlicerError::generic("boom"));
                    }
                    std::thread::sleep(Duration::from_millis(5));
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(i)
                }
            })
            .collect();

        let results = pool.run_all(jobs);
        assert_eq!(finished.load(Ordering::SeqCst), 5);
        assert!(results[1].is_err());
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
    }

    #[test]
    fn test_panic_is_captured_per_job() {
        let pool = WorkerPool::new(2).unwrap();
        let jobs: Vec<Box<dyn FnOnce() -> Result<u32> + Send>> = vec![
            Box::new(|| Ok(1)),
            Box::new(|| panic!("encoder exploded")),
            Box::new(|| Ok(3)),
        ];

        let results = pool.run_all(jobs);
        assert_eq!(results[0].as_ref().unwrap(), &1);
        assert_eq!(results[2].as_ref().unwrap(), &3);
        match &results[1] {
            Err(SlicerError::Pipeline(PipelineError::WorkerPanicked { index, message })) => {
                assert_eq!(*index, 1);
                assert!(message.contains("encoder exploded"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_collect_batch_reports_every_failure() {
        let results: Vec<Result<usize>> = vec![
            Ok(0),
            Err(SlicerError::generic("first")),
            Ok(2),
            Err(SlicerError::generic("second")),
        ];

        let failure = collect_batch(results, &[10, 11, 12, 13]).unwrap_err();
        assert_eq!(failure.segment_ids, vec![11, 13]);
        assert_eq!(failure.completed, vec![0, 2]);
        assert!(failure.detail().contains("segment 11: Generic error: first"));
        assert!(failure.detail().contains("segment 13"));

        let ok: Vec<Result<usize>> = vec![Ok(4), Ok(5)];
        assert_eq!(collect_batch(ok, &[0, 1]).unwrap(), vec![4, 5]);
    }
}
