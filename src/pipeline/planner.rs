use std::path::Path;

use crate::error::{MediaError, Result};
use crate::media::types::{Segment, TimeRange};

/// Cut points `0, W, 2W, …` up to the last multiple of `window` not past
/// `duration`, closed with `duration` itself when it is not already a cut.
pub fn plan_boundaries(duration: f64, window: u32) -> Result<Vec<f64>> {
    if !duration.is_finite() || duration <= 0.0 || window == 0 {
        return Err(MediaError::InvalidDuration { duration }.into());
    }

    let window = f64::from(window);
    let whole_windows = (duration / window).floor() as u64;

    let mut boundaries: Vec<f64> = (0..=whole_windows)
        .map(|k| k as f64 * window)
        .collect();

    // Float division can round a value just below a multiple up onto it.
    while boundaries.len() > 1 && boundaries.last().is_some_and(|&b| b > duration) {
        boundaries.pop();
    }

    if boundaries.last().copied() != Some(duration) {
        boundaries.push(duration);
    }

    Ok(boundaries)
}

/// Split `[0, duration)` into consecutive segments of `window` seconds
///
/// The last segment holds the remainder and may be shorter than `window`.
/// Fails with `MediaError::InvalidDuration` for non-positive durations.
pub fn plan_segments(source: &Path, duration: f64, window: u32) -> Result<Vec<Segment>> {
    let boundaries = plan_boundaries(duration, window)?;

    Ok(boundaries
        .windows(2)
        .enumerate()
        .map(|(id, pair)| Segment {
            id,
            range: TimeRange::new(pair[0], pair[1]),
            source: source.to_path_buf(),
        })
        .collect())
}
