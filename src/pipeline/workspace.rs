use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{PipelineError, Result};

/// On-disk layout for one run: a namespace for raw segments and one for artifacts
///
/// Each job writes to its own file, named by segment id, so workers never
/// contend for a path.
#[derive(Debug, Clone)]
pub struct Workspace {
    segments_dir: PathBuf,
    artifacts_dir: PathBuf,
    artifact_extension: String,
}

impl Workspace {
    pub fn new(storage: &StorageConfig, artifact_extension: &str) -> Self {
        Self {
            segments_dir: storage.root.join(&storage.segments_dir),
            artifacts_dir: storage.root.join(&storage.artifacts_dir),
            artifact_extension: artifact_extension.to_string(),
        }
    }

    pub fn segments_dir(&self) -> &Path {
        &self.segments_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Create both namespaces if they do not exist yet
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.segments_dir, &self.artifacts_dir] {
            std::fs::create_dir_all(dir).map_err(|e| PipelineError::StorageFailed {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Delete everything left in both namespaces by a previous run
    ///
    /// Returns the number of removed entries.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;

        for dir in [&self.segments_dir, &self.artifacts_dir] {
            if !dir.exists() {
                continue;
            }

            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                let outcome = if path.is_dir() {
                    std::fs::remove_dir_all(&path)
                } else {
                    std::fs::remove_file(&path)
                };

                outcome.map_err(|e| PipelineError::StorageFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                debug!("Removed stale {}", path.display());
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Cleared {} files left by the previous run", removed);
        }
        Ok(removed)
    }

    /// Raw segment file, keeping the source container so the copy stays lossless
    pub fn segment_path(&self, segment_id: usize, source: &Path) -> PathBuf {
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp4");
        self.segments_dir.join(format!("segment_{:04}.{}", segment_id, extension))
    }

    pub fn artifact_path(&self, segment_id: usize) -> PathBuf {
        self.artifacts_dir
            .join(format!("artifact_{:04}.{}", segment_id, self.artifact_extension))
    }
}
