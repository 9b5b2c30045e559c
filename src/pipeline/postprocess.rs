use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::media::types::Artifact;

/// Hook run on every accepted artifact once the whole set fits the ceiling
pub trait PostProcessor: Send + Sync {
    /// Returns the unique name of this hook
    fn name(&self) -> &str;

    /// Apply the hook to one artifact file
    fn apply(&self, artifact: &Artifact) -> Result<()>;
}

/// Overwrites the byte at `offset` of every artifact with `value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BytePatch {
    pub offset: u64,
    pub value: u8,
}

impl PostProcessor for BytePatch {
    fn name(&self) -> &str {
        "byte_patch"
    }

    fn apply(&self, artifact: &Artifact) -> Result<()> {
        let failed = |reason: String| PipelineError::PostProcessFailed {
            path: artifact.path.display().to_string(),
            reason,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .open(&artifact.path)
            .map_err(|e| failed(e.to_string()))?;

        let len = file.metadata().map_err(|e| failed(e.to_string()))?.len();
        if self.offset >= len {
            return Err(failed(format!("offset {} is past the end of a {} byte file", self.offset, len)).into());
        }

        file.seek(SeekFrom::Start(self.offset))
            .and_then(|_| file.write_all(&[self.value]))
            .map_err(|e| failed(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_patch_overwrites_single_byte() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifact_0000.webm");
        std::fs::write(&path, vec![0u8; 300]).unwrap();

        let patch = BytePatch { offset: 254, value: 0x30 };
        patch.apply(&Artifact::new(0, &path, 10)).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 300);
        assert_eq!(data[254], 0x30);
        assert_eq!(data.iter().filter(|&&b| b != 0).count(), 1);
    }

    #[test]
    fn test_patch_past_end_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.webm");
        std::fs::write(&path, vec![0u8; 254]).unwrap();

        let err = BytePatch { offset: 254, value: 0x30 }
            .apply(&Artifact::new(0, &path, 10))
            .unwrap_err();
        assert!(err.to_string().contains("past the end"));
        assert_eq!(std::fs::read(&path).unwrap().len(), 254);
    }
}
