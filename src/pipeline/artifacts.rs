use std::collections::BTreeMap;

use crate::media::types::Artifact;

/// The live artifact of every segment, keyed by segment id
///
/// Retries replace an entry through [`ArtifactSet::upsert`]; iteration is
/// always in segment id order.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    entries: BTreeMap<usize, Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `artifact` to its segment id, returning the artifact it replaced
    pub fn upsert(&mut self, artifact: Artifact) -> Option<Artifact> {
        self.entries.insert(artifact.segment_id, artifact)
    }

    pub fn get(&self, segment_id: usize) -> Option<&Artifact> {
        self.entries.get(&segment_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.values()
    }

    /// Clones of the artifacts for `ids` that are present, in the given order
    pub fn select(&self, ids: &[usize]) -> Vec<Artifact> {
        ids.iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }

    pub fn into_vec(self) -> Vec<Artifact> {
        self.entries.into_values().collect()
    }
}

impl FromIterator<Artifact> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        let mut set = Self::new();
        for artifact in iter {
            set.upsert(artifact);
        }
        set
    }
}
