//! Index-level metadata: document and term counts of the last build
//!
//! Stored as `index-meta.json` beside the index files. Written to a temp
//! file first and renamed into place, so a crashed build leaves the previous
//! metadata intact.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata file name in the index directory
pub const INDEX_META_FILENAME: &str = "index-meta.json";
const INDEX_META_TMP_FILENAME: &str = "index-meta.json.tmp";

/// Counts and timing of one index build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub num_docs: usize,
    pub full_terms: usize,
    pub prio_terms: usize,
    pub full_postings: u64,
    pub prio_postings: u64,
    pub shards: usize,
    #[serde(default)]
    pub skipped_shards: usize,
    /// Seconds since the unix epoch
    pub built_at: u64,
    pub build_millis: u64,
}

impl IndexMetadata {
    pub fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }

    /// Load from `dir`; `None` when the index has no metadata file
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(INDEX_META_FILENAME);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Save to `dir` (write temp file, then rename)
    pub fn save(&self, dir: &Path) -> Result<()> {
        let tmp = dir.join(INDEX_META_TMP_FILENAME);
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, dir.join(INDEX_META_FILENAME))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(IndexMetadata::load(dir.path()).unwrap(), None);

        let meta = IndexMetadata {
            num_docs: 512,
            full_terms: 512,
            prio_terms: 256,
            full_postings: 3_000,
            prio_postings: 1_000,
            shards: 4,
            skipped_shards: 0,
            built_at: IndexMetadata::now_secs(),
            build_millis: 12,
        };
        meta.save(dir.path()).unwrap();
        assert!(!dir.path().join(INDEX_META_TMP_FILENAME).exists());
        assert_eq!(IndexMetadata::load(dir.path()).unwrap(), Some(meta));
    }

    #[test]
    fn test_corrupt_metadata_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_META_FILENAME), b"{not json").unwrap();
        assert!(IndexMetadata::load(dir.path()).is_err());
    }
}
