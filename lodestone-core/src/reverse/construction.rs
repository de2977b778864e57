//! Reverse index construction over a set of journal shards
//!
//! Each shard is turned into a [`Preindex`] on the construction pool, the
//! preindexes are reduced pairwise with [`Preindex::merge`], and the result
//! is finalized into the words and docs files of one [`IndexKind`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::positions::PositionsFileWriter;
use super::preindex::Preindex;
use super::{IndexKind, POSITIONS_FILE};
use crate::error::{Error, Result};
use crate::model::DomainRankings;

/// What to do when one shard cannot be turned into a preindex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Log the shard and build the index from the remaining ones
    SkipShard,
    /// Abort the whole run
    #[default]
    FailFast,
}

/// Reverse index construction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionConfig {
    /// Directory for intermediate preindex files
    pub work_dir: PathBuf,
    /// Threads of the construction pool
    pub num_threads: usize,
    /// Segments with fewer records than this are sorted on the calling thread
    pub sort_inline_threshold: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            num_threads: num_cpus::get().max(1),
            sort_inline_threshold: 1024,
            failure_policy: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseIndexStats {
    pub shards: usize,
    pub skipped_shards: usize,
    pub terms: usize,
    pub postings: u64,
}

pub struct ReverseIndexConstructor {
    config: ConstructionConfig,
    pool: rayon::ThreadPool,
}

impl ReverseIndexConstructor {
    pub fn new(config: ConstructionConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads.max(1))
            .thread_name(|i| format!("lodestone-construct-{}", i))
            .build()
            .map_err(|e| Error::Internal(format!("construction pool: {}", e)))?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &ConstructionConfig {
        &self.config
    }

    /// Build the `kind` index of `shards` into `out_dir`.
    ///
    /// The full index also writes the positions file.
    pub fn construct(
        &self,
        shards: &[PathBuf],
        out_dir: &Path,
        kind: IndexKind,
        rankings: &DomainRankings,
    ) -> Result<ReverseIndexStats> {
        std::fs::create_dir_all(out_dir)?;
        std::fs::create_dir_all(&self.config.work_dir)?;

        if shards.is_empty() {
            log::warn!("no journal shards, writing empty {} index", kind.name());
        }

        let positions = match kind {
            IndexKind::Full => Some(Mutex::new(PositionsFileWriter::create(
                &out_dir.join(POSITIONS_FILE),
            )?)),
            IndexKind::Priority => None,
        };

        log::info!(
            "constructing {} index from {} shards on {} threads",
            kind.name(),
            shards.len(),
            self.pool.current_num_threads()
        );

        let work_dir = self.config.work_dir.as_path();
        let threshold = self.config.sort_inline_threshold;
        let policy = self.config.failure_policy;
        let skipped = AtomicUsize::new(0);

        // Phase 1: per-shard preindexes, reduced pairwise as they complete
        let merged = self.pool.install(|| {
            shards
                .par_iter()
                .filter_map(|shard| {
                    match Preindex::construct(
                        shard,
                        kind,
                        rankings,
                        positions.as_ref(),
                        work_dir,
                        threshold,
                    ) {
                        Ok(preindex) => Some(Ok(preindex)),
                        Err(e) if policy == FailurePolicy::SkipShard => {
                            log::warn!("skipping shard {}: {}", shard.display(), e);
                            skipped.fetch_add(1, Ordering::Relaxed);
                            None
                        }
                        Err(e) => Some(Err(Error::Construction {
                            shard: shard.display().to_string(),
                            reason: e.to_string(),
                        })),
                    }
                })
                .try_reduce_with(|left, right| Preindex::merge(work_dir, left, right))
                .transpose()
        })?;

        // Phase 2: finalize
        let preindex = merged.unwrap_or_else(Preindex::empty);
        preindex.finalize(out_dir, kind)?;

        if let Some(positions) = positions {
            let size = positions.into_inner().finish()?;
            log::info!("positions file written: {} bytes", size);
        }

        let stats = ReverseIndexStats {
            shards: shards.len(),
            skipped_shards: skipped.into_inner(),
            terms: preindex.num_terms(),
            postings: preindex.num_records(),
        };
        log::info!(
            "{} index complete: {} terms, {} postings, {} shards skipped",
            kind.name(),
            stats.terms,
            stats.postings,
            stats.skipped_shards
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directories::map_file;
    use crate::journal::{list_shards, write_factor_journal};
    use crate::reverse::{DOCS_CONTEXT, WORDS_CONTEXT};
    use crate::structures::{BTreeReader, LongArray};

    fn constructor(work_dir: &Path, policy: FailurePolicy) -> ReverseIndexConstructor {
        ReverseIndexConstructor::new(ConstructionConfig {
            work_dir: work_dir.to_path_buf(),
            num_threads: 4,
            sort_inline_threshold: 8,
            failure_policy: policy,
        })
        .unwrap()
    }

    fn open_tree(path: &Path, ctx: crate::structures::BTreeContext, offset: u64) -> BTreeReader {
        let file = LongArray::new(map_file(path).unwrap()).unwrap();
        BTreeReader::new(file, ctx, offset).unwrap()
    }

    #[test]
    fn test_partitions_sorted_after_merge() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("journal");
        let out = dir.path().join("index");
        write_factor_journal(&journal, 300, 4).unwrap();
        let shards = list_shards(&journal).unwrap();

        let stats = constructor(&dir.path().join("work"), FailurePolicy::FailFast)
            .construct(&shards, &out, IndexKind::Full, &DomainRankings::new())
            .unwrap();
        assert_eq!(stats.shards, 4);
        assert_eq!(stats.terms, 300);

        let words = open_tree(&out.join(IndexKind::Full.words_file()), WORDS_CONTEXT, 0);
        assert_eq!(words.num_entries(), 300);
        for term in [1u64, 2, 7, 64, 150, 300] {
            let offset = words.get(term, 1).unwrap();
            let docs = open_tree(&out.join(IndexKind::Full.docs_file()), DOCS_CONTEXT, offset);
            assert_eq!(docs.num_entries() as u64, 300 / term, "term {}", term);
            let keys: Vec<u64> = docs.keys().collect();
            assert!(keys.windows(2).all(|w| w[0] < w[1]), "term {} unsorted", term);
        }
        assert!(out.join(POSITIONS_FILE).exists());
        assert_eq!(std::fs::read_dir(dir.path().join("work")).unwrap().count(), 0);
    }

    #[test]
    fn test_priority_only_flagged_terms() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("journal");
        let out = dir.path().join("index");
        write_factor_journal(&journal, 64, 2).unwrap();

        let stats = constructor(dir.path(), FailurePolicy::FailFast)
            .construct(
                &list_shards(&journal).unwrap(),
                &out,
                IndexKind::Priority,
                &DomainRankings::new(),
            )
            .unwrap();
        // Only even divisors carry the title flag
        assert_eq!(stats.terms, 32);
        let words = open_tree(&out.join(IndexKind::Priority.words_file()), WORDS_CONTEXT, 0);
        assert!(words.keys().all(|t| t % 2 == 0));
        assert!(!out.join(POSITIONS_FILE).exists());
    }

    #[test]
    fn test_failure_policy() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("journal");
        write_factor_journal(&journal, 50, 2).unwrap();
        let bad = journal.join("journal-0099.dat");
        std::fs::write(&bad, b"not a journal").unwrap();
        let shards = list_shards(&journal).unwrap();
        assert_eq!(shards.len(), 3);

        let out = dir.path().join("fail");
        let err = constructor(dir.path(), FailurePolicy::FailFast)
            .construct(&shards, &out, IndexKind::Full, &DomainRankings::new())
            .unwrap_err();
        assert!(matches!(err, Error::Construction { .. }));
        assert!(!out.join(IndexKind::Full.words_file()).exists());
        assert!(!out.join(POSITIONS_FILE).exists());

        let out = dir.path().join("skip");
        let stats = constructor(dir.path(), FailurePolicy::SkipShard)
            .construct(&shards, &out, IndexKind::Full, &DomainRankings::new())
            .unwrap();
        assert_eq!(stats.skipped_shards, 1);
        assert_eq!(stats.terms, 50);

        // The skipped shard leaves nothing behind in the positions file
        let clean = dir.path().join("clean");
        constructor(dir.path(), FailurePolicy::FailFast)
            .construct(&shards[..2], &clean, IndexKind::Full, &DomainRankings::new())
            .unwrap();
        assert_eq!(
            std::fs::metadata(out.join(POSITIONS_FILE)).unwrap().len(),
            std::fs::metadata(clean.join(POSITIONS_FILE)).unwrap().len()
        );
    }

    #[test]
    fn test_no_shards_writes_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("index");
        let stats = constructor(dir.path(), FailurePolicy::FailFast)
            .construct(&[], &out, IndexKind::Priority, &DomainRankings::new())
            .unwrap();
        assert_eq!(stats.terms, 0);
        let words = open_tree(&out.join(IndexKind::Priority.words_file()), WORDS_CONTEXT, 0);
        assert_eq!(words.num_entries(), 0);
    }
}
