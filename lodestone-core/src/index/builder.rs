//! End-to-end index build: forward index, full and priority reverse
//! indexes, then the metadata file

use std::path::Path;
use std::time::Instant;

use super::metadata::IndexMetadata;
use crate::error::Result;
use crate::forward::ForwardIndexConverter;
use crate::journal::list_shards;
use crate::model::DomainRankings;
use crate::reverse::{ConstructionConfig, IndexKind, ReverseIndexConstructor};

/// Build every index file of the journal shards in `journal_dir` into
/// `index_dir`.
///
/// The failure policy of `config` applies to all three builds, so a shard
/// skipped by one is skipped by the others.
pub fn build_index(
    journal_dir: &Path,
    index_dir: &Path,
    rankings: &DomainRankings,
    config: ConstructionConfig,
) -> Result<IndexMetadata> {
    let start = Instant::now();
    std::fs::create_dir_all(index_dir)?;
    let shards = list_shards(journal_dir)?;
    log::info!(
        "building index {} from {} shards in {}",
        index_dir.display(),
        shards.len(),
        journal_dir.display()
    );

    let forward = ForwardIndexConverter::new(shards.clone(), index_dir, rankings.clone())
        .with_failure_policy(config.failure_policy)
        .convert()?;

    let constructor = ReverseIndexConstructor::new(config)?;
    let full = constructor.construct(&shards, index_dir, IndexKind::Full, rankings)?;
    let prio = constructor.construct(&shards, index_dir, IndexKind::Priority, rankings)?;

    let metadata = IndexMetadata {
        num_docs: forward.num_docs,
        full_terms: full.terms,
        prio_terms: prio.terms,
        full_postings: full.postings,
        prio_postings: prio.postings,
        shards: shards.len(),
        skipped_shards: full.skipped_shards.max(forward.skipped_shards),
        built_at: IndexMetadata::now_secs(),
        build_millis: start.elapsed().as_millis() as u64,
    };
    metadata.save(index_dir)?;
    log::info!(
        "index built in {:?}: {} documents, {} full terms, {} priority terms",
        start.elapsed(),
        metadata.num_docs,
        metadata.full_terms,
        metadata.prio_terms
    );
    Ok(metadata)
}
