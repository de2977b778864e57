//! Index operations: generate, build, info, query

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use lodestone_core::journal::{JournalWriter, factor_document};
use lodestone_core::model::{DocumentMetadata, id};
use lodestone_core::{
    CombinedIndex, ConstructionConfig, DomainRankings, ExecutionConfig, FailurePolicy,
    QueryLimits, QueryParams, RankingParameters, SearchQuery, Searcher, build_index,
};

/// Write a synthetic factor-based journal: documents `1..=docs` over `shards`
/// shards, one shard per rayon task
pub fn generate_journal(journal: &Path, docs: u64, shards: u32) -> Result<()> {
    std::fs::create_dir_all(journal)
        .with_context(|| format!("Failed to create journal directory: {:?}", journal))?;
    let shards = shards.max(1);
    let per_shard = docs.div_ceil(shards as u64).max(1);

    let start = Instant::now();
    let written: u64 = (0..shards)
        .into_par_iter()
        .map(|shard| -> Result<u64> {
            let first = shard as u64 * per_shard + 1;
            let last = (first + per_shard - 1).min(docs);
            let mut writer = JournalWriter::create(journal, shard)
                .with_context(|| format!("Failed to create shard {}", shard))?;
            for i in first..=last {
                writer.put(&factor_document(i))?;
            }
            Ok(writer.finish()?)
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))?;

    info!(
        "Wrote {} documents in {} shards to {:?} in {:?}",
        written,
        shards,
        journal,
        start.elapsed()
    );
    Ok(())
}

pub fn build(
    journal: &Path,
    index: &Path,
    rankings: Option<PathBuf>,
    threads: Option<usize>,
    work_dir: Option<PathBuf>,
    skip_failed: bool,
) -> Result<()> {
    let rankings = match rankings {
        Some(path) => DomainRankings::load(&path)
            .with_context(|| format!("Failed to load domain rankings: {:?}", path))?,
        None => DomainRankings::new(),
    };
    info!("Loaded rankings for {} domains", rankings.len());

    let scratch = work_dir.is_none();
    let mut config = ConstructionConfig {
        work_dir: work_dir.unwrap_or_else(|| index.join("work")),
        ..Default::default()
    };
    if let Some(threads) = threads {
        config.num_threads = threads;
    }
    if skip_failed {
        config.failure_policy = FailurePolicy::SkipShard;
    }
    let work = config.work_dir.clone();

    let meta = build_index(journal, index, &rankings, config)
        .with_context(|| format!("Failed to build index from {:?}", journal))?;
    if meta.skipped_shards > 0 {
        warn!("{} of {} shards skipped", meta.skipped_shards, meta.shards);
    }
    if scratch && let Err(e) = std::fs::remove_dir(&work) {
        warn!("Failed to remove work directory {:?}: {}", work, e);
    }

    info!(
        "Built index at {:?}: {} documents, {} full terms ({} postings), {} priority terms ({} postings) in {} ms",
        index,
        meta.num_docs,
        meta.full_terms,
        meta.full_postings,
        meta.prio_terms,
        meta.prio_postings,
        meta.build_millis
    );
    Ok(())
}

pub fn show_info(index: &Path) -> Result<()> {
    let combined = CombinedIndex::open(index);
    if !combined.is_loaded() {
        warn!("Some index files are missing under {:?}", index);
    }

    println!("Index: {:?}", index);
    println!("Documents: {}", combined.num_docs());
    println!("Full index terms: {}", combined.full().num_terms());
    println!("Priority index terms: {}", combined.prio().num_terms());
    if let Some(meta) = combined.metadata() {
        println!("Shards: {} ({} skipped)", meta.shards, meta.skipped_shards);
        println!("Full index postings: {}", meta.full_postings);
        println!("Priority index postings: {}", meta.prio_postings);
        println!("Built at: {} (took {} ms)", meta.built_at, meta.build_millis);
    }
    Ok(())
}

pub struct QueryOptions {
    pub terms: Vec<u64>,
    pub exclude: Vec<u64>,
    pub priority: Vec<u64>,
    pub limit: usize,
    pub per_domain: usize,
    pub timeout: Duration,
    pub debug: bool,
    pub json: bool,
}

pub fn run_query(index: &Path, threads: Option<usize>, opts: QueryOptions) -> Result<()> {
    let combined = CombinedIndex::open(index);
    if !combined.is_loaded() {
        warn!("Some index files are missing under {:?}", index);
    }

    let mut exec = ExecutionConfig::default();
    if let Some(threads) = threads {
        exec.evaluation_threads = threads.max(1);
        exec.lookup_threads = threads.div_ceil(2).max(1);
    }
    let searcher = Searcher::new(Arc::new(combined), exec)?.with_ranking(RankingParameters {
        export_debug_data: opts.debug,
        ..Default::default()
    });

    let query = SearchQuery::all_of(opts.terms)
        .with_exclude(opts.exclude)
        .with_priority(opts.priority);
    let limits = QueryLimits {
        result_limit_total: opts.limit,
        result_limit_by_domain: opts.per_domain,
        timeout: opts.timeout,
        ..Default::default()
    };
    let results = searcher.search(&query, &QueryParams::default(), &limits)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for item in &results.items {
        let meta = DocumentMetadata::decode(item.metadata);
        println!(
            "{:>8.4}  domain {:>6}  doc {:>8}  quality {:>2}  year {}  rank {:>3}",
            item.score,
            id::domain_id(item.doc_id),
            id::ordinal(item.doc_id),
            meta.quality,
            meta.year(),
            meta.rank
        );
        if let Some(details) = &item.details {
            println!("          {}", serde_json::to_string(details)?);
        }
    }
    info!(
        "{} results from {} batches in {:?}{}",
        results.items.len(),
        results.batches_evaluated,
        results.elapsed,
        if results.timed_out { " (timed out)" } else { "" }
    );
    Ok(())
}
