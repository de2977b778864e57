use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{DOC_DATA_FILE, DOC_IDS_FILE, SPANS_FILE, SPANS_SIZE_MASK, encode_spans_ref};
use crate::DocId;
use crate::directories::MmapDirectory;
use crate::error::{Error, Result};
use crate::journal::JournalReader;
use crate::model::{DocumentSpans, DomainRankings, SpanCode, encode_rank, id};
use crate::reverse::FailurePolicy;
use crate::structures::write_longs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForwardIndexStats {
    pub num_docs: usize,
    /// Records whose id appeared more than once; the last one wins
    pub duplicates: usize,
    pub spans_bytes: u64,
    #[serde(default)]
    pub skipped_shards: usize,
}

struct PendingDoc {
    doc_id: DocId,
    metadata: u64,
    features: u32,
    size: u32,
    spans: Vec<(SpanCode, Vec<u32>)>,
}

/// Builds the forward index files from journal shards
pub struct ForwardIndexConverter {
    shards: Vec<PathBuf>,
    output: MmapDirectory,
    rankings: DomainRankings,
    failure_policy: FailurePolicy,
}

impl ForwardIndexConverter {
    pub fn new(shards: Vec<PathBuf>, output_dir: &Path, rankings: DomainRankings) -> Self {
        Self {
            shards,
            output: MmapDirectory::new(output_dir),
            rankings,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn convert(&self) -> Result<ForwardIndexStats> {
        let start = Instant::now();

        // Phase 1: collect document records, skipping term entries entirely
        let mut docs = Vec::new();
        let mut skipped_shards = 0;
        for shard in &self.shards {
            let mark = docs.len();
            if let Err(e) = read_documents(shard, &mut docs) {
                match self.failure_policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::SkipShard => {
                        log::warn!("forward index: skipping {}: {}", shard.display(), e);
                        docs.truncate(mark);
                        skipped_shards += 1;
                    }
                }
            }
        }

        // Phase 2: sort by id; the journal is not ordered. Stable so that a
        // later duplicate stays after the earlier one and wins the dedup.
        docs.par_sort_by_key(|d| d.doc_id);
        let before = docs.len();
        docs.reverse();
        docs.dedup_by_key(|d| d.doc_id);
        docs.reverse();
        let duplicates = before - docs.len();
        if duplicates > 0 {
            log::warn!("forward index: {} duplicate document records dropped", duplicates);
        }

        // Phase 3: write ids, records and spans
        let mut ids_out = self.output.streaming_writer(DOC_IDS_FILE)?;
        let mut data_out = self.output.streaming_writer(DOC_DATA_FILE)?;
        let mut spans_out = self.output.streaming_writer(SPANS_FILE)?;
        let mut workspace = Vec::new();
        let mut span_buf = Vec::new();
        let mut spans_offset = 0u64;

        for doc in &docs {
            span_buf.clear();
            let spans_size = DocumentSpans::write(&mut span_buf, &doc.spans, &mut workspace)? as u64;
            if spans_size > SPANS_SIZE_MASK {
                return Err(Error::InvalidInput(format!(
                    "spans of document {:#x} too large: {} bytes",
                    doc.doc_id, spans_size
                )));
            }
            spans_out.write_all(&span_buf)?;

            let rank = self.rankings.ranking(id::domain_id(doc.doc_id));
            write_longs(&mut ids_out, &[doc.doc_id])?;
            write_longs(
                &mut data_out,
                &[
                    encode_rank(doc.metadata, rank),
                    doc.features as u64 | ((doc.size as u64) << 32),
                    encode_spans_ref(spans_offset, spans_size),
                ],
            )?;
            spans_offset += spans_size;
        }

        ids_out.finish()?;
        data_out.finish()?;
        spans_out.finish()?;

        log::info!(
            "forward index: {} documents written in {:?}",
            docs.len(),
            start.elapsed()
        );

        Ok(ForwardIndexStats {
            num_docs: docs.len(),
            duplicates,
            spans_bytes: spans_offset,
            skipped_shards,
        })
    }
}

fn read_documents(shard: &Path, docs: &mut Vec<PendingDoc>) -> Result<()> {
    let construction_error = |e: std::io::Error| Error::Construction {
        shard: shard.display().to_string(),
        reason: e.to_string(),
    };
    let reader = JournalReader::open(shard)
        .map_err(construction_error)?
        .with_term_filter(|_| false);
    for record in reader {
        let record = record.map_err(construction_error)?;
        docs.push(PendingDoc {
            doc_id: id::remove_rank(record.doc_id),
            metadata: record.metadata,
            features: record.features,
            size: record.size,
            spans: record.spans,
        });
    }
    Ok(())
}
