//! Batch ranking of candidate documents against the index

use rustc_hash::FxHashMap;

use super::bm25::bm25_score;
use super::coherence::evaluate_coherences;
use super::context::ResultRankingContext;
use super::heap::SearchResultItem;
use super::valuator::ValuationInput;
use crate::TermId;
use crate::forward::ForwardIndexReader;
use crate::model::{SpanIntersections, id, signal_count};
use crate::reverse::{ReverseIndexReader, TermData};

/// Scores batches of candidates using the forward index for metadata and
/// the reverse indexes for term data
pub struct IndexResultRanker<'a> {
    forward: &'a ForwardIndexReader,
    full: &'a ReverseIndexReader,
    prio: &'a ReverseIndexReader,
}

impl<'a> IndexResultRanker<'a> {
    pub fn new(
        forward: &'a ForwardIndexReader,
        full: &'a ReverseIndexReader,
        prio: &'a ReverseIndexReader,
    ) -> Self {
        Self {
            forward,
            full,
            prio,
        }
    }

    /// Score rank-encoded candidate ids.
    ///
    /// Candidates that satisfy no path of the query, fail a mandatory
    /// coherence group or are unknown to the forward index are dropped.
    pub fn rank_batch(&self, ctx: &ResultRankingContext, candidates: &[u64]) -> Vec<SearchResultItem> {
        let mut ids = candidates.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let term_data: FxHashMap<TermId, Vec<Option<TermData>>> = ctx
            .positional_terms()
            .iter()
            .map(|&t| (t, self.full.get_term_data(t, &ids)))
            .collect();
        let priority_meta: Vec<(TermId, Vec<u64>)> = ctx
            .priority_terms()
            .iter()
            .map(|&t| (t, self.prio.get_term_meta(t, &ids)))
            .collect();

        let params = ctx.params();
        let total_docs = ctx.total_docs() as f64;
        let mut results = Vec::with_capacity(ids.len());

        for (i, &ranked_id) in ids.iter().enumerate() {
            let doc_id = id::remove_rank(ranked_id);
            if !self.forward.has_document(doc_id) {
                log::debug!("candidate {:#x} missing from forward index", doc_id);
                continue;
            }
            let data_of = |t: TermId| term_data.get(&t).and_then(|v| v[i].as_ref());

            let leaves = ctx.query().compiled.map(|&t| (t, data_of(t)));
            if !leaves.test(|(_, d)| d.is_some()) {
                continue;
            }

            let coherence = evaluate_coherences(&ctx.query().coherences, |t| {
                data_of(t).map(|d| &d.positions)
            });
            if coherence.rejected {
                continue;
            }

            let length = self.forward.document_size(doc_id);
            let bm25_full = leaves.best_sum(|&(t, d)| {
                d.map_or(0.0, |d| {
                    bm25_score(
                        d.positions.value_count() as f64,
                        length as f64,
                        ctx.full_count(t) as f64,
                        total_docs,
                        params.full_params,
                    )
                })
            });
            let prio_score = |t: TermId, flags: u8| {
                bm25_score(
                    signal_count(flags) as f64,
                    length as f64,
                    ctx.prio_count(t) as f64,
                    total_docs,
                    params.prio_params,
                )
            };
            let bm25_prio = leaves.best_sum(|&(t, d)| d.map_or(0.0, |d| prio_score(t, d.flags)))
                + priority_meta
                    .iter()
                    .map(|(t, metas)| prio_score(*t, metas[i] as u8))
                    .sum::<f64>();

            let input = ValuationInput {
                metadata: self.forward.doc_meta(doc_id),
                features: self.forward.html_features(doc_id),
                length,
                bm25_full,
                bm25_prio,
                coherence: coherence.matched as f64,
            };

            let mut matched_terms: Vec<(TermId, u8)> = leaves
                .data()
                .iter()
                .filter_map(|&(t, d)| d.map(|d| (t, d.flags)))
                .collect();
            matched_terms.sort_unstable();
            matched_terms.dedup();

            let (score, details) = if params.export_debug_data {
                let mut details = ctx.valuator().calculate(&input);
                details.span_hits = self.span_hits(doc_id, &matched_terms, &data_of);
                (details.score, Some(details))
            } else {
                (ctx.valuator().calculate_score(&input), None)
            };

            results.push(SearchResultItem {
                doc_id,
                score,
                metadata: input.metadata,
                features: input.features,
                matched_terms,
                details,
            });
        }
        results
    }

    fn span_hits<'d>(
        &self,
        doc_id: u64,
        matched: &[(TermId, u8)],
        data_of: &impl Fn(TermId) -> Option<&'d TermData>,
    ) -> SpanIntersections {
        let spans = self.forward.document_spans(doc_id);
        let mut total = SpanIntersections::default();
        for &(t, _) in matched {
            let Some(data) = data_of(t) else { continue };
            let hits = spans.count_intersections(&data.positions.values());
            total.title += hits.title;
            total.heading += hits.heading;
            total.anchor += hits.anchor;
            total.nav += hits.nav;
            total.code += hits.code;
            total.body += hits.body;
        }
        total
    }
}
