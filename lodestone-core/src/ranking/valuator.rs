//! Document valuation: metadata factors combined with term scores into one
//! normalized score. Lower scores are better.

use serde::{Deserialize, Serialize};

use super::params::{RankingParameters, TemporalBias};
use crate::model::{
    DocumentFlag, DocumentMetadata, HtmlFeature, MAX_YEAR, MIN_YEAR, SpanIntersections,
};

/// Documents below this many words are only quality-penalized when their
/// quality is poor
const SMALL_DOCUMENT_WORDS: u32 = 400;

/// Per-document inputs of [`ResultValuator::calculate`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValuationInput {
    pub metadata: u64,
    pub features: u32,
    /// Document length in words
    pub length: u32,
    pub bm25_full: f64,
    pub bm25_prio: f64,
    /// Matched optional coherence groups
    pub coherence: f64,
}

/// Each factor of one document's score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingDetails {
    pub quality_penalty: f64,
    pub rank_bonus: f64,
    pub topology_bonus: f64,
    pub document_length_penalty: f64,
    pub sentence_length_penalty: f64,
    pub temporal_bias: f64,
    pub flags_penalty: f64,
    pub overall: f64,
    pub bm25_full: f64,
    pub bm25_prio: f64,
    pub coherence: f64,
    pub score: f64,
    /// Matched term positions falling in each span kind
    #[serde(default)]
    pub span_hits: SpanIntersections,
}

#[derive(Debug, Clone)]
pub struct ResultValuator {
    params: RankingParameters,
}

impl ResultValuator {
    pub fn new(params: RankingParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RankingParameters {
        &self.params
    }

    pub fn calculate_score(&self, input: &ValuationInput) -> f64 {
        self.calculate(input).score
    }

    pub fn calculate(&self, input: &ValuationInput) -> RankingDetails {
        let p = &self.params;
        let meta = DocumentMetadata::decode(input.metadata);
        let size = meta.size();

        let quality_penalty = self.quality_penalty(size, meta.quality);
        let rank_bonus = (255.0 - meta.rank as f64) * p.domain_rank_bonus;
        let topology_bonus = (1.0 + meta.topology as f64).ln();
        let document_length_penalty = if input.length > p.short_doc_threshold {
            0.0
        } else {
            -p.short_doc_penalty
        };
        let sentence_length_penalty = if meta.avg_sentence_length >= p.short_sentence_threshold {
            0.0
        } else {
            -p.short_sentence_penalty
        };
        let temporal_bias = match p.temporal_bias {
            TemporalBias::None => 0.0,
            TemporalBias::Recent => -(meta.year() as f64 - MAX_YEAR as f64).abs() * p.temporal_bias_weight,
            TemporalBias::Old => -(meta.year() as f64 - MIN_YEAR as f64).abs() * p.temporal_bias_weight,
        };
        let flags_penalty = flags_penalty(input.features, &meta, size);

        let overall = quality_penalty
            + rank_bonus
            + topology_bonus
            + document_length_penalty
            + sentence_length_penalty
            + temporal_bias
            - flags_penalty;

        let bm25_full = p.bm25_full_weight * input.bm25_full;
        let bm25_prio = p.bm25_prio_weight * input.bm25_prio;
        let combined =
            p.coherence_weight * input.coherence + bm25_full + bm25_prio + overall.max(0.0);
        let score = self.normalize(combined, (-overall).max(0.0));

        RankingDetails {
            quality_penalty,
            rank_bonus,
            topology_bonus,
            document_length_penalty,
            sentence_length_penalty,
            temporal_bias,
            flags_penalty,
            overall,
            bm25_full,
            bm25_prio,
            coherence: input.coherence,
            score,
            span_hits: SpanIntersections::default(),
        }
    }

    fn quality_penalty(&self, size: u32, quality: u8) -> f64 {
        let q = quality as f64;
        if size < SMALL_DOCUMENT_WORDS {
            if quality < 5 {
                0.0
            } else {
                -q * self.params.quality_penalty
            }
        } else {
            -q * self.params.quality_penalty * 20.0
        }
    }

    /// Map a value (higher is better) and a penalty onto a score where
    /// lower is better
    fn normalize(&self, value: f64, penalty: f64) -> f64 {
        let value = value.max(0.0);
        ((1.0 + self.params.normalization_scale + 10.0 * penalty) / (1.0 + value)).sqrt()
    }
}

/// Penalty (positive is worse) for tracking, ads and similar features.
///
/// Large sites that are not forums, wikis or documentation are penalized
/// harder; forums and wikis have it reduced to at most a small bonus.
fn flags_penalty(features: u32, meta: &DocumentMetadata, size: u32) -> f64 {
    if features == 0 {
        return 0.0;
    }
    let is_forum = meta.has_flag(DocumentFlag::GeneratorForum);
    let is_wiki = meta.has_flag(DocumentFlag::GeneratorWiki);
    let is_docs = meta.has_flag(DocumentFlag::GeneratorDocs);

    let mut penalty = 0.0;
    let mut large_site_factor = 1.0;
    if !is_forum && !is_wiki && !is_docs && size > SMALL_DOCUMENT_WORDS {
        penalty += if HtmlFeature::KebabCaseUrl.is_present(features)
            || HtmlFeature::LongUrl.is_present(features)
        {
            30.0
        } else {
            5.0
        };
        large_site_factor = 2.0;
    }

    if HtmlFeature::TrackingAdtech.is_present(features) {
        penalty += 7.5 * large_site_factor;
    }
    if HtmlFeature::Affiliate.is_present(features) {
        penalty += 5.0 * large_site_factor;
    }
    if HtmlFeature::Cookies.is_present(features) {
        penalty += 2.5 * large_site_factor;
    }
    if HtmlFeature::Tracking.is_present(features) {
        penalty += 2.5 * large_site_factor;
    }

    if is_forum || is_wiki {
        penalty = f64::min(0.0, penalty - 2.0);
    }
    penalty
}
