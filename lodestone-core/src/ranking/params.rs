//! Ranking parameters

use serde::{Deserialize, Serialize};

/// Preference for documents from one end of the publication-year range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalBias {
    #[default]
    None,
    Recent,
    Old,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Parameters {
    pub k: f64,
    pub b: f64,
}

/// Weights and thresholds of the result valuator.
///
/// The defaults are the reference constant set; scores are only comparable
/// between executions using the same parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingParameters {
    /// BM25 over full-text term frequencies
    pub full_params: Bm25Parameters,
    /// BM25 over priority signal counts
    pub prio_params: Bm25Parameters,
    pub bm25_full_weight: f64,
    pub bm25_prio_weight: f64,

    /// Documents shorter than this many words are penalized
    pub short_doc_threshold: u32,
    pub short_doc_penalty: f64,

    pub domain_rank_bonus: f64,
    pub quality_penalty: f64,

    /// Average sentence length bucket below which documents are penalized
    pub short_sentence_threshold: u8,
    pub short_sentence_penalty: f64,

    pub temporal_bias: TemporalBias,
    pub temporal_bias_weight: f64,

    pub coherence_weight: f64,
    /// Scale of the score normalization; lower scores rank higher
    pub normalization_scale: f64,

    /// Attach per-factor details to every result
    pub export_debug_data: bool,
}

impl Default for RankingParameters {
    fn default() -> Self {
        Self {
            full_params: Bm25Parameters { k: 1.2, b: 0.5 },
            prio_params: Bm25Parameters { k: 1.5, b: 0.0 },
            bm25_full_weight: 1.0,
            bm25_prio_weight: 1.0,
            short_doc_threshold: 2000,
            short_doc_penalty: 2.0,
            domain_rank_bonus: 1.0 / 25.0,
            quality_penalty: 1.0 / 15.0,
            short_sentence_threshold: 12,
            short_sentence_penalty: 5.0,
            temporal_bias: TemporalBias::None,
            temporal_bias_weight: 0.2,
            coherence_weight: 1.5,
            normalization_scale: 500.0,
            export_debug_data: false,
        }
    }
}
