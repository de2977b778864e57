//! Result valuation and selection

mod bm25;
mod coherence;
mod context;
mod heap;
mod params;
mod service;
mod valuator;

pub use bm25::{AVG_DOC_LENGTH, bm25_idf, bm25_score, bm25_tf};
pub use coherence::{CoherenceOutcome, evaluate_coherences, test_coherence};
pub use context::ResultRankingContext;
pub use heap::{ResultPriorityQueue, SearchResultItem, select_best_results};
pub use params::{Bm25Parameters, RankingParameters, TemporalBias};
pub use service::IndexResultRanker;
pub use valuator::{RankingDetails, ResultValuator, ValuationInput};
