//! Searcher - runs ranked queries against a [`CombinedIndex`]

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::combined::CombinedIndex;
use crate::error::Result;
use crate::execution::{BatchEvaluator, CancellationToken, ExecutionConfig, QueryExecutor};
use crate::query::{QueryLimits, QueryParams, SearchQuery};
use crate::ranking::{
    IndexResultRanker, RankingParameters, ResultRankingContext, SearchResultItem,
    select_best_results,
};

/// Ranked results of one search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// Best first, within the total and per-domain limits
    pub items: Vec<SearchResultItem>,
    /// Results gathered before the budget ran out
    pub timed_out: bool,
    pub elapsed: Duration,
    pub batches_evaluated: usize,
}

/// Scores candidate batches against the index
struct IndexEvaluator {
    index: Arc<CombinedIndex>,
    ctx: ResultRankingContext,
}

impl BatchEvaluator for IndexEvaluator {
    fn evaluate(&self, batch: &[u64]) -> Vec<SearchResultItem> {
        IndexResultRanker::new(self.index.forward(), self.index.full(), self.index.prio())
            .rank_batch(&self.ctx, batch)
    }
}

pub struct Searcher {
    index: Arc<CombinedIndex>,
    executor: QueryExecutor,
    ranking: RankingParameters,
}

impl Searcher {
    pub fn new(index: Arc<CombinedIndex>, config: ExecutionConfig) -> Result<Self> {
        Ok(Self {
            index,
            executor: QueryExecutor::new(config)?,
            ranking: RankingParameters::default(),
        })
    }

    pub fn with_ranking(mut self, ranking: RankingParameters) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn index(&self) -> &Arc<CombinedIndex> {
        &self.index
    }

    pub fn search(
        &self,
        query: &SearchQuery,
        params: &QueryParams,
        limits: &QueryLimits,
    ) -> Result<SearchResults> {
        self.search_with_cancel(query, params, limits, &CancellationToken::new())
    }

    /// Run `query` until its cursors are exhausted, `limits.timeout` passes
    /// or `cancel` fires
    pub fn search_with_cancel(
        &self,
        query: &SearchQuery,
        params: &QueryParams,
        limits: &QueryLimits,
        cancel: &CancellationToken,
    ) -> Result<SearchResults> {
        let start = Instant::now();
        let queries = self.index.create_queries(query, params);

        let full = self.index.full();
        let prio = self.index.prio();
        let ctx = ResultRankingContext::new(
            query.clone(),
            self.ranking.clone(),
            self.index.num_docs() as u64,
            |t| full.num_documents(t) as u64,
            |t| prio.num_documents(t) as u64,
        );
        let evaluator = Arc::new(IndexEvaluator {
            index: self.index.clone(),
            ctx,
        });

        let outcome = self.executor.execute(
            queries,
            evaluator,
            limits.fetch_size,
            limits.timeout,
            cancel,
        )?;
        let items = select_best_results(
            outcome.results,
            limits.result_limit_by_domain,
            limits.result_limit_total,
        );
        log::debug!(
            "search: {} results from {} batches in {:?}{}",
            items.len(),
            outcome.batches_evaluated,
            start.elapsed(),
            if outcome.timed_out { " (timed out)" } else { "" }
        );

        Ok(SearchResults {
            items,
            timed_out: outcome.timed_out,
            elapsed: start.elapsed(),
            batches_evaluated: outcome.batches_evaluated,
        })
    }
}
