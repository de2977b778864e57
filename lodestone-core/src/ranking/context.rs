//! Per-execution ranking state shared by every evaluation task

use rustc_hash::FxHashMap;

use super::params::RankingParameters;
use super::valuator::ResultValuator;
use crate::TermId;
use crate::query::SearchQuery;

/// Query, parameters and corpus statistics, computed once per execution
#[derive(Debug, Clone)]
pub struct ResultRankingContext {
    query: SearchQuery,
    valuator: ResultValuator,
    total_docs: u64,
    full_counts: FxHashMap<TermId, u64>,
    prio_counts: FxHashMap<TermId, u64>,
    /// Distinct terms whose positions are needed
    positional_terms: Vec<TermId>,
    /// Distinct priority terms not already scored as include terms
    priority_terms: Vec<TermId>,
}

impl ResultRankingContext {
    /// `full_count` and `prio_count` give the number of documents holding a
    /// term in the full and priority index.
    pub fn new(
        query: SearchQuery,
        params: RankingParameters,
        total_docs: u64,
        full_count: impl Fn(TermId) -> u64,
        prio_count: impl Fn(TermId) -> u64,
    ) -> Self {
        let mut positional_terms: Vec<TermId> = query
            .compiled
            .data()
            .iter()
            .chain(query.coherences.iter().flat_map(|c| c.terms.iter()))
            .copied()
            .collect();
        positional_terms.sort_unstable();
        positional_terms.dedup();

        let mut priority_terms: Vec<TermId> = query
            .priority
            .iter()
            .copied()
            .filter(|t| !query.compiled.data().contains(t))
            .collect();
        priority_terms.sort_unstable();
        priority_terms.dedup();

        let full_counts = positional_terms
            .iter()
            .map(|&t| (t, full_count(t)))
            .collect();
        let prio_counts = positional_terms
            .iter()
            .chain(&query.priority)
            .map(|&t| (t, prio_count(t)))
            .collect();

        Self {
            query,
            valuator: ResultValuator::new(params),
            total_docs,
            full_counts,
            prio_counts,
            positional_terms,
            priority_terms,
        }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn params(&self) -> &RankingParameters {
        self.valuator.params()
    }

    pub fn valuator(&self) -> &ResultValuator {
        &self.valuator
    }

    pub fn total_docs(&self) -> u64 {
        self.total_docs
    }

    pub fn positional_terms(&self) -> &[TermId] {
        &self.positional_terms
    }

    pub fn priority_terms(&self) -> &[TermId] {
        &self.priority_terms
    }

    pub fn full_count(&self, term: TermId) -> u64 {
        self.full_counts.get(&term).copied().unwrap_or(0)
    }

    pub fn prio_count(&self, term: TermId) -> u64 {
        self.prio_counts.get(&term).copied().unwrap_or(0)
    }
}
