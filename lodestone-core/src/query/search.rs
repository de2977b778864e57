//! Search request types: the compiled query with term roles, metadata
//! restrictions and execution limits

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::compiled::CompiledQuery;
use crate::TermId;
use crate::model::{decode_quality, decode_rank, decode_size, decode_year};

/// Terms that should appear at consistent relative positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCoherence {
    /// In phrase order; term `i` is expected at offset `i`
    pub terms: Vec<TermId>,
    /// A document failing a mandatory group is rejected
    pub mandatory: bool,
}

impl SearchCoherence {
    pub fn optional(terms: Vec<TermId>) -> Self {
        Self {
            terms,
            mandatory: false,
        }
    }

    pub fn mandatory(terms: Vec<TermId>) -> Self {
        Self {
            terms,
            mandatory: true,
        }
    }
}

/// A compiled query with its term roles
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Include terms
    pub compiled: CompiledQuery<TermId>,
    /// Documents containing any of these are dropped
    pub exclude: Vec<TermId>,
    /// Terms that raise the score of documents carrying them as signals
    pub priority: Vec<TermId>,
    /// Terms a document must contain, without contributing to the score
    pub advice: Vec<TermId>,
    pub coherences: Vec<SearchCoherence>,
}

impl SearchQuery {
    pub fn new(compiled: CompiledQuery<TermId>) -> Self {
        Self {
            compiled,
            exclude: Vec::new(),
            priority: Vec::new(),
            advice: Vec::new(),
            coherences: Vec::new(),
        }
    }

    /// Documents containing every term
    pub fn all_of(terms: Vec<TermId>) -> Self {
        Self::new(CompiledQuery::all_of(terms))
    }

    pub fn with_exclude(mut self, terms: Vec<TermId>) -> Self {
        self.exclude = terms;
        self
    }

    pub fn with_priority(mut self, terms: Vec<TermId>) -> Self {
        self.priority = terms;
        self
    }

    pub fn with_advice(mut self, terms: Vec<TermId>) -> Self {
        self.advice = terms;
        self
    }

    pub fn with_coherence(mut self, coherence: SearchCoherence) -> Self {
        self.coherences.push(coherence);
        self
    }
}

/// Restriction on a decoded metadata field; bounds are inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Limit {
    #[default]
    None,
    Equals(i32),
    LessThan(i32),
    GreaterThan(i32),
}

impl Limit {
    pub fn test(self, value: i32) -> bool {
        match self {
            Limit::None => true,
            Limit::Equals(v) => value == v,
            Limit::LessThan(v) => value <= v,
            Limit::GreaterThan(v) => value >= v,
        }
    }

    pub fn is_none(self) -> bool {
        self == Limit::None
    }
}

/// Per-query metadata restrictions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub quality: Limit,
    pub year: Limit,
    /// In words
    pub size: Limit,
    pub rank: Limit,
    /// Restrict to these domain ids; empty means any domain
    pub domains: Vec<u32>,
}

impl QueryParams {
    pub fn is_unrestricted(&self) -> bool {
        self.quality.is_none()
            && self.year.is_none()
            && self.size.is_none()
            && self.rank.is_none()
            && self.domains.is_empty()
    }

    /// Whether a document's metadata passes every limit
    pub fn test_metadata(&self, meta: u64) -> bool {
        self.quality.test(decode_quality(meta) as i32)
            && self.year.test(decode_year(meta) as i32)
            && self.size.test(decode_size(meta) as i32)
            && self.rank.test(decode_rank(meta) as i32)
    }
}

/// Result and time bounds of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLimits {
    pub result_limit_total: usize,
    pub result_limit_by_domain: usize,
    /// Capacity of the result heap
    pub fetch_size: usize,
    pub timeout: Duration,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            result_limit_total: 100,
            result_limit_by_domain: 4,
            fetch_size: 1000,
            timeout: Duration::from_millis(250),
        }
    }
}
