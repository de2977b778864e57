//! Bounded result heap and final result selection

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::valuator::RankingDetails;
use crate::model::id;
use crate::{DocId, TermId};

/// A scored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Document id without rank bits
    pub doc_id: DocId,
    /// Lower is better
    pub score: f64,
    pub metadata: u64,
    pub features: u32,
    /// Query terms present in the document, with their word flags
    pub matched_terms: Vec<(TermId, u8)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<RankingDetails>,
}

impl SearchResultItem {
    pub fn domain_id(&self) -> u32 {
        id::domain_id(self.doc_id)
    }

    /// Ascending score, then ascending document id
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.doc_id.cmp(&other.doc_id))
    }
}

/// Heap entry; the worst item is the greatest
struct Ranked(SearchResultItem);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_rank(&other.0)
    }
}

/// Keeps the `limit` best items seen, at most one per document.
///
/// A document offered twice keeps its first item; every cursor scores a
/// document against the whole query, so repeated offers carry the same
/// score.
pub struct ResultPriorityQueue {
    limit: usize,
    heap: BinaryHeap<Ranked>,
    present: FxHashSet<DocId>,
}

impl ResultPriorityQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            heap: BinaryHeap::with_capacity(limit.min(1 << 16) + 1),
            present: FxHashSet::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Offer an item; returns whether it was kept
    pub fn add(&mut self, item: SearchResultItem) -> bool {
        if self.limit == 0 || self.present.contains(&item.doc_id) {
            return false;
        }
        if self.heap.len() >= self.limit
            && let Some(worst) = self.heap.peek()
            && item.cmp_rank(&worst.0) != Ordering::Less
        {
            return false;
        }

        self.present.insert(item.doc_id);
        self.heap.push(Ranked(item));
        if self.heap.len() > self.limit
            && let Some(evicted) = self.heap.pop()
        {
            self.present.remove(&evicted.0.doc_id);
        }
        true
    }

    pub fn add_all(&mut self, items: impl IntoIterator<Item = SearchResultItem>) {
        for item in items {
            self.add(item);
        }
    }

    /// Items best first
    pub fn into_sorted_vec(self) -> Vec<SearchResultItem> {
        self.heap.into_sorted_vec().into_iter().map(|r| r.0).collect()
    }
}

/// Best-first selection honouring a per-domain cap and a total cap
pub fn select_best_results(
    mut items: Vec<SearchResultItem>,
    limit_by_domain: usize,
    limit_total: usize,
) -> Vec<SearchResultItem> {
    items.sort_by(SearchResultItem::cmp_rank);

    let mut per_domain: FxHashMap<u32, usize> = FxHashMap::default();
    let mut selected = Vec::with_capacity(limit_total.min(items.len()));
    for item in items {
        if selected.len() >= limit_total {
            break;
        }
        let count = per_domain.entry(item.domain_id()).or_default();
        if *count >= limit_by_domain {
            continue;
        }
        *count += 1;
        selected.push(item);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(domain: u32, ordinal: u32, score: f64) -> SearchResultItem {
        SearchResultItem {
            doc_id: id::encode_id(0, domain, ordinal),
            score,
            metadata: 0,
            features: 0,
            matched_terms: Vec::new(),
            details: None,
        }
    }

    #[test]
    fn test_bounded_best() {
        let mut queue = ResultPriorityQueue::new(3);
        for (i, score) in [5.0, 1.0, 4.0, 2.0, 9.0, 3.0].into_iter().enumerate() {
            queue.add(item(1, i as u32, score));
        }
        let scores: Vec<f64> = queue.into_sorted_vec().iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_dedup_and_tie_break() {
        let mut queue = ResultPriorityQueue::new(10);
        assert!(queue.add(item(1, 7, 2.0)));
        assert!(!queue.add(item(1, 7, 1.0)));
        assert!(queue.add(item(1, 3, 2.0)));
        let out = queue.into_sorted_vec();
        assert_eq!(out.len(), 2);
        assert_eq!(id::ordinal(out[0].doc_id), 3);
    }

    #[test]
    fn test_evicted_document_can_return() {
        let mut queue = ResultPriorityQueue::new(1);
        assert!(queue.add(item(1, 1, 5.0)));
        assert!(queue.add(item(1, 2, 1.0)));
        assert!(queue.add(item(1, 1, 0.5)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_select_caps() {
        let items = vec![
            item(1, 1, 1.0),
            item(1, 2, 2.0),
            item(1, 3, 3.0),
            item(2, 1, 4.0),
            item(3, 1, 5.0),
            item(2, 2, 0.5),
        ];
        let out = select_best_results(items.clone(), 2, 10);
        let keys: Vec<(u32, u32)> = out
            .iter()
            .map(|r| (r.domain_id(), id::ordinal(r.doc_id)))
            .collect();
        assert_eq!(keys, vec![(2, 2), (1, 1), (1, 2), (2, 1), (3, 1)]);

        assert_eq!(select_best_results(items, 2, 3).len(), 3);
    }
}
