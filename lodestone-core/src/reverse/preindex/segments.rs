//! Per-term posting counts of a preindex

use rustc_hash::FxHashMap;

use crate::TermId;

/// Sorted term ids with the number of records each owns.
///
/// Segment `i` occupies records `offsets[i] .. offsets[i] + counts[i]` of the
/// documents file, in term order.
#[derive(Debug, Clone, Default)]
pub struct PreindexSegments {
    word_ids: Vec<TermId>,
    counts: Vec<u64>,
}

impl PreindexSegments {
    pub fn from_counts(counts: FxHashMap<TermId, u64>) -> Self {
        let mut pairs: Vec<(TermId, u64)> = counts.into_iter().filter(|&(_, c)| c > 0).collect();
        pairs.sort_unstable_by_key(|&(w, _)| w);
        let (word_ids, counts) = pairs.into_iter().unzip();
        Self { word_ids, counts }
    }

    pub(super) fn from_parts(word_ids: Vec<TermId>, counts: Vec<u64>) -> Self {
        debug_assert_eq!(word_ids.len(), counts.len());
        debug_assert!(word_ids.windows(2).all(|w| w[0] < w[1]));
        Self { word_ids, counts }
    }

    pub fn num_words(&self) -> usize {
        self.word_ids.len()
    }

    pub fn total_records(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn word_ids(&self) -> &[TermId] {
        &self.word_ids
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// `(term id, first record, record count)` in term order
    pub fn iter(&self) -> impl Iterator<Item = (TermId, u64, u64)> + '_ {
        let mut offset = 0;
        self.word_ids
            .iter()
            .zip(&self.counts)
            .map(move |(&word, &count)| {
                let start = offset;
                offset += count;
                (word, start, count)
            })
    }

    /// Write cursor per term, initialised to the segment start
    pub fn offset_map(&self) -> FxHashMap<TermId, u64> {
        let mut map = FxHashMap::with_capacity_and_hasher(self.word_ids.len(), Default::default());
        for (word, start, _) in self.iter() {
            map.insert(word, start);
        }
        map
    }

    pub fn find(&self, word: TermId) -> Option<(u64, u64)> {
        let idx = self.word_ids.binary_search(&word).ok()?;
        let start: u64 = self.counts[..idx].iter().sum();
        Some((start, self.counts[idx]))
    }
}
