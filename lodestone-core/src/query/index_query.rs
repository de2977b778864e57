//! Cursor over one conjunct of a query: entry sources plus a filter chain

use std::fmt;

use super::filter::QueryFilter;
use super::source::EntrySource;
use crate::structures::LongQueryBuffer;

/// Pulls batches of candidate ids from its sources, in order, and narrows
/// each batch through the filter chain.
pub struct IndexQuery {
    sources: Vec<Box<dyn EntrySource>>,
    filters: Vec<QueryFilter>,
    current: usize,
}

impl IndexQuery {
    pub fn new(sources: Vec<Box<dyn EntrySource>>, filters: Vec<QueryFilter>) -> Self {
        Self {
            sources,
            filters,
            current: 0,
        }
    }

    /// A query that yields nothing
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn has_more(&self) -> bool {
        self.current < self.sources.len()
    }

    pub fn num_filters(&self) -> usize {
        self.filters.len()
    }

    /// Refill `buffer` with the next batch of matching ids.
    ///
    /// The batch may be empty while [`IndexQuery::has_more`] is still true,
    /// when every id of the batch was filtered out.
    pub fn get_more_results(&mut self, buffer: &mut LongQueryBuffer) {
        buffer.reset();
        let mut sources_read = 0;
        while let Some(source) = self.sources.get_mut(self.current) {
            source.read(buffer);
            sources_read += 1;
            if !source.has_more() {
                self.current += 1;
            }
            if buffer.is_full() {
                break;
            }
        }

        // Ids of consecutive sources interleave
        if sources_read > 1 {
            buffer.sort_unique();
        }

        for filter in &self.filters {
            if buffer.is_empty() {
                break;
            }
            filter.apply(buffer);
        }
    }
}

impl fmt::Debug for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.index_name()).collect();
        f.debug_struct("IndexQuery")
            .field("sources", &names)
            .field("filters", &self.filters)
            .field("current", &self.current)
            .finish()
    }
}

#[derive(Default)]
pub struct IndexQueryBuilder {
    sources: Vec<Box<dyn EntrySource>>,
    filters: Vec<QueryFilter>,
}

impl IndexQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: impl EntrySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn boxed_source(mut self, source: Box<dyn EntrySource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Append a filter step. `LetThrough` steps are dropped.
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        if !matches!(filter, QueryFilter::LetThrough) {
            self.filters.push(filter);
        }
        self
    }

    pub fn filters(self, filters: impl IntoIterator<Item = QueryFilter>) -> Self {
        filters.into_iter().fold(self, |b, f| b.filter(f))
    }

    /// A chain containing a no-pass step can never yield; its sources are
    /// dropped so the query is exhausted from the start.
    pub fn build(self) -> IndexQuery {
        if self.filters.iter().any(QueryFilter::is_no_pass) {
            return IndexQuery::empty();
        }
        IndexQuery::new(self.sources, self.filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::VecEntrySource;

    fn drain(mut query: IndexQuery, batch: usize) -> Vec<u64> {
        let mut buffer = LongQueryBuffer::new(batch);
        let mut out = Vec::new();
        while query.has_more() {
            query.get_more_results(&mut buffer);
            out.extend_from_slice(buffer.as_slice());
        }
        out
    }

    #[test]
    fn test_sources_in_order_with_filter() {
        let query = IndexQueryBuilder::new()
            .source(VecEntrySource::new((1..=10).collect()))
            .source(VecEntrySource::new(vec![20, 21]))
            .filter(QueryFilter::predicate(|v| v % 2 == 1))
            .filter(QueryFilter::LetThrough)
            .build();
        assert_eq!(query.num_filters(), 1);
        assert_eq!(drain(query, 4), vec![1, 3, 5, 7, 9, 21]);
    }

    #[test]
    fn test_no_pass_empties_query() {
        let query = IndexQueryBuilder::new()
            .source(VecEntrySource::new(vec![1, 2, 3]))
            .filter(QueryFilter::NoPass)
            .build();
        assert!(!query.has_more());
    }

    #[test]
    fn test_overlapping_sources_deduped_per_batch() {
        let query = IndexQueryBuilder::new()
            .source(VecEntrySource::new(vec![3, 5]))
            .source(VecEntrySource::new(vec![1, 5]))
            .build();
        assert_eq!(drain(query, 16), vec![1, 3, 5]);
    }
}
