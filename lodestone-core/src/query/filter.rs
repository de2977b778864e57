//! Filter steps applied to each batch an entry source produces

use std::fmt;
use std::sync::Arc;

use crate::structures::{BTreeReader, LongQueryBuffer};

pub type FilterPredicate = Arc<dyn Fn(u64) -> bool + Send + Sync>;

/// One step of an [`IndexQuery`](super::IndexQuery)'s filter chain
#[derive(Clone)]
pub enum QueryFilter {
    /// Keep ids present in the term's docs tree
    Retain(BTreeReader),
    /// Drop ids present in the term's docs tree
    Reject(BTreeReader),
    /// Keep ids accepted by at least one of the filters
    AnyOf(Vec<QueryFilter>),
    /// Keep ids the predicate accepts
    Predicate(FilterPredicate),
    LetThrough,
    NoPass,
}

impl QueryFilter {
    pub fn predicate(f: impl Fn(u64) -> bool + Send + Sync + 'static) -> Self {
        QueryFilter::Predicate(Arc::new(f))
    }

    /// Test a single id
    pub fn test(&self, id: u64) -> bool {
        match self {
            QueryFilter::Retain(tree) => tree.find_entry(id).is_some(),
            QueryFilter::Reject(tree) => tree.find_entry(id).is_none(),
            QueryFilter::AnyOf(filters) => filters.iter().any(|f| f.test(id)),
            QueryFilter::Predicate(p) => p(id),
            QueryFilter::LetThrough => true,
            QueryFilter::NoPass => false,
        }
    }

    /// Apply the filter to every id in the buffer as one filtering pass
    pub fn apply(&self, buffer: &mut LongQueryBuffer) {
        match self {
            QueryFilter::Retain(tree) => tree.retain_entries(buffer),
            QueryFilter::Reject(tree) => tree.reject_entries(buffer),
            QueryFilter::LetThrough => {}
            QueryFilter::NoPass => {
                buffer.reject_all();
                buffer.finalize_filtering();
            }
            QueryFilter::AnyOf(_) | QueryFilter::Predicate(_) => {
                buffer.retain_where(|id| self.test(id))
            }
        }
    }

    /// Whether the filter can never accept anything
    pub fn is_no_pass(&self) -> bool {
        match self {
            QueryFilter::NoPass => true,
            QueryFilter::AnyOf(filters) => filters.iter().all(QueryFilter::is_no_pass),
            _ => false,
        }
    }
}

impl fmt::Debug for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFilter::Retain(tree) => write!(f, "Retain({})", tree.num_entries()),
            QueryFilter::Reject(tree) => write!(f, "Reject({})", tree.num_entries()),
            QueryFilter::AnyOf(filters) => f.debug_tuple("AnyOf").field(filters).finish(),
            QueryFilter::Predicate(_) => write!(f, "Predicate"),
            QueryFilter::LetThrough => write!(f, "LetThrough"),
            QueryFilter::NoPass => write!(f, "NoPass"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::{BTreeBlockSize, BTreeContext, BTreeWriter, LongArray};

    fn tree(keys: &[u64]) -> BTreeReader {
        let ctx = BTreeContext::new(3, 2, BTreeBlockSize::Bs64);
        let entries: Vec<u64> = keys.iter().flat_map(|&k| [k, 0]).collect();
        let words = BTreeWriter::new(ctx).build_words(0, &entries).unwrap().to_vec();
        BTreeReader::new(LongArray::from_vec(&words), ctx, 0).unwrap()
    }

    fn run(filter: &QueryFilter, ids: &[u64]) -> Vec<u64> {
        let mut buffer = LongQueryBuffer::new(ids.len().max(1));
        for &id in ids {
            buffer.push(id);
        }
        filter.apply(&mut buffer);
        buffer.copy_data()
    }

    #[test]
    fn test_filters() {
        let ids = [1, 2, 3, 4, 5, 6];
        let evens = tree(&[2, 4, 6, 8]);
        assert_eq!(run(&QueryFilter::Retain(evens.clone()), &ids), vec![2, 4, 6]);
        assert_eq!(run(&QueryFilter::Reject(evens.clone()), &ids), vec![1, 3, 5]);
        assert_eq!(
            run(
                &QueryFilter::AnyOf(vec![
                    QueryFilter::Retain(evens),
                    QueryFilter::predicate(|v| v == 5),
                ]),
                &ids
            ),
            vec![2, 4, 5, 6]
        );
        assert_eq!(run(&QueryFilter::LetThrough, &ids), ids.to_vec());
        assert!(run(&QueryFilter::NoPass, &ids).is_empty());
    }

    #[test]
    fn test_no_pass_detection() {
        assert!(QueryFilter::AnyOf(vec![QueryFilter::NoPass]).is_no_pass());
        assert!(!QueryFilter::AnyOf(vec![QueryFilter::NoPass, QueryFilter::LetThrough]).is_no_pass());
    }
}
