//! Compiled boolean term expressions and aggregation over them
//!
//! A [`CompiledQuery`] separates the expression shape (`CqExpression`, whose
//! leaves are indices) from the per-leaf data, so the same shape can carry
//! term ids, term scores or position sequences via [`CompiledQuery::map`].

/// Expression tree over leaf indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CqExpression {
    Word(usize),
    And(Vec<CqExpression>),
    Or(Vec<CqExpression>),
}

/// Expansion of the expression into disjunctive normal form is capped at
/// this many conjuncts.
pub const MAX_PATHS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery<T> {
    root: CqExpression,
    data: Vec<T>,
}

impl<T> CompiledQuery<T> {
    /// `root` must only reference indices below `data.len()`
    pub fn new(root: CqExpression, data: Vec<T>) -> Self {
        debug_assert!(max_index(&root).is_none_or(|m| m < data.len()));
        Self { root, data }
    }

    /// Conjunction of all values
    pub fn all_of(data: Vec<T>) -> Self {
        let root = CqExpression::And((0..data.len()).map(CqExpression::Word).collect());
        Self { root, data }
    }

    /// Disjunction of all values
    pub fn any_of(data: Vec<T>) -> Self {
        let root = CqExpression::Or((0..data.len()).map(CqExpression::Word).collect());
        Self { root, data }
    }

    pub fn root(&self) -> &CqExpression {
        &self.root
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.data.get(idx)
    }

    /// Same shape, new leaf data
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> CompiledQuery<U> {
        CompiledQuery {
            root: self.root.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn map_indexed<U>(&self, mut f: impl FnMut(usize, &T) -> U) -> CompiledQuery<U> {
        CompiledQuery {
            root: self.root.clone(),
            data: self.data.iter().enumerate().map(|(i, v)| f(i, v)).collect(),
        }
    }

    /// Every conjunct of the disjunctive normal form, as sorted leaf indices
    pub fn paths(&self) -> Vec<Vec<usize>> {
        let mut paths = expand(&self.root);
        for path in &mut paths {
            path.sort_unstable();
            path.dedup();
        }
        paths.dedup();
        paths
    }

    /// Fold the tree bottom-up
    pub fn aggregate<A>(
        &self,
        leaf: &impl Fn(&T) -> A,
        and: &impl Fn(Vec<A>) -> A,
        or: &impl Fn(Vec<A>) -> A,
    ) -> A {
        fold(&self.root, &self.data, leaf, and, or)
    }

    /// Whether some path satisfies `pred` for all of its leaves
    pub fn test(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.aggregate(
            &pred,
            &|v: Vec<bool>| v.into_iter().all(|b| b),
            &|v: Vec<bool>| v.into_iter().any(|b| b),
        )
    }

    /// Best achievable sum along any path
    pub fn best_sum(&self, value: impl Fn(&T) -> f64) -> f64 {
        self.aggregate(
            &value,
            &|v: Vec<f64>| v.into_iter().sum(),
            &|v: Vec<f64>| v.into_iter().reduce(f64::max).unwrap_or(0.0),
        )
    }

    /// Best path's weakest leaf
    pub fn max_min(&self, value: impl Fn(&T) -> i64) -> i64 {
        self.aggregate(
            &value,
            &|v: Vec<i64>| v.into_iter().min().unwrap_or(0),
            &|v: Vec<i64>| v.into_iter().max().unwrap_or(0),
        )
    }
}

fn fold<T, A>(
    expr: &CqExpression,
    data: &[T],
    leaf: &impl Fn(&T) -> A,
    and: &impl Fn(Vec<A>) -> A,
    or: &impl Fn(Vec<A>) -> A,
) -> A {
    match expr {
        CqExpression::Word(i) => leaf(&data[*i]),
        CqExpression::And(children) => and(
            children
                .iter()
                .map(|c| fold(c, data, leaf, and, or))
                .collect(),
        ),
        CqExpression::Or(children) => or(
            children
                .iter()
                .map(|c| fold(c, data, leaf, and, or))
                .collect(),
        ),
    }
}

fn expand(expr: &CqExpression) -> Vec<Vec<usize>> {
    match expr {
        CqExpression::Word(i) => vec![vec![*i]],
        CqExpression::Or(children) => {
            let mut out: Vec<Vec<usize>> = children.iter().flat_map(expand).collect();
            if out.len() > MAX_PATHS {
                log::debug!("query expands to {} paths, keeping {}", out.len(), MAX_PATHS);
                out.truncate(MAX_PATHS);
            }
            out
        }
        CqExpression::And(children) => {
            let mut out: Vec<Vec<usize>> = vec![Vec::new()];
            for child in children {
                let alternatives = expand(child);
                let mut next = Vec::with_capacity(out.len() * alternatives.len());
                for prefix in &out {
                    for alt in &alternatives {
                        if next.len() == MAX_PATHS {
                            break;
                        }
                        let mut path = prefix.clone();
                        path.extend_from_slice(alt);
                        next.push(path);
                    }
                }
                out = next;
            }
            out
        }
    }
}

fn max_index(expr: &CqExpression) -> Option<usize> {
    match expr {
        CqExpression::Word(i) => Some(*i),
        CqExpression::And(c) | CqExpression::Or(c) => c.iter().filter_map(max_index).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CqExpression::{And, Or, Word};

    /// a AND (b OR c)
    fn sample() -> CompiledQuery<u64> {
        CompiledQuery::new(And(vec![Word(0), Or(vec![Word(1), Word(2)])]), vec![10, 20, 30])
    }

    #[test]
    fn test_paths() {
        assert_eq!(sample().paths(), vec![vec![0, 1], vec![0, 2]]);
        assert_eq!(CompiledQuery::all_of(vec![1, 2, 3]).paths(), vec![vec![0, 1, 2]]);
        assert_eq!(CompiledQuery::any_of(vec![1, 2]).paths(), vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_aggregates() {
        let q = sample();
        assert!(q.test(|&v| v != 20));
        assert!(!q.test(|&v| v != 10));
        assert_eq!(q.best_sum(|&v| v as f64), 40.0);
        // Negative branches are compared as they are, not against zero
        assert_eq!(q.best_sum(|&v| -(v as f64)), -30.0);
        assert_eq!(CompiledQuery::any_of(vec![4u64, 2]).best_sum(|&v| -(v as f64)), -2.0);
        assert_eq!(q.max_min(|&v| v as i64), 10);

        let scored = q.map(|&v| if v == 30 { -1i64 } else { v as i64 });
        assert_eq!(scored.max_min(|&v| v), 10);
        assert_eq!(scored.max_min(|&v| -v), -10);
    }

    #[test]
    fn test_path_cap() {
        let wide = And((0..8).map(|i| Or(vec![Word(2 * i), Word(2 * i + 1)])).collect());
        let q = CompiledQuery::new(wide, (0..16u64).collect());
        assert_eq!(q.paths().len(), MAX_PATHS);
    }
}
