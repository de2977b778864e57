//! Term coherence: do a group's terms occur at consecutive positions

use crate::TermId;
use crate::query::SearchCoherence;
use crate::structures::{GammaCodedSequence, intersect_sequences};

/// Whether the sequences, each shifted back by its index in the group,
/// share a position. A missing sequence fails the test.
pub fn test_coherence(positions: &[Option<&GammaCodedSequence>]) -> bool {
    if positions.is_empty() {
        return false;
    }
    let Some(sequences) = positions.iter().copied().collect::<Option<Vec<_>>>() else {
        return false;
    };
    let mut iters: Vec<_> = sequences
        .iter()
        .enumerate()
        .map(|(i, seq)| seq.offset_iter(-(i as i32)))
        .collect();
    intersect_sequences(&mut iters)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoherenceOutcome {
    /// A mandatory group failed
    pub rejected: bool,
    /// Optional groups that matched
    pub matched: usize,
}

/// Test every group against one document's term positions
pub fn evaluate_coherences<'a>(
    groups: &[SearchCoherence],
    lookup: impl Fn(TermId) -> Option<&'a GammaCodedSequence>,
) -> CoherenceOutcome {
    let mut outcome = CoherenceOutcome::default();
    for group in groups {
        let positions: Vec<_> = group.terms.iter().map(|&t| lookup(t)).collect();
        let coherent = test_coherence(&positions);
        if group.mandatory {
            if !coherent {
                outcome.rejected = true;
                return outcome;
            }
        } else if coherent {
            outcome.matched += 1;
        }
    }
    outcome
}
