//! Operations over several ascending position sequences

/// True iff advancing all iterators in lock-step finds a value common to
/// every sequence.
///
/// Each iterator must be ascending. Returns false as soon as any sequence is
/// exhausted, and false when no sequences are given.
pub fn intersect_sequences<I>(sequences: &mut [I]) -> bool
where
    I: Iterator<Item = i32>,
{
    if sequences.is_empty() {
        return false;
    }

    let mut values = Vec::with_capacity(sequences.len());
    for seq in sequences.iter_mut() {
        match seq.next() {
            Some(v) => values.push(v),
            None => return false,
        }
    }
    if sequences.len() == 1 {
        return true;
    }

    // Round-robin: pull every sequence up to the largest value seen; once
    // `n` consecutive sequences agree on it, it is common to all of them.
    let n = sequences.len();
    let mut max = i32::MIN;
    let mut successes = 0;
    let mut i = 0;
    while successes < n {
        if values[i] == max {
            successes += 1;
        } else {
            successes = 1;
            while values[i] < max {
                match sequences[i].next() {
                    Some(v) => values[i] = v,
                    None => return false,
                }
            }
            max = max.max(values[i]);
        }
        i = (i + 1) % n;
    }
    true
}

/// Smallest absolute distance between any value of `a` and any value of `b`
pub fn min_distance<A, B>(mut a: A, mut b: B) -> Option<u32>
where
    A: Iterator<Item = i32>,
    B: Iterator<Item = i32>,
{
    let (mut x, mut y) = (a.next()?, b.next()?);
    let mut best = x.abs_diff(y);
    loop {
        if best == 0 {
            return Some(0);
        }
        let next = if x < y {
            a.next().map(|v| x = v)
        } else {
            b.next().map(|v| y = v)
        };
        if next.is_none() {
            return Some(best);
        }
        best = best.min(x.abs_diff(y));
    }
}
