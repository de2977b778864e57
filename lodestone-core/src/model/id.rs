//! Document identifier packing
//!
//! ```text
//!  63  62      57 56                       26 25                    0
//! [ 0 ][ rank:6   ][ domain id:31          ][ ordinal:26           ]
//! ```
//! The rank bits make a reverse-index partition sorted by id also sorted by
//! domain quality. The forward index always works on rank-stripped ids.

use crate::DocId;

const ORDINAL_BITS: u32 = 26;
const DOMAIN_BITS: u32 = 31;
const RANK_BITS: u32 = 6;

const DOMAIN_SHIFT: u32 = ORDINAL_BITS;
const RANK_SHIFT: u32 = ORDINAL_BITS + DOMAIN_BITS;

pub const ORDINAL_MASK: u64 = (1 << ORDINAL_BITS) - 1;
pub const DOMAIN_MASK: u64 = (1 << DOMAIN_BITS) - 1;
/// Covers bit 63 as well, so a stripped id is never negative as `i64`
pub const RANK_MASK: u64 = 0xFE00_0000_0000_0000;

/// Largest encodable rank tier
pub const MAX_RANK: u64 = (1 << RANK_BITS) - 1;

/// Pack a document id; out-of-range fields are masked to their width
#[inline]
pub const fn encode_id(rank: u64, domain_id: u32, ordinal: u32) -> DocId {
    ((rank & MAX_RANK) << RANK_SHIFT)
        | ((domain_id as u64 & DOMAIN_MASK) << DOMAIN_SHIFT)
        | (ordinal as u64 & ORDINAL_MASK)
}

#[inline]
pub const fn domain_id(id: DocId) -> u32 {
    ((id >> DOMAIN_SHIFT) & DOMAIN_MASK) as u32
}

#[inline]
pub const fn ordinal(id: DocId) -> u32 {
    (id & ORDINAL_MASK) as u32
}

#[inline]
pub const fn rank(id: DocId) -> u64 {
    (id & RANK_MASK) >> RANK_SHIFT
}

#[inline]
pub const fn remove_rank(id: DocId) -> DocId {
    id & !RANK_MASK
}

#[inline]
pub const fn has_rank(id: DocId) -> bool {
    id & RANK_MASK != 0
}

/// Stamp a sort rank in `[0, 1]` into the high bits, replacing any existing rank.
/// Lower values sort earlier.
#[inline]
pub fn add_rank(sort_rank: f32, id: DocId) -> DocId {
    let tier = (sort_rank * (MAX_RANK + 1) as f32).floor().clamp(0.0, MAX_RANK as f32) as u64;
    remove_rank(id) | (tier << RANK_SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_independent() {
        let id = encode_id(5, 12345, 678);
        assert_eq!(rank(id), 5);
        assert_eq!(domain_id(id), 12345);
        assert_eq!(ordinal(id), 678);

        let stripped = remove_rank(id);
        assert_eq!(rank(stripped), 0);
        assert_eq!(domain_id(stripped), 12345);
        assert_eq!(ordinal(stripped), 678);
    }

    #[test]
    fn test_extreme_values() {
        let id = encode_id(MAX_RANK, DOMAIN_MASK as u32, ORDINAL_MASK as u32);
        assert_eq!(rank(id), MAX_RANK);
        assert_eq!(domain_id(id) as u64, DOMAIN_MASK);
        assert_eq!(ordinal(id) as u64, ORDINAL_MASK);
        assert!(has_rank(id));
        assert!(!has_rank(remove_rank(id)));
    }

    #[test]
    fn test_add_rank_orders_by_rank() {
        let a = add_rank(0.1, encode_id(0, 900, 3));
        let b = add_rank(0.9, encode_id(0, 2, 1));
        assert!(a < b);
        assert_eq!(rank(add_rank(1.0, 0)), MAX_RANK);
        assert_eq!(rank(add_rank(-3.0, 0)), 0);
        assert_eq!(remove_rank(a), encode_id(0, 900, 3));
    }
}
