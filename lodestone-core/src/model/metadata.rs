//! Packed per-document metadata word
//!
//! | field                      | bits | shift |
//! |----------------------------|------|-------|
//! | flags                      | 8    | 0     |
//! | quality                    | 4    | 16    |
//! | year byte (year - 1996)    | 8    | 24    |
//! | topology                   | 8    | 32    |
//! | size bucket (words / 8)    | 8    | 40    |
//! | domain rank                | 8    | 48    |
//! | avg sentence length bucket | 4    | 56    |
//!
//! Decoding is purely bitwise. The layout is shared with any other reader of
//! forward index files and must not drift.

use serde::{Deserialize, Serialize};

const FLAGS_SHIFT: u32 = 0;
const FLAGS_MASK: u64 = 0xFF;
const QUALITY_SHIFT: u32 = 16;
const QUALITY_MASK: u64 = 0x0F;
const YEAR_SHIFT: u32 = 24;
const YEAR_MASK: u64 = 0xFF;
const TOPOLOGY_SHIFT: u32 = 32;
const TOPOLOGY_MASK: u64 = 0xFF;
const SIZE_SHIFT: u32 = 40;
const SIZE_MASK: u64 = 0xFF;
const RANK_SHIFT: u32 = 48;
const RANK_MASK: u64 = 0xFF;
const AVG_SENTENCE_SHIFT: u32 = 56;
const AVG_SENTENCE_MASK: u64 = 0x0F;

/// Earliest representable publication year; year byte 0 means "unknown or 1996"
pub const MIN_YEAR: u16 = 1996;
/// Reference "now" for temporal bias
pub const MAX_YEAR: u16 = 2030;

/// Words per size bucket
pub const SIZE_BUCKET: u32 = 8;

/// Document-level boolean properties, one bit each in the flags byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DocumentFlag {
    Javascript = 0,
    PlainText = 1,
    GeneratorForum = 2,
    GeneratorWiki = 3,
    GeneratorDocs = 4,
    Sideloaded = 5,
    GeneratorVintage = 6,
    GeneratorBlog = 7,
}

impl DocumentFlag {
    pub const ALL: [DocumentFlag; 8] = [
        DocumentFlag::Javascript,
        DocumentFlag::PlainText,
        DocumentFlag::GeneratorForum,
        DocumentFlag::GeneratorWiki,
        DocumentFlag::GeneratorDocs,
        DocumentFlag::Sideloaded,
        DocumentFlag::GeneratorVintage,
        DocumentFlag::GeneratorBlog,
    ];

    #[inline]
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }

    #[inline]
    pub const fn is_present(self, flags: u8) -> bool {
        flags & self.bit() != 0
    }
}

/// Encode a set of flags into the flags byte
pub fn encode_flags(flags: &[DocumentFlag]) -> u8 {
    flags.iter().fold(0, |acc, f| acc | f.bit())
}

/// Decoded view of a metadata word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub avg_sentence_length: u8,
    pub rank: u8,
    pub encoded_size: u8,
    pub topology: u8,
    pub year_byte: u8,
    pub quality: u8,
    pub flags: u8,
}

impl DocumentMetadata {
    pub fn new(quality: u8, year: u16, size_words: u32, topology: u8, flags: u8) -> Self {
        Self {
            avg_sentence_length: 0,
            rank: 255,
            encoded_size: encode_size(size_words),
            topology,
            year_byte: encode_year(year),
            quality: quality.min(QUALITY_MASK as u8),
            flags,
        }
    }

    pub fn with_avg_sentence_length(mut self, bucket: u8) -> Self {
        self.avg_sentence_length = bucket.min(AVG_SENTENCE_MASK as u8);
        self
    }

    pub fn with_rank(mut self, rank: u8) -> Self {
        self.rank = rank;
        self
    }

    pub fn decode(meta: u64) -> Self {
        Self {
            avg_sentence_length: ((meta >> AVG_SENTENCE_SHIFT) & AVG_SENTENCE_MASK) as u8,
            rank: ((meta >> RANK_SHIFT) & RANK_MASK) as u8,
            encoded_size: ((meta >> SIZE_SHIFT) & SIZE_MASK) as u8,
            topology: ((meta >> TOPOLOGY_SHIFT) & TOPOLOGY_MASK) as u8,
            year_byte: ((meta >> YEAR_SHIFT) & YEAR_MASK) as u8,
            quality: ((meta >> QUALITY_SHIFT) & QUALITY_MASK) as u8,
            flags: ((meta >> FLAGS_SHIFT) & FLAGS_MASK) as u8,
        }
    }

    pub fn encode(&self) -> u64 {
        ((self.avg_sentence_length as u64 & AVG_SENTENCE_MASK) << AVG_SENTENCE_SHIFT)
            | ((self.rank as u64 & RANK_MASK) << RANK_SHIFT)
            | ((self.encoded_size as u64 & SIZE_MASK) << SIZE_SHIFT)
            | ((self.topology as u64 & TOPOLOGY_MASK) << TOPOLOGY_SHIFT)
            | ((self.year_byte as u64 & YEAR_MASK) << YEAR_SHIFT)
            | ((self.quality as u64 & QUALITY_MASK) << QUALITY_SHIFT)
            | ((self.flags as u64 & FLAGS_MASK) << FLAGS_SHIFT)
    }

    pub fn year(&self) -> u16 {
        MIN_YEAR + self.year_byte as u16
    }

    /// Approximate document length in words
    pub fn size(&self) -> u32 {
        self.encoded_size as u32 * SIZE_BUCKET
    }

    pub fn has_flag(&self, flag: DocumentFlag) -> bool {
        flag.is_present(self.flags)
    }
}

/// Replace the rank field of an encoded metadata word
#[inline]
pub fn encode_rank(meta: u64, rank: u8) -> u64 {
    (meta & !(RANK_MASK << RANK_SHIFT)) | ((rank as u64) << RANK_SHIFT)
}

#[inline]
pub fn decode_rank(meta: u64) -> u8 {
    ((meta >> RANK_SHIFT) & RANK_MASK) as u8
}

#[inline]
pub fn decode_quality(meta: u64) -> u8 {
    ((meta >> QUALITY_SHIFT) & QUALITY_MASK) as u8
}

#[inline]
pub fn decode_year(meta: u64) -> u16 {
    MIN_YEAR + ((meta >> YEAR_SHIFT) & YEAR_MASK) as u16
}

#[inline]
pub fn decode_size(meta: u64) -> u32 {
    ((meta >> SIZE_SHIFT) & SIZE_MASK) as u32 * SIZE_BUCKET
}

#[inline]
pub fn decode_flags(meta: u64) -> u8 {
    (meta & FLAGS_MASK) as u8
}

/// Year byte for `year`, saturating at both ends
pub fn encode_year(year: u16) -> u8 {
    year.saturating_sub(MIN_YEAR).min(255) as u8
}

/// Size bucket for a document of `words` words, saturating at 255
pub fn encode_size(words: u32) -> u8 {
    (words / SIZE_BUCKET).min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_field_positions() {
        let meta = DocumentMetadata {
            avg_sentence_length: 0x3,
            rank: 0x7A,
            encoded_size: 0x40,
            topology: 0x11,
            year_byte: 27,
            quality: 0x9,
            flags: DocumentFlag::GeneratorForum.bit(),
        };
        let word = meta.encode();
        assert_eq!(word & 0xFF, 0b100);
        assert_eq!((word >> 16) & 0xF, 0x9);
        assert_eq!((word >> 24) & 0xFF, 27);
        assert_eq!((word >> 32) & 0xFF, 0x11);
        assert_eq!((word >> 40) & 0xFF, 0x40);
        assert_eq!((word >> 48) & 0xFF, 0x7A);
        assert_eq!((word >> 56) & 0xF, 0x3);
        assert_eq!(meta.year(), 2023);
        assert_eq!(meta.size(), 512);
    }

    #[test]
    fn test_decode_encode_random_fields() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let meta = DocumentMetadata {
                avg_sentence_length: rng.gen_range(0..16),
                rank: rng.r#gen(),
                encoded_size: rng.r#gen(),
                topology: rng.r#gen(),
                year_byte: rng.r#gen(),
                quality: rng.gen_range(0..16),
                flags: rng.r#gen(),
            };
            assert_eq!(DocumentMetadata::decode(meta.encode()), meta);
        }
    }

    #[test]
    fn test_encode_rank_replaces_only_rank() {
        let meta = DocumentMetadata::new(5, 2010, 1000, 3, 0).with_rank(200).encode();
        let restamped = encode_rank(meta, 17);
        assert_eq!(decode_rank(restamped), 17);
        assert_eq!(restamped & !(0xFFu64 << 48), meta & !(0xFFu64 << 48));
    }

    #[test]
    fn test_saturating_encoders() {
        assert_eq!(encode_year(1980), 0);
        assert_eq!(encode_year(2400), 255);
        assert_eq!(encode_size(1_000_000), 255);
        assert_eq!(DocumentMetadata::new(99, 2000, 0, 0, 0).quality, 15);
    }

    #[test]
    fn test_flags() {
        let flags = encode_flags(&[DocumentFlag::GeneratorWiki, DocumentFlag::Javascript]);
        assert!(DocumentFlag::GeneratorWiki.is_present(flags));
        assert!(DocumentFlag::Javascript.is_present(flags));
        assert!(!DocumentFlag::GeneratorForum.is_present(flags));
    }
}
