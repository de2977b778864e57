//! Forward index: document id -> metadata, features, size and spans
//!
//! Files:
//! - `fwd-doc-id.dat`: sorted, rank-free document ids (u64 words)
//! - `fwd-doc-data.dat`: [`ENTRY_SIZE`] words per document, parallel to the ids
//! - `fwd-spans.dat`: concatenated serialized [`DocumentSpans`](crate::model::DocumentSpans)

mod builder;
mod reader;

pub use builder::{ForwardIndexConverter, ForwardIndexStats};
pub use reader::ForwardIndexReader;

pub const DOC_IDS_FILE: &str = "fwd-doc-id.dat";
pub const DOC_DATA_FILE: &str = "fwd-doc-data.dat";
pub const SPANS_FILE: &str = "fwd-spans.dat";

/// Words per document record
pub const ENTRY_SIZE: usize = 3;
pub const METADATA_OFFSET: usize = 0;
/// `features | size << 32`
pub const FEATURES_OFFSET: usize = 1;
/// `offset << SPANS_SIZE_BITS | size` into the spans file
pub const SPANS_OFFSET: usize = 2;

pub const SPANS_SIZE_BITS: u32 = 28;
pub const SPANS_SIZE_MASK: u64 = (1 << SPANS_SIZE_BITS) - 1;

#[inline]
pub(crate) fn encode_spans_ref(offset: u64, size: u64) -> u64 {
    (offset << SPANS_SIZE_BITS) | (size & SPANS_SIZE_MASK)
}

#[inline]
pub(crate) fn decode_spans_ref(word: u64) -> (u64, u64) {
    (word >> SPANS_SIZE_BITS, word & SPANS_SIZE_MASK)
}
