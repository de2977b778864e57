//! Document and term model shared by construction, query and ranking

mod flags;
pub mod id;
mod metadata;
mod rankings;
mod spans;

pub use flags::{
    HtmlFeature, WordFlag, encode_features, encode_word_flags, is_priority_term, signal_count,
};
pub use metadata::{
    DocumentFlag, DocumentMetadata, MAX_YEAR, MIN_YEAR, SIZE_BUCKET, decode_flags, decode_quality,
    decode_rank, decode_size, decode_year, encode_flags, encode_rank, encode_size, encode_year,
};
pub use rankings::{DomainRankings, UNRANKED};
pub use spans::{DocumentSpan, DocumentSpans, SpanCode, SpanIntersections};
