//! Position sequences: gamma coding and multi-sequence operations

mod gamma;
mod sequence_ops;

pub use gamma::{
    GammaCodedSequence, GammaSequenceIter, MAX_POSITION, MAX_SEQUENCE_BYTES, OffsetIter,
    encode_into,
};
pub use sequence_ops::{intersect_sequences, min_distance};
