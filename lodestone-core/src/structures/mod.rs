pub mod btree;
mod long_array;
pub mod positions;
mod query_buffer;

pub use btree::{BTreeBlockSize, BTreeContext, BTreeHeader, BTreeReader, BTreeWriter};
pub use long_array::{LongArray, write_longs};
pub use positions::{GammaCodedSequence, GammaSequenceIter, intersect_sequences};
pub use query_buffer::LongQueryBuffer;
