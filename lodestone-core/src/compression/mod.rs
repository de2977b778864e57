//! Compression for paged on-disk formats

mod zstd;

pub use self::zstd::{CompressionLevel, compress, decompress};
