mod mmap;
mod owned_bytes;

pub use mmap::{MmapDirectory, StreamingWriter, map_file};
pub use owned_bytes::OwnedBytes;
