//! Zstd page compression for the posting journal

use std::cell::RefCell;
use std::io;

/// Compression level (1-22 for zstd)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(pub i32);

impl CompressionLevel {
    pub const FAST: Self = Self(1);
    pub const DEFAULT: Self = Self(3);
    pub const BEST: Self = Self(19);
}

impl Default for CompressionLevel {
    fn default() -> Self {
        // Journals are written once and read twice per index kind
        Self::DEFAULT
    }
}

pub fn compress(data: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    zstd::bulk::compress(data, level.0)
}

/// Decompress a page whose decoded size is at most `capacity` bytes.
///
/// Reuses a thread-local bulk decompressor; pages that overflow the hint fall
/// back to streaming decode.
pub fn decompress(data: &[u8], capacity: usize) -> io::Result<Vec<u8>> {
    thread_local! {
        static DECOMPRESSOR: RefCell<Option<zstd::bulk::Decompressor<'static>>> =
            const { RefCell::new(None) };
    }
    DECOMPRESSOR.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(zstd::bulk::Decompressor::new()?);
        }
        match slot.as_mut() {
            Some(dc) => dc
                .decompress(data, capacity)
                .or_else(|_| zstd::decode_all(data)),
            None => zstd::decode_all(data),
        }
    })
}
