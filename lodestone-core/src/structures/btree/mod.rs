//! Static, write-once B-tree over a sorted array of fixed-size entries
//!
//! ## Layout (all units are 64-bit words)
//! ```text
//! offset:       header (3 words)
//!                 [0] layers << 32 | num_entries
//!                 [1] index_offset   (absolute)
//!                 [2] data_offset    (absolute)
//!               padding (zeros) up to the next page boundary, only if layers > 0
//! index_offset: index layers, top layer first
//! data_offset:  num_entries * entry_size words; the first word of each entry is its key
//! ```
//!
//! Index layer `L` (0 = closest to the data) holds one key per group of
//! `page_size^(L+1)` data entries: the last key of that group. Each layer is
//! padded with `u64::MAX` to a whole number of pages. Walking from the top,
//! a lower-bound search within one page picks the child page in the layer
//! below, so a lookup touches one page per layer.
//!
//! Several trees can live in one file at different offsets; the header stores
//! absolute offsets so a reader only needs the file and the tree's offset.

mod reader;
mod writer;

use std::io;

pub use reader::BTreeReader;
pub use writer::BTreeWriter;

use super::LongArray;

pub const BTREE_HEADER_SIZE_LONGS: usize = 3;

/// Page size of the index layers, in words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BTreeBlockSize {
    Bs16,
    Bs32,
    Bs64,
    Bs128,
    Bs256,
    Bs512,
    Bs1024,
    Bs2048,
    Bs4096,
}

impl BTreeBlockSize {
    pub const fn bits(self) -> u32 {
        match self {
            BTreeBlockSize::Bs16 => 4,
            BTreeBlockSize::Bs32 => 5,
            BTreeBlockSize::Bs64 => 6,
            BTreeBlockSize::Bs128 => 7,
            BTreeBlockSize::Bs256 => 8,
            BTreeBlockSize::Bs512 => 9,
            BTreeBlockSize::Bs1024 => 10,
            BTreeBlockSize::Bs2048 => 11,
            BTreeBlockSize::Bs4096 => 12,
        }
    }
}

/// Shape parameters shared by the writer and reader of one kind of tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeContext {
    pub max_layers: usize,
    /// Words per entry; the key is the first word
    pub entry_size: usize,
    block_size_bits: u32,
    /// Words per index page
    pub page_size: usize,
}

impl BTreeContext {
    pub const fn new(max_layers: usize, entry_size: usize, block_size: BTreeBlockSize) -> Self {
        Self {
            max_layers,
            entry_size,
            block_size_bits: block_size.bits(),
            page_size: 1 << block_size.bits(),
        }
    }

    /// Number of index layers needed for `num_entries`; zero when the data
    /// fits in a single page.
    pub fn num_index_layers(&self, num_entries: usize) -> usize {
        if num_entries <= self.page_size {
            return 0;
        }
        for i in 1..self.max_layers {
            let frac = num_entries >> (self.block_size_bits as usize * i);
            if frac < self.page_size {
                return i;
            }
        }
        self.max_layers
    }

    /// Largest entry count whose top layer still fits in one page
    pub fn max_entries(&self) -> usize {
        let bits = self.block_size_bits as usize * (self.max_layers + 1);
        if bits >= usize::BITS as usize {
            usize::MAX
        } else {
            1usize << bits
        }
    }

    /// Size in words of index layer `layer`
    pub fn index_layer_size(&self, num_entries: usize, layer: usize) -> usize {
        let group = 1usize << (self.block_size_bits as usize * (layer + 1));
        let keys = num_entries.div_ceil(group);
        self.page_size * keys.div_ceil(self.page_size)
    }

    pub fn index_size(&self, num_entries: usize, layers: usize) -> usize {
        (0..layers)
            .map(|layer| self.index_layer_size(num_entries, layer))
            .sum()
    }

    /// Header for a tree of `num_entries` written at absolute word `offset`
    pub fn make_header(&self, offset: u64, num_entries: usize) -> BTreeHeader {
        let layers = self.num_index_layers(num_entries);
        let padding = if layers == 0 {
            0
        } else {
            let unaligned = (offset as usize + BTREE_HEADER_SIZE_LONGS) % self.page_size;
            (self.page_size - unaligned) % self.page_size
        };
        let index_offset = offset + (BTREE_HEADER_SIZE_LONGS + padding) as u64;
        let data_offset = index_offset + self.index_size(num_entries, layers) as u64;
        BTreeHeader::new(layers as u32, num_entries as u32, index_offset, data_offset)
    }

    /// Total words occupied by a tree of `num_entries` written at `offset`
    pub fn calculate_size(&self, offset: u64, num_entries: usize) -> usize {
        let header = self.make_header(offset, num_entries);
        (header.data_offset - offset) as usize + num_entries * self.entry_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeHeader {
    pub layers: u32,
    pub num_entries: u32,
    pub index_offset: u64,
    pub data_offset: u64,
}

impl BTreeHeader {
    pub fn new(layers: u32, num_entries: u32, index_offset: u64, data_offset: u64) -> Self {
        debug_assert!(data_offset >= index_offset);
        Self {
            layers,
            num_entries,
            index_offset,
            data_offset,
        }
    }

    pub fn read(array: &LongArray, offset: usize) -> io::Result<Self> {
        if offset + BTREE_HEADER_SIZE_LONGS > array.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("B-tree header at {} beyond end of file ({} longs)", offset, array.len()),
            ));
        }
        let word = array.get(offset);
        let header = Self {
            layers: (word >> 32) as u32,
            num_entries: (word & 0xFFFF_FFFF) as u32,
            index_offset: array.get(offset + 1),
            data_offset: array.get(offset + 2),
        };
        if header.data_offset < header.index_offset
            || header.index_offset < (offset + BTREE_HEADER_SIZE_LONGS) as u64
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("corrupt B-tree header at {}: {:?}", offset, header),
            ));
        }
        Ok(header)
    }

    /// Check that the layer count agrees with `ctx` and that the index
    /// layers and the data of the tree fit in a file of `file_len` words
    pub fn validate(&self, ctx: &BTreeContext, file_len: usize) -> io::Result<()> {
        let n = self.num_entries as usize;
        let layers = self.layers as usize;
        let index_end = (self.index_offset as usize).checked_add(ctx.index_size(n, layers));
        let data_end = n
            .checked_mul(ctx.entry_size)
            .and_then(|len| (self.data_offset as usize).checked_add(len));

        let valid = layers <= ctx.max_layers
            && layers == ctx.num_index_layers(n)
            && index_end.is_some_and(|end| end <= self.data_offset as usize)
            && data_end.is_some_and(|end| end <= file_len);
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("B-tree header {:?} does not fit a file of {} longs", self, file_len),
            ));
        }
        Ok(())
    }

    pub fn to_words(&self) -> [u64; BTREE_HEADER_SIZE_LONGS] {
        [
            ((self.layers as u64) << 32) | self.num_entries as u64,
            self.index_offset,
            self.data_offset,
        ]
    }

    /// Offset of index layer `layer` relative to `index_offset`; higher
    /// layers come first.
    pub fn relative_layer_offset(&self, ctx: &BTreeContext, layer: usize) -> usize {
        ((layer + 1)..self.layers as usize)
            .map(|l| ctx.index_layer_size(self.num_entries as usize, l))
            .sum()
    }

    pub fn relative_layer_offsets(&self, ctx: &BTreeContext) -> Vec<usize> {
        (0..self.layers as usize)
            .map(|layer| self.relative_layer_offset(ctx, layer))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: BTreeContext = BTreeContext::new(5, 2, BTreeBlockSize::Bs16);

    #[test]
    fn test_layer_counts() {
        assert_eq!(CTX.num_index_layers(0), 0);
        assert_eq!(CTX.num_index_layers(16), 0);
        assert_eq!(CTX.num_index_layers(17), 1);
        assert_eq!(CTX.num_index_layers(255), 1);
        assert_eq!(CTX.num_index_layers(256), 2);
        assert_eq!(CTX.num_index_layers(4096), 3);
    }

    #[test]
    fn test_header_invariants() {
        for offset in [0u64, 1, 13, 100] {
            for n in [0usize, 1, 16, 17, 300, 5000] {
                let h = CTX.make_header(offset, n);
                assert!(h.data_offset >= h.index_offset);
                assert!(h.index_offset >= offset + BTREE_HEADER_SIZE_LONGS as u64);
                if h.layers > 0 {
                    assert_eq!(h.index_offset % CTX.page_size as u64, 0);
                }
                assert_eq!(
                    CTX.calculate_size(offset, n),
                    (h.data_offset - offset) as usize + n * CTX.entry_size
                );
            }
        }
    }

    #[test]
    fn test_header_word_roundtrip() {
        let h = CTX.make_header(7, 1000);
        let mut words = vec![0u64; 7];
        words.extend_from_slice(&h.to_words());
        let arr = LongArray::from_vec(&words);
        assert_eq!(BTreeHeader::read(&arr, 7).unwrap(), h);
    }

    #[test]
    fn test_corrupt_header_rejected() {
        let arr = LongArray::from_vec(&[1u64 << 32 | 10, 50, 20]);
        assert!(BTreeHeader::read(&arr, 0).is_err());
        assert!(BTreeHeader::read(&arr, 1).is_err());
    }

    #[test]
    fn test_layer_offsets_top_first() {
        let h = CTX.make_header(0, 5000);
        assert_eq!(h.layers, 3);
        let offsets = h.relative_layer_offsets(&CTX);
        assert_eq!(offsets[2], 0);
        assert_eq!(offsets[1], CTX.index_layer_size(5000, 2));
        assert_eq!(
            offsets[0],
            CTX.index_layer_size(5000, 2) + CTX.index_layer_size(5000, 1)
        );
    }
}
