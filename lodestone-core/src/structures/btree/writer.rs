//! B-tree construction

use std::io::{self, Write};

use super::{BTREE_HEADER_SIZE_LONGS, BTreeContext, BTreeHeader};
use crate::structures::write_longs;

/// Serializes trees into a word stream, reusing one scratch buffer
pub struct BTreeWriter {
    ctx: BTreeContext,
    scratch: Vec<u64>,
}

impl BTreeWriter {
    pub fn new(ctx: BTreeContext) -> Self {
        Self {
            ctx,
            scratch: Vec::new(),
        }
    }

    pub fn context(&self) -> &BTreeContext {
        &self.ctx
    }

    /// Build the tree for `entries` (flattened, `entry_size` words each,
    /// sorted by key) as if placed at absolute word `offset`, and append it
    /// to `out`.
    ///
    /// Returns the number of words written, which always equals
    /// `ctx.calculate_size(offset, n)`.
    pub fn write<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        offset: u64,
        entries: &[u64],
    ) -> io::Result<usize> {
        let header = self.build(offset, entries)?;
        debug_assert_eq!(
            self.scratch.len(),
            self.ctx.calculate_size(offset, header.num_entries as usize)
        );
        write_longs(out, &self.scratch)?;
        Ok(self.scratch.len())
    }

    /// Build into the internal scratch buffer and expose the words
    pub fn build_words(&mut self, offset: u64, entries: &[u64]) -> io::Result<&[u64]> {
        self.build(offset, entries)?;
        Ok(&self.scratch)
    }

    fn build(&mut self, offset: u64, entries: &[u64]) -> io::Result<BTreeHeader> {
        let ctx = self.ctx;
        if entries.len() % ctx.entry_size != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "entry data of {} words is not a multiple of entry size {}",
                    entries.len(),
                    ctx.entry_size
                ),
            ));
        }
        let num_entries = entries.len() / ctx.entry_size;
        if num_entries > ctx.max_entries() || num_entries > u32::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} entries exceed B-tree capacity", num_entries),
            ));
        }
        if let Some(pos) = (1..num_entries)
            .find(|&i| entries[i * ctx.entry_size] < entries[(i - 1) * ctx.entry_size])
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("B-tree keys not sorted at entry {}", pos),
            ));
        }

        let header = ctx.make_header(offset, num_entries);
        let total = ctx.calculate_size(offset, num_entries);

        self.scratch.clear();
        self.scratch.resize(total, 0);
        self.scratch[..BTREE_HEADER_SIZE_LONGS].copy_from_slice(&header.to_words());

        let data_start = (header.data_offset - offset) as usize;
        self.scratch[data_start..].copy_from_slice(entries);

        if header.layers > 0 {
            self.write_index(&header, offset, entries);
        }
        Ok(header)
    }

    /// Layer 0 indexes the data, layer 1 indexes layer 0, and so on.
    fn write_index(&mut self, header: &BTreeHeader, offset: u64, entries: &[u64]) {
        let ctx = self.ctx;
        let n = header.num_entries as usize;
        let index_start = (header.index_offset - offset) as usize;

        let mut group = ctx.page_size;
        for layer in 0..header.layers as usize {
            let layer_start = index_start + header.relative_layer_offset(&ctx, layer);
            let layer_size = ctx.index_layer_size(n, layer);
            let region = &mut self.scratch[layer_start..layer_start + layer_size];

            let mut written = 0;
            let mut end = group;
            loop {
                let last = end.min(n) - 1;
                region[written] = entries[last * ctx.entry_size];
                written += 1;
                if end >= n {
                    break;
                }
                end += group;
            }
            region[written..].fill(u64::MAX);

            group *= ctx.page_size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::btree::BTreeBlockSize;

    #[test]
    fn test_written_size_matches_estimate() {
        let ctx = BTreeContext::new(5, 2, BTreeBlockSize::Bs16);
        let mut writer = BTreeWriter::new(ctx);
        for n in [0usize, 1, 15, 16, 17, 256, 1000] {
            let entries: Vec<u64> = (0..n as u64).flat_map(|k| [k * 3, k]).collect();
            let mut out = Vec::new();
            let words = writer.write(&mut out, 5, &entries).unwrap();
            assert_eq!(words, ctx.calculate_size(5, n));
            assert_eq!(out.len(), words * 8);
        }
    }

    #[test]
    fn test_unsorted_keys_rejected() {
        let ctx = BTreeContext::new(5, 1, BTreeBlockSize::Bs16);
        let mut writer = BTreeWriter::new(ctx);
        let err = writer.write(&mut Vec::new(), 0, &[1, 3, 2]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_ragged_entries_rejected() {
        let ctx = BTreeContext::new(5, 2, BTreeBlockSize::Bs16);
        let mut writer = BTreeWriter::new(ctx);
        assert!(writer.write(&mut Vec::new(), 0, &[1, 2, 3]).is_err());
    }
}
