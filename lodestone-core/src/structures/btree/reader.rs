//! B-tree lookup

use std::io;

use super::{BTreeContext, BTreeHeader};
use crate::structures::{LongArray, LongQueryBuffer};

/// Read-only view of one tree inside a mapped file
#[derive(Debug, Clone)]
pub struct BTreeReader {
    ctx: BTreeContext,
    header: BTreeHeader,
    file: LongArray,
    data: LongArray,
    layer_offsets: Vec<usize>,
}

impl BTreeReader {
    /// Open the tree whose header sits at word `offset` of `file`
    pub fn new(file: LongArray, ctx: BTreeContext, offset: u64) -> io::Result<Self> {
        let header = BTreeHeader::read(&file, offset as usize)?;
        header.validate(&ctx, file.len())?;
        let data_start = header.data_offset as usize;
        let data_end = data_start + header.num_entries as usize * ctx.entry_size;
        let data = file.range(data_start, data_end)?;
        let layer_offsets = header.relative_layer_offsets(&ctx);
        Ok(Self {
            ctx,
            header,
            file,
            data,
            layer_offsets,
        })
    }

    pub fn header(&self) -> &BTreeHeader {
        &self.header
    }

    pub fn num_entries(&self) -> usize {
        self.header.num_entries as usize
    }

    /// The data region: `num_entries * entry_size` words
    pub fn data(&self) -> &LongArray {
        &self.data
    }

    #[inline]
    pub fn key_at(&self, entry: usize) -> u64 {
        self.data.get(entry * self.ctx.entry_size)
    }

    /// Word `field` (0 = key) of entry number `entry`
    #[inline]
    pub fn value_at(&self, entry: usize, field: usize) -> u64 {
        debug_assert!(field < self.ctx.entry_size);
        self.data.get(entry * self.ctx.entry_size + field)
    }

    /// Entry index holding `key`, or `None` when absent
    pub fn find_entry(&self, key: u64) -> Option<usize> {
        let mut ptr = BTreePointer::new(self);
        while !ptr.is_data_layer() {
            if !ptr.walk_to_child(self, key) {
                return None;
            }
        }
        ptr.find_data(self, key)
    }

    /// Value word `field` of the entry with `key`
    pub fn get(&self, key: u64, field: usize) -> Option<u64> {
        self.find_entry(key).map(|idx| self.value_at(idx, field))
    }

    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.num_entries()).map(|i| self.key_at(i))
    }

    /// Keep only the buffer values present in this tree.
    ///
    /// The buffer must be sorted; consecutive keys usually land in the same
    /// data page, so the pointer is reused while the key is within its bound.
    pub fn retain_entries(&self, buffer: &mut LongQueryBuffer) {
        let mut cursor = SortedCursor::new(self);
        while buffer.has_more() {
            if cursor.contains(self, buffer.current_value()) {
                buffer.retain_and_advance();
            } else {
                buffer.reject_and_advance();
            }
        }
        buffer.finalize_filtering();
    }

    /// Drop the buffer values present in this tree
    pub fn reject_entries(&self, buffer: &mut LongQueryBuffer) {
        let mut cursor = SortedCursor::new(self);
        while buffer.has_more() {
            if cursor.contains(self, buffer.current_value()) {
                buffer.reject_and_advance();
            } else {
                buffer.retain_and_advance();
            }
        }
        buffer.finalize_filtering();
    }

    /// Value word `field` for each key, 0 for absent keys.
    /// `keys` should be sorted for best locality but need not be.
    pub fn query_data(&self, keys: &[u64], field: usize) -> Vec<u64> {
        let mut cursor = SortedCursor::new(self);
        keys.iter()
            .map(|&key| {
                cursor
                    .find(self, key)
                    .map(|idx| self.value_at(idx, field))
                    .unwrap_or(0)
            })
            .collect()
    }
}

struct BTreePointer {
    layer: isize,
    /// Page-aligned position within the current layer (or data entry index)
    offset: usize,
    /// Largest key reachable below the current position
    boundary: u64,
}

impl BTreePointer {
    fn new(reader: &BTreeReader) -> Self {
        Self {
            layer: reader.header.layers as isize - 1,
            offset: 0,
            boundary: u64::MAX,
        }
    }

    fn is_data_layer(&self) -> bool {
        self.layer < 0
    }

    fn walk_to_child(&mut self, reader: &BTreeReader, key: u64) -> bool {
        let page = reader.ctx.page_size;
        let layer = self.layer as usize;
        let layer_base = reader.header.index_offset as usize + reader.layer_offsets[layer];
        let layer_end =
            layer_base + reader.ctx.index_layer_size(reader.header.num_entries as usize, layer);
        let search_start = layer_base + self.offset;
        if search_start >= layer_end {
            return false;
        }
        let search_end = (search_start + page).min(layer_end);

        let idx = reader.file.lower_bound(key, search_start, search_end);
        if idx == search_end {
            return false;
        }

        self.boundary = reader.file.get(idx);
        self.offset = page * (self.offset + (idx - search_start));
        self.layer -= 1;
        true
    }

    fn find_data(&self, reader: &BTreeReader, key: u64) -> Option<usize> {
        let n = reader.num_entries();
        if self.offset >= n || key > self.boundary {
            return None;
        }
        let count = if reader.header.layers == 0 {
            n
        } else {
            (n - self.offset).min(reader.ctx.page_size)
        };
        reader
            .data
            .binary_search_n(key, self.offset, count, reader.ctx.entry_size)
            .ok()
            .map(|i| self.offset + i)
    }
}

/// Lookup helper for ascending key streams: stays on the current data page
/// while keys remain within its boundary.
struct SortedCursor {
    ptr: Option<BTreePointer>,
    last_key: u64,
}

impl SortedCursor {
    fn new(_reader: &BTreeReader) -> Self {
        Self {
            ptr: None,
            last_key: 0,
        }
    }

    fn find(&mut self, reader: &BTreeReader, key: u64) -> Option<usize> {
        let reuse = matches!(&self.ptr, Some(p) if key >= self.last_key && key <= p.boundary);
        if !reuse {
            let mut ptr = BTreePointer::new(reader);
            while !ptr.is_data_layer() {
                if !ptr.walk_to_child(reader, key) {
                    self.ptr = None;
                    return None;
                }
            }
            self.ptr = Some(ptr);
        }
        self.last_key = key;
        self.ptr.as_ref().and_then(|p| p.find_data(reader, key))
    }

    fn contains(&mut self, reader: &BTreeReader, key: u64) -> bool {
        self.find(reader, key).is_some()
    }
}
