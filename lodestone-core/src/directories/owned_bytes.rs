//! Cheaply cloneable, immutable byte regions backed by the heap or by a memory map

use std::ops::Range;
use std::sync::Arc;

use memmap2::Mmap;

#[derive(Clone)]
enum Backing {
    Heap(Arc<Vec<u8>>),
    Mmap(Arc<Mmap>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Heap(v) => v.as_slice(),
            Backing::Mmap(m) => &m[..],
        }
    }
}

/// A shared, read-only view into a byte region.
///
/// Clones and slices share the same backing storage; an mmap stays mapped
/// until the last view referencing it is dropped.
#[derive(Clone)]
pub struct OwnedBytes {
    backing: Backing,
    range: Range<usize>,
}

impl OwnedBytes {
    pub fn new(data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            backing: Backing::Heap(Arc::new(data)),
            range: 0..len,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Zero-copy view over a whole memory map
    pub fn from_mmap(mmap: Arc<Mmap>) -> Self {
        let len = mmap.len();
        Self {
            backing: Backing::Mmap(mmap),
            range: 0..len,
        }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn slice(&self, range: Range<usize>) -> Self {
        let start = self.range.start + range.start;
        let end = self.range.start + range.end;
        debug_assert!(end <= self.range.end, "slice {start}..{end} out of bounds");
        Self {
            backing: self.backing.clone(),
            range: start..end,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.backing.bytes()[self.range.clone()]
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.backing, Backing::Mmap(_))
    }
}

impl std::fmt::Debug for OwnedBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedBytes")
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

impl AsRef<[u8]> for OwnedBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::ops::Deref for OwnedBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}
