//! Typed view over a region of little-endian 64-bit words
//!
//! Every on-disk format in this crate (B-trees, forward index arrays,
//! preindex segments) is an array of `u64` words. `LongArray` wraps the
//! mapped bytes and does the offset arithmetic in one place.

use std::io::{self, Write};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::directories::OwnedBytes;

const WORD: usize = size_of::<u64>();

#[derive(Debug, Clone)]
pub struct LongArray {
    bytes: OwnedBytes,
}

impl LongArray {
    pub fn new(bytes: OwnedBytes) -> io::Result<Self> {
        if bytes.len() % WORD != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("long array length {} is not a multiple of 8", bytes.len()),
            ));
        }
        Ok(Self { bytes })
    }

    pub fn empty() -> Self {
        Self {
            bytes: OwnedBytes::empty(),
        }
    }

    pub fn from_vec(values: &[u64]) -> Self {
        let mut bytes = vec![0u8; values.len() * WORD];
        LittleEndian::write_u64_into(values, &mut bytes);
        Self {
            bytes: OwnedBytes::new(bytes),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / WORD
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> u64 {
        let off = idx * WORD;
        LittleEndian::read_u64(&self.bytes[off..off + WORD])
    }

    /// Bounds-checked read
    #[inline]
    pub fn try_get(&self, idx: usize) -> Option<u64> {
        (idx < self.len()).then(|| self.get(idx))
    }

    /// Sub-array `[start, end)`, sharing the backing storage
    pub fn range(&self, start: usize, end: usize) -> io::Result<LongArray> {
        if start > end || end > self.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("range {}..{} exceeds array of {} longs", start, end, self.len()),
            ));
        }
        Ok(Self {
            bytes: self.bytes.slice(start * WORD..end * WORD),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.bytes.chunks_exact(WORD).map(LittleEndian::read_u64)
    }

    pub fn to_vec(&self) -> Vec<u64> {
        let mut out = vec![0u64; self.len()];
        LittleEndian::read_u64_into(&self.bytes, &mut out);
        out
    }

    /// First index in `[from, to)` whose value is `>= key`, or `to` if none.
    pub fn lower_bound(&self, key: u64, from: usize, to: usize) -> usize {
        let (mut lo, mut hi) = (from, to);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get(mid) < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Binary search over `n` fixed-stride records starting at record `from`,
    /// comparing the first word of each record.
    ///
    /// Returns the record index relative to `from`, like `slice::binary_search`.
    pub fn binary_search_n(
        &self,
        key: u64,
        from: usize,
        n: usize,
        stride: usize,
    ) -> Result<usize, usize> {
        let (mut lo, mut hi) = (0usize, n);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let value = self.get((from + mid) * stride);
            match value.cmp(&key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Ok(mid),
            }
        }
        Err(lo)
    }
}

/// Write a slice of words in the on-disk byte order
pub fn write_longs<W: Write + ?Sized>(w: &mut W, values: &[u64]) -> io::Result<()> {
    for &v in values {
        w.write_u64::<LittleEndian>(v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_bound() {
        let arr = LongArray::from_vec(&[1, 3, 3, 7, 9]);
        assert_eq!(arr.lower_bound(0, 0, 5), 0);
        assert_eq!(arr.lower_bound(3, 0, 5), 1);
        assert_eq!(arr.lower_bound(4, 0, 5), 3);
        assert_eq!(arr.lower_bound(10, 0, 5), 5);
        assert_eq!(arr.lower_bound(9, 2, 4), 4);
    }

    #[test]
    fn test_binary_search_strided() {
        // (key, value) records
        let arr = LongArray::from_vec(&[10, 100, 20, 200, 30, 300, 40, 400]);
        assert_eq!(arr.binary_search_n(30, 0, 4, 2), Ok(2));
        assert_eq!(arr.binary_search_n(30, 1, 3, 2), Ok(1));
        assert_eq!(arr.binary_search_n(25, 0, 4, 2), Err(2));
        assert_eq!(arr.binary_search_n(5, 0, 4, 2), Err(0));
    }

    #[test]
    fn test_rejects_ragged_length() {
        assert!(LongArray::new(OwnedBytes::new(vec![0u8; 12])).is_err());
    }

    #[test]
    fn test_range_and_iter() {
        let arr = LongArray::from_vec(&[5, 6, 7, 8]);
        let sub = arr.range(1, 3).unwrap();
        assert_eq!(sub.to_vec(), vec![6, 7]);
        assert_eq!(arr.iter().sum::<u64>(), 26);
        assert!(arr.range(3, 5).is_err());
        assert_eq!(arr.try_get(4), None);
    }
}
