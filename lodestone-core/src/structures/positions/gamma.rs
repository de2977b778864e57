//! Elias-gamma coded position sequences
//!
//! Format (MSB-first bit stream, zero-padded to a byte boundary):
//! ```text
//!   gamma(count + 1)
//!   gamma(v[0] - 0 + 1)
//!   gamma(v[i] - v[i-1] + 1)   for i in 1..count
//! ```
//! The `+ 1` bias makes zero positions and repeated values encodable, since
//! gamma codes only represent integers `>= 1`.

use std::io;

use crate::directories::OwnedBytes;

/// Largest encodable position; offset arithmetic is done in `i32`
pub const MAX_POSITION: u32 = i32::MAX as u32;

/// Largest encoded term position sequence; a positions file entry holds the
/// sequence plus one flags byte under a 16-bit length
pub const MAX_SEQUENCE_BYTES: usize = u16::MAX as usize - 1;

struct BitWriter<'a> {
    output: &'a mut Vec<u8>,
    buffer: u64,
    bits_in_buffer: u32,
}

impl<'a> BitWriter<'a> {
    fn new(output: &'a mut Vec<u8>) -> Self {
        Self {
            output,
            buffer: 0,
            bits_in_buffer: 0,
        }
    }

    /// Append the low `width` bits of `value`, most significant first.
    /// `width` is at most 34 here, and fewer than 8 bits are ever pending.
    #[inline]
    fn put_bits(&mut self, value: u64, width: u32) {
        debug_assert!(width <= 40);
        if width == 0 {
            return;
        }
        let mask = (1u64 << width) - 1;
        self.buffer = (self.buffer << width) | (value & mask);
        self.bits_in_buffer += width;
        while self.bits_in_buffer >= 8 {
            self.bits_in_buffer -= 8;
            self.output.push((self.buffer >> self.bits_in_buffer) as u8);
        }
        self.buffer &= (1u64 << self.bits_in_buffer) - 1;
    }

    #[inline]
    fn put_gamma(&mut self, value: u64) {
        debug_assert!(value >= 1);
        let n = 63 - value.leading_zeros();
        self.put_bits(0, n);
        self.put_bits(value, n + 1);
    }

    fn finish(self) {
        if self.bits_in_buffer > 0 {
            let pad = 8 - self.bits_in_buffer;
            self.output.push((self.buffer << pad) as u8);
        }
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    #[inline]
    fn get_bit(&mut self) -> Option<u64> {
        let byte = *self.data.get(self.bit_pos >> 3)?;
        let bit = (byte >> (7 - (self.bit_pos & 7))) & 1;
        self.bit_pos += 1;
        Some(bit as u64)
    }

    #[inline]
    fn get_gamma(&mut self) -> Option<u64> {
        let mut zeros = 0u32;
        while self.get_bit()? == 0 {
            zeros += 1;
            if zeros > 40 {
                return None;
            }
        }
        let mut value = 1u64;
        for _ in 0..zeros {
            value = (value << 1) | self.get_bit()?;
        }
        Some(value)
    }
}

/// Encode `values` into the caller's scratch buffer, returning the encoded bytes.
///
/// The workspace is cleared first; its allocation is reused across calls.
pub fn encode_into<'w>(workspace: &'w mut Vec<u8>, values: &[u32]) -> io::Result<&'w [u8]> {
    workspace.clear();
    let mut writer = BitWriter::new(workspace);
    writer.put_gamma(values.len() as u64 + 1);

    let mut last = 0u32;
    for &v in values {
        if v < last || v > MAX_POSITION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("position sequence must be ascending and <= {MAX_POSITION}, got {v} after {last}"),
            ));
        }
        writer.put_gamma((v - last) as u64 + 1);
        last = v;
    }
    writer.finish();
    Ok(workspace.as_slice())
}

/// An immutable gamma-coded sequence of ascending positions
#[derive(Clone)]
pub struct GammaCodedSequence {
    bytes: OwnedBytes,
}

impl GammaCodedSequence {
    /// Encode `values` using `workspace` as scratch, copying the result out
    pub fn generate(workspace: &mut Vec<u8>, values: &[u32]) -> io::Result<Self> {
        let encoded = encode_into(workspace, values)?;
        Ok(Self {
            bytes: OwnedBytes::new(encoded.to_vec()),
        })
    }

    /// Wrap already-encoded bytes (e.g. a slice of the mapped positions file)
    pub fn from_bytes(bytes: OwnedBytes) -> Self {
        Self { bytes }
    }

    pub fn empty() -> Self {
        // gamma(1) == single '1' bit: zero values
        Self {
            bytes: OwnedBytes::new(vec![0b1000_0000]),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub fn buffer_size(&self) -> usize {
        self.bytes.len()
    }

    /// Number of encoded values; reads only the leading count
    pub fn value_count(&self) -> usize {
        BitReader::new(self.bytes.as_slice())
            .get_gamma()
            .map(|n| (n - 1) as usize)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> GammaSequenceIter<'_> {
        GammaSequenceIter::new(self.bytes.as_slice())
    }

    /// Iterate positions shifted by `offset`, to align several terms'
    /// positions onto a common coordinate space.
    pub fn offset_iter(&self, offset: i32) -> OffsetIter<GammaSequenceIter<'_>> {
        OffsetIter {
            inner: self.iter(),
            offset,
        }
    }

    pub fn values(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

impl std::fmt::Debug for GammaCodedSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PartialEq for GammaCodedSequence {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

/// Lazy forward-only decoder
pub struct GammaSequenceIter<'a> {
    reader: BitReader<'a>,
    remaining: usize,
    last: u32,
}

impl<'a> GammaSequenceIter<'a> {
    /// Decode directly from encoded bytes; malformed input yields an empty
    /// or truncated sequence rather than an error.
    pub fn new(data: &'a [u8]) -> Self {
        let mut reader = BitReader::new(data);
        let remaining = reader.get_gamma().map(|n| (n - 1) as usize).unwrap_or(0);
        Self {
            reader,
            remaining,
            last: 0,
        }
    }
}

impl Iterator for GammaSequenceIter<'_> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let Some(delta) = self.reader.get_gamma() else {
            self.remaining = 0;
            return None;
        };
        self.remaining -= 1;
        self.last = self.last.saturating_add((delta - 1) as u32);
        Some(self.last)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Positions shifted by a constant
pub struct OffsetIter<I> {
    inner: I,
    offset: i32,
}

impl<I: Iterator<Item = u32>> OffsetIter<I> {
    pub fn new(inner: I, offset: i32) -> Self {
        Self { inner, offset }
    }
}

impl<I: Iterator<Item = u32>> Iterator for OffsetIter<I> {
    type Item = i32;

    #[inline]
    fn next(&mut self) -> Option<i32> {
        self.inner
            .next()
            .map(|v| (v as i32).wrapping_add(self.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn round_trip(values: &[u32]) -> Vec<u32> {
        let mut ws = Vec::new();
        GammaCodedSequence::generate(&mut ws, values).unwrap().values()
    }

    #[test]
    fn test_round_trip_edge_cases() {
        assert_eq!(round_trip(&[]), Vec::<u32>::new());
        assert_eq!(round_trip(&[0]), vec![0]);
        assert_eq!(round_trip(&[7]), vec![7]);
        assert_eq!(round_trip(&[0, 0, 1, 1, 2]), vec![0, 0, 1, 1, 2]);
        assert_eq!(round_trip(&[MAX_POSITION]), vec![MAX_POSITION]);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut ws = Vec::new();
        for _ in 0..200 {
            let len = rng.gen_range(0..300);
            let mut values: Vec<u32> = (0..len).map(|_| rng.gen_range(0..100_000)).collect();
            values.sort_unstable();
            let seq = GammaCodedSequence::generate(&mut ws, &values).unwrap();
            assert_eq!(seq.value_count(), values.len());
            assert_eq!(seq.values(), values);
        }
    }

    #[test]
    fn test_rejects_descending() {
        let mut ws = Vec::new();
        assert!(encode_into(&mut ws, &[5, 3]).is_err());
    }

    #[test]
    fn test_workspace_reuse() {
        let mut ws = Vec::with_capacity(64);
        let a = encode_into(&mut ws, &[1, 2, 3]).unwrap().to_vec();
        let b = encode_into(&mut ws, &[1, 2, 3]).unwrap().to_vec();
        assert_eq!(a, b);
    }

    #[test]
    fn test_offset_iter() {
        let mut ws = Vec::new();
        let seq = GammaCodedSequence::generate(&mut ws, &[5, 9]).unwrap();
        assert_eq!(seq.offset_iter(-1).collect::<Vec<_>>(), vec![4, 8]);
        assert_eq!(seq.offset_iter(3).collect::<Vec<_>>(), vec![8, 12]);
    }

    #[test]
    fn test_empty_sequence() {
        let seq = GammaCodedSequence::empty();
        assert_eq!(seq.value_count(), 0);
        assert_eq!(seq.iter().next(), None);
        assert_eq!(GammaSequenceIter::new(&[]).next(), None);
    }
}
