//! Positions file: per-posting word flags and gamma-coded positions
//!
//! Entries are `[meta: u8][gamma bytes]`, appended back to back. A posting
//! in the full index refers to its entry with `(length << 48) | offset`.

use std::io::{self, Write};
use std::path::Path;

use crate::directories::{OwnedBytes, StreamingWriter, map_file};
use crate::structures::GammaCodedSequence;
use crate::structures::positions::MAX_SEQUENCE_BYTES;

const OFFSET_BITS: u32 = 48;
const OFFSET_MASK: u64 = (1 << OFFSET_BITS) - 1;

#[inline]
pub fn encode_pointer(offset: u64, len: usize) -> u64 {
    ((len as u64) << OFFSET_BITS) | (offset & OFFSET_MASK)
}

#[inline]
pub fn decode_pointer(pointer: u64) -> (u64, usize) {
    (pointer & OFFSET_MASK, (pointer >> OFFSET_BITS) as usize)
}

/// Flags and positions of one term in one document
#[derive(Debug, Clone, PartialEq)]
pub struct TermData {
    pub flags: u8,
    pub positions: GammaCodedSequence,
}

/// Entries of one shard, staged in memory until the shard is complete.
///
/// Pointers returned by [`PositionsBuffer::add`] are relative to the buffer
/// start and become file pointers once rebased by the offset
/// [`PositionsFileWriter::append`] returns.
#[derive(Debug, Default)]
pub struct PositionsBuffer {
    data: Vec<u8>,
}

impl PositionsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an entry and return its buffer-relative pointer
    pub fn add(&mut self, meta: u8, positions: &[u8]) -> io::Result<u64> {
        if positions.len() > MAX_SEQUENCE_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("positions entry of {} bytes too large", positions.len() + 1),
            ));
        }
        let offset = self.data.len() as u64;
        self.data.push(meta);
        self.data.extend_from_slice(positions);
        Ok(encode_pointer(offset, 1 + positions.len()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Move a buffer-relative pointer to the buffer's offset in the file
#[inline]
pub fn rebase_pointer(pointer: u64, base: u64) -> u64 {
    let (offset, len) = decode_pointer(pointer);
    encode_pointer(base + offset, len)
}

pub struct PositionsFileWriter {
    out: StreamingWriter,
    offset: u64,
}

impl PositionsFileWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            out: StreamingWriter::create(path.to_path_buf())?,
            offset: 0,
        })
    }

    /// Append a staged buffer and return the file offset it starts at
    pub fn append(&mut self, buffer: &PositionsBuffer) -> io::Result<u64> {
        let base = self.offset;
        if base + buffer.len() as u64 > OFFSET_MASK {
            return Err(io::Error::other("positions file exceeds addressable size"));
        }
        self.out.write_all(&buffer.data)?;
        self.offset += buffer.len() as u64;
        Ok(base)
    }

    pub fn size(&self) -> u64 {
        self.offset
    }

    pub fn finish(self) -> io::Result<u64> {
        self.out.finish()
    }
}

#[derive(Debug, Clone)]
pub struct PositionsFileReader {
    data: OwnedBytes,
}

impl PositionsFileReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            data: map_file(path)?,
        })
    }

    pub fn from_bytes(data: OwnedBytes) -> Self {
        Self { data }
    }

    pub fn empty() -> Self {
        Self::from_bytes(OwnedBytes::empty())
    }

    /// Resolve a pointer; `None` for a zero or out-of-range pointer
    pub fn get(&self, pointer: u64) -> Option<TermData> {
        let (offset, len) = decode_pointer(pointer);
        let start = offset as usize;
        if len == 0 || start + len > self.data.len() {
            return None;
        }
        Some(TermData {
            flags: self.data[start],
            positions: GammaCodedSequence::from_bytes(self.data.slice(start + 1..start + len)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::positions::encode_into;

    #[test]
    fn test_write_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.dat");
        let mut ws = Vec::new();

        let mut first = PositionsBuffer::new();
        let a = first.add(0x3, encode_into(&mut ws, &[1, 4, 9]).unwrap()).unwrap();
        let mut second = PositionsBuffer::new();
        let b = second.add(0x0, encode_into(&mut ws, &[2]).unwrap()).unwrap();
        assert_eq!(decode_pointer(b).0, 0);

        let mut writer = PositionsFileWriter::create(&path).unwrap();
        assert_eq!(writer.append(&first).unwrap(), 0);
        let base = writer.append(&second).unwrap();
        assert_eq!(base, first.len() as u64);
        assert_eq!(writer.size(), (first.len() + second.len()) as u64);
        writer.finish().unwrap();

        let reader = PositionsFileReader::open(&path).unwrap();
        let ta = reader.get(rebase_pointer(a, 0)).unwrap();
        assert_eq!(ta.flags, 0x3);
        assert_eq!(ta.positions.values(), vec![1, 4, 9]);
        let tb = reader.get(rebase_pointer(b, base)).unwrap();
        assert_eq!(tb.flags, 0);
        assert_eq!(tb.positions.values(), vec![2]);

        assert!(reader.get(0).is_none());
        assert!(reader.get(encode_pointer(1 << 20, 5)).is_none());
    }

    #[test]
    fn test_entry_size_limit() {
        let mut buffer = PositionsBuffer::new();
        let longest = vec![0xFFu8; MAX_SEQUENCE_BYTES];
        let pointer = buffer.add(1, &longest).unwrap();
        assert_eq!(decode_pointer(pointer), (0, u16::MAX as usize));
        assert_eq!(buffer.len(), u16::MAX as usize);

        assert!(buffer.add(1, &vec![0xFFu8; MAX_SEQUENCE_BYTES + 1]).is_err());
        assert_eq!(buffer.len(), u16::MAX as usize);
    }
}
