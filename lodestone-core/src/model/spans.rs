//! Document spans: position ranges of structural regions (title, headings...)
//!
//! Serialized per document as
//! ```text
//! count: u8
//! count x [ code: u8 ][ len: u16 LE ][ gamma bytes: start0 end0 start1 end1 ... ]
//! ```
//! Ranges are half-open `[start, end)` in term-position space.

use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::directories::OwnedBytes;
use crate::structures::GammaCodedSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SpanCode {
    Title = b't',
    Heading = b'h',
    Anchor = b'a',
    Nav = b'n',
    Code = b'c',
    Body = b'b',
}

impl SpanCode {
    pub const ALL: [SpanCode; 6] = [
        SpanCode::Title,
        SpanCode::Heading,
        SpanCode::Anchor,
        SpanCode::Nav,
        SpanCode::Code,
        SpanCode::Body,
    ];

    pub fn from_byte(b: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *c as u8 == b)
    }
}

/// All ranges of one span kind within a document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSpan {
    ranges: GammaCodedSequence,
}

impl DocumentSpan {
    pub fn new(ranges: GammaCodedSequence) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let mut it = self.ranges.iter();
        std::iter::from_fn(move || Some((it.next()?, it.next()?)))
    }

    pub fn contains_position(&self, pos: u32) -> bool {
        self.ranges().any(|(start, end)| start <= pos && pos < end)
    }

    /// Number of `positions` (ascending) that fall inside any range
    pub fn count_intersections(&self, positions: &[u32]) -> usize {
        let mut count = 0;
        let mut i = 0;
        for (start, end) in self.ranges() {
            while i < positions.len() && positions[i] < start {
                i += 1;
            }
            while i < positions.len() && positions[i] < end {
                count += 1;
                i += 1;
            }
            if i == positions.len() {
                break;
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.ranges.value_count() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-kind intersection counts for one term's positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanIntersections {
    pub title: usize,
    pub heading: usize,
    pub anchor: usize,
    pub nav: usize,
    pub code: usize,
    pub body: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSpans {
    spans: Vec<(SpanCode, DocumentSpan)>,
}

impl DocumentSpans {
    pub fn get(&self, code: SpanCode) -> Option<&DocumentSpan> {
        self.spans.iter().find(|(c, _)| *c == code).map(|(_, s)| s)
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn count_intersections(&self, positions: &[u32]) -> SpanIntersections {
        let count = |code| {
            self.get(code)
                .map(|s| s.count_intersections(positions))
                .unwrap_or(0)
        };
        SpanIntersections {
            title: count(SpanCode::Title),
            heading: count(SpanCode::Heading),
            anchor: count(SpanCode::Anchor),
            nav: count(SpanCode::Nav),
            code: count(SpanCode::Code),
            body: count(SpanCode::Body),
        }
    }

    /// Serialize `(code, flattened [start, end) pairs)` groups
    pub fn write<W: Write + ?Sized>(
        out: &mut W,
        spans: &[(SpanCode, Vec<u32>)],
        workspace: &mut Vec<u8>,
    ) -> io::Result<usize> {
        if spans.len() > u8::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} span kinds in one document", spans.len()),
            ));
        }
        out.write_u8(spans.len() as u8)?;
        let mut written = 1;
        for (code, ranges) in spans {
            if ranges.len() % 2 != 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("span {:?} has an unpaired boundary", code),
                ));
            }
            let encoded = crate::structures::positions::encode_into(workspace, ranges)?;
            let len = u16::try_from(encoded.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "span sequence too long")
            })?;
            out.write_u8(*code as u8)?;
            out.write_u16::<LittleEndian>(len)?;
            out.write_all(encoded)?;
            written += 3 + encoded.len();
        }
        Ok(written)
    }

    pub fn read(bytes: &OwnedBytes) -> io::Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        let mut cursor = bytes.as_slice();
        let count = cursor.read_u8()?;
        let mut spans = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let code = cursor.read_u8()?;
            let len = cursor.read_u16::<LittleEndian>()? as usize;
            let start = bytes.len() - cursor.len();
            if len > cursor.len() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated document span",
                ));
            }
            cursor = &cursor[len..];
            let Some(code) = SpanCode::from_byte(code) else {
                log::debug!("skipping unknown span code {:#x}", code);
                continue;
            };
            let seq = GammaCodedSequence::from_bytes(bytes.slice(start..start + len));
            spans.push((code, DocumentSpan::new(seq)));
        }
        Ok(Self { spans })
    }
}
