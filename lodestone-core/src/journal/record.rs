//! Journal record layout
//!
//! ```text
//! doc_id:    u64      rank-free document id
//! features:  u32      HtmlFeature bits
//! size:      u32      document length in words
//! metadata:  u64      packed DocumentMetadata (rank field ignored)
//! spans:     u16 count, then [code: u8][len: u16][gamma bytes]
//! terms:     u32 count, then [term_id: u64][meta: u8][len: u16][gamma positions]
//! ```
//! All integers little-endian.

use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::directories::OwnedBytes;
use crate::model::SpanCode;
use crate::structures::GammaCodedSequence;
use crate::structures::positions::{MAX_SEQUENCE_BYTES, encode_into};
use crate::{DocId, TermId};

/// One term occurrence list as produced by keyword extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermOccurrences {
    pub term_id: TermId,
    /// Word flags byte
    pub meta: u8,
    /// Ascending positions
    pub positions: Vec<u32>,
}

/// A document ready to be appended to the journal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalDocument {
    pub doc_id: DocId,
    pub features: u32,
    pub size: u32,
    pub metadata: u64,
    /// `(code, flattened [start, end) pairs)`
    pub spans: Vec<(SpanCode, Vec<u32>)>,
    pub terms: Vec<TermOccurrences>,
}

impl JournalDocument {
    pub(super) fn write_to(&self, out: &mut Vec<u8>, workspace: &mut Vec<u8>) -> io::Result<()> {
        out.write_u64::<LittleEndian>(self.doc_id)?;
        out.write_u32::<LittleEndian>(self.features)?;
        out.write_u32::<LittleEndian>(self.size)?;
        out.write_u64::<LittleEndian>(self.metadata)?;

        out.write_u16::<LittleEndian>(checked_len(self.spans.len(), u16::MAX as usize, "spans")? as u16)?;
        for (code, ranges) in &self.spans {
            out.write_u8(*code as u8)?;
            write_sequence(out, workspace, ranges, u16::MAX as usize)?;
        }

        out.write_u32::<LittleEndian>(checked_len(self.terms.len(), u32::MAX as usize, "terms")? as u32)?;
        for term in &self.terms {
            out.write_u64::<LittleEndian>(term.term_id)?;
            out.write_u8(term.meta)?;
            write_sequence(out, workspace, &term.positions, MAX_SEQUENCE_BYTES)?;
        }
        Ok(())
    }
}

fn checked_len(len: usize, max: usize, what: &str) -> io::Result<usize> {
    if len > max {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("too many {} in journal record: {}", what, len),
        ));
    }
    Ok(len)
}

fn write_sequence(
    out: &mut Vec<u8>,
    workspace: &mut Vec<u8>,
    values: &[u32],
    max_bytes: usize,
) -> io::Result<()> {
    let encoded = encode_into(workspace, values)?;
    if encoded.len() > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("position sequence of {} bytes too long", encoded.len()),
        ));
    }
    out.write_u16::<LittleEndian>(encoded.len() as u16)?;
    out.write_all(encoded)
}

/// A term entry decoded from a journal page; positions stay gamma-coded
#[derive(Debug, Clone)]
pub struct JournalTerm {
    pub term_id: TermId,
    pub meta: u8,
    pub positions: GammaCodedSequence,
}

/// A decoded journal record, borrowing its sequences from the page buffer
#[derive(Debug, Clone)]
pub struct JournalRecord {
    pub doc_id: DocId,
    pub features: u32,
    pub size: u32,
    pub metadata: u64,
    pub spans: Vec<(SpanCode, Vec<u32>)>,
    pub terms: Vec<JournalTerm>,
}

/// Forward-only decoder over one decompressed page
pub(super) struct RecordDecoder {
    page: OwnedBytes,
    pos: usize,
}

impl RecordDecoder {
    pub(super) fn new(page: OwnedBytes) -> Self {
        Self { page, pos: 0 }
    }

    fn rest(&self) -> &[u8] {
        &self.page.as_slice()[self.pos..]
    }

    fn read_with<T>(&mut self, f: impl FnOnce(&mut &[u8]) -> io::Result<T>) -> io::Result<T> {
        let mut rest = self.rest();
        let before = rest.len();
        let value = f(&mut rest)?;
        self.pos += before - rest.len();
        Ok(value)
    }

    fn read_sequence(&mut self) -> io::Result<GammaCodedSequence> {
        let len = self.read_with(|r| r.read_u16::<LittleEndian>())? as usize;
        if len > self.rest().len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "gamma sequence runs past the end of the page",
            ));
        }
        let seq = GammaCodedSequence::from_bytes(self.page.slice(self.pos..self.pos + len));
        self.pos += len;
        Ok(seq)
    }

    /// Decode the next record, keeping only terms accepted by `filter`
    pub(super) fn next_record(
        &mut self,
        filter: Option<&dyn Fn(u8) -> bool>,
    ) -> io::Result<JournalRecord> {
        let doc_id = self.read_with(|r| r.read_u64::<LittleEndian>())?;
        let features = self.read_with(|r| r.read_u32::<LittleEndian>())?;
        let size = self.read_with(|r| r.read_u32::<LittleEndian>())?;
        let metadata = self.read_with(|r| r.read_u64::<LittleEndian>())?;

        let span_count = self.read_with(|r| r.read_u16::<LittleEndian>())?;
        let mut spans = Vec::with_capacity(span_count as usize);
        for _ in 0..span_count {
            let code = self.read_with(|r| r.read_u8())?;
            let ranges = self.read_sequence()?;
            match SpanCode::from_byte(code) {
                Some(code) => spans.push((code, ranges.values())),
                None => log::debug!("doc {:#x}: dropping unknown span code {:#x}", doc_id, code),
            }
        }

        let term_count = self.read_with(|r| r.read_u32::<LittleEndian>())?;
        let mut terms = Vec::with_capacity(term_count.min(4096) as usize);
        for _ in 0..term_count {
            let term_id = self.read_with(|r| r.read_u64::<LittleEndian>())?;
            let meta = self.read_with(|r| r.read_u8())?;
            let positions = self.read_sequence()?;
            if filter.is_none_or(|accept| accept(meta)) {
                terms.push(JournalTerm {
                    term_id,
                    meta,
                    positions,
                });
            }
        }

        Ok(JournalRecord {
            doc_id,
            features,
            size,
            metadata,
            spans,
            terms,
        })
    }
}
