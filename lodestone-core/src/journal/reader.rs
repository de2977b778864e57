use std::io;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};

use super::record::{JournalRecord, RecordDecoder};
use super::{JOURNAL_MAGIC, PAGE_TARGET_BYTES};
use crate::compression::decompress;
use crate::directories::{OwnedBytes, map_file};

type TermFilter = Box<dyn Fn(u8) -> bool + Send + Sync>;

/// Forward-only reader over one journal shard.
///
/// Yields records page by page; an optional term filter drops term entries
/// by their meta byte while decoding.
pub struct JournalReader {
    path: PathBuf,
    data: OwnedBytes,
    offset: usize,
    page: Option<(RecordDecoder, u32)>,
    filter: Option<TermFilter>,
}

impl JournalReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        let data = map_file(path)?;
        if data.len() < JOURNAL_MAGIC.len() || &data[..JOURNAL_MAGIC.len()] != JOURNAL_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not a journal shard", path.display()),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            data,
            offset: JOURNAL_MAGIC.len(),
            page: None,
            filter: None,
        })
    }

    /// Keep only term entries whose meta byte passes `filter`
    pub fn with_term_filter(mut self, filter: impl Fn(u8) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, what: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {} at byte {}", self.path.display(), what, self.offset),
        )
    }

    /// Decompress the next page, or report end of shard
    fn load_page(&mut self) -> io::Result<bool> {
        let remaining = self.data.len() - self.offset;
        if remaining == 0 {
            return Ok(false);
        }
        if remaining < 8 {
            return Err(self.corrupt("truncated page header"));
        }
        let header = &self.data[self.offset..self.offset + 8];
        let records = LittleEndian::read_u32(&header[0..4]);
        let packed_len = LittleEndian::read_u32(&header[4..8]) as usize;
        let body_start = self.offset + 8;
        if packed_len > self.data.len() - body_start {
            return Err(self.corrupt("truncated page body"));
        }
        let page = decompress(
            &self.data[body_start..body_start + packed_len],
            PAGE_TARGET_BYTES * 2,
        )?;
        self.offset = body_start + packed_len;
        self.page = Some((RecordDecoder::new(OwnedBytes::new(page)), records));
        Ok(true)
    }

    fn next_record(&mut self) -> io::Result<Option<JournalRecord>> {
        loop {
            if let Some((decoder, remaining)) = self.page.as_mut()
                && *remaining > 0
            {
                *remaining -= 1;
                let filter = self.filter.as_deref().map(|f| f as &dyn Fn(u8) -> bool);
                return decoder.next_record(filter).map(Some);
            }
            self.page = None;
            if !self.load_page()? {
                return Ok(None);
            }
        }
    }
}

impl Iterator for JournalReader {
    type Item = io::Result<JournalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                // Stop after the first error
                self.offset = self.data.len();
                self.page = None;
                Some(Err(e))
            }
        }
    }
}
