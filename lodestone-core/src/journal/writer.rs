use std::io::{self, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::record::JournalDocument;
use super::{JOURNAL_MAGIC, PAGE_TARGET_BYTES, shard_file_name};
use crate::compression::{CompressionLevel, compress};
use crate::directories::{MmapDirectory, StreamingWriter};

/// Appends documents to one journal shard, one compressed page at a time
pub struct JournalWriter {
    out: StreamingWriter,
    page: Vec<u8>,
    page_records: u32,
    workspace: Vec<u8>,
    level: CompressionLevel,
    documents: u64,
}

impl JournalWriter {
    /// Create shard number `shard` in `dir`; the file appears on `finish`
    pub fn create(dir: &Path, shard: u32) -> io::Result<Self> {
        let directory = MmapDirectory::new(dir);
        let mut out = directory.streaming_writer(&shard_file_name(shard))?;
        out.write_all(JOURNAL_MAGIC)?;
        Ok(Self {
            out,
            page: Vec::with_capacity(PAGE_TARGET_BYTES + 4096),
            page_records: 0,
            workspace: Vec::new(),
            level: CompressionLevel::default(),
            documents: 0,
        })
    }

    pub fn with_compression(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    pub fn put(&mut self, doc: &JournalDocument) -> io::Result<()> {
        doc.write_to(&mut self.page, &mut self.workspace)?;
        self.page_records += 1;
        self.documents += 1;
        if self.page.len() >= PAGE_TARGET_BYTES {
            self.flush_page()?;
        }
        Ok(())
    }

    pub fn documents(&self) -> u64 {
        self.documents
    }

    fn flush_page(&mut self) -> io::Result<()> {
        if self.page_records == 0 {
            return Ok(());
        }
        let packed = compress(&self.page, self.level)?;
        self.out.write_u32::<LittleEndian>(self.page_records)?;
        self.out.write_u32::<LittleEndian>(packed.len() as u32)?;
        self.out.write_all(&packed)?;
        self.page.clear();
        self.page_records = 0;
        Ok(())
    }

    /// Flush the last page and publish the shard; returns the document count
    pub fn finish(mut self) -> io::Result<u64> {
        self.flush_page()?;
        self.out.finish()?;
        Ok(self.documents)
    }
}
