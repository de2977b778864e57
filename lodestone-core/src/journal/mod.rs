//! Posting journal: the append-only input to index construction
//!
//! A journal is a directory of shard files named `journal-NNNN.dat`. Each
//! shard is the magic `LJN1` followed by pages:
//! ```text
//! [record count: u32][compressed length: u32][zstd body]
//! ```
//! The decompressed body is a run of records, see [`record`].

mod reader;
pub mod record;
mod synthetic;
mod writer;

use std::io;
use std::path::{Path, PathBuf};

pub use reader::JournalReader;
pub use record::{JournalDocument, JournalRecord, JournalTerm, TermOccurrences};
pub use synthetic::{factor_document, write_factor_journal};
pub use writer::JournalWriter;

use crate::directories::MmapDirectory;

pub const JOURNAL_MAGIC: &[u8; 4] = b"LJN1";

/// Uncompressed size at which a page is flushed
pub const PAGE_TARGET_BYTES: usize = 256 * 1024;

const SHARD_PREFIX: &str = "journal-";
const SHARD_SUFFIX: &str = ".dat";

pub fn shard_file_name(shard: u32) -> String {
    format!("{SHARD_PREFIX}{shard:04}{SHARD_SUFFIX}")
}

/// Shard files of the journal in `dir`, in shard order.
///
/// A missing directory is an empty journal.
pub fn list_shards(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let files = MmapDirectory::new(dir).list_files()?;
    Ok(files
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(SHARD_PREFIX) && n.ends_with(SHARD_SUFFIX))
        })
        .collect())
}
