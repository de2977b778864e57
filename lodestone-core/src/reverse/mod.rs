//! Reverse index: term id -> sorted documents
//!
//! Two variants share one format. The full index holds every posting, with
//! a pointer into the positions file as its value. The priority index only
//! holds postings carrying a relevance flag, with the flags byte as its value.
//!
//! Files, per variant:
//! - `words`: B-tree of `(term id, offset of the term's docs B-tree)`
//! - `docs`: one B-tree per term of `(rank-encoded doc id, value)`

mod construction;
mod positions;
mod preindex;
mod reader;

pub use construction::{
    ConstructionConfig, FailurePolicy, ReverseIndexConstructor, ReverseIndexStats,
};
pub use positions::{
    PositionsBuffer, PositionsFileReader, PositionsFileWriter, TermData, decode_pointer,
    encode_pointer, rebase_pointer,
};
pub use preindex::Preindex;
pub use reader::{ReverseIndexEntrySource, ReverseIndexReader};

use serde::{Deserialize, Serialize};

use crate::model::is_priority_term;
use crate::structures::{BTreeBlockSize, BTreeContext};

pub const POSITIONS_FILE: &str = "rev-positions.dat";

/// Words-file tree: `(term id, docs offset)`
pub const WORDS_CONTEXT: BTreeContext = BTreeContext::new(5, 2, BTreeBlockSize::Bs2048);
/// Per-term docs tree: `(doc id, value)`
pub const DOCS_CONTEXT: BTreeContext = BTreeContext::new(5, 2, BTreeBlockSize::Bs256);

/// Words per posting record in preindex and docs files
pub const RECORD_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    Full,
    Priority,
}

impl IndexKind {
    pub fn name(self) -> &'static str {
        match self {
            IndexKind::Full => "full",
            IndexKind::Priority => "prio",
        }
    }

    pub fn words_file(self) -> String {
        format!("rev-{}-words.dat", self.name())
    }

    pub fn docs_file(self) -> String {
        format!("rev-{}-docs.dat", self.name())
    }

    /// Inclusion filter over a posting's word flags
    pub fn accepts(self, term_meta: u8) -> bool {
        match self {
            IndexKind::Full => true,
            IndexKind::Priority => is_priority_term(term_meta),
        }
    }
}
