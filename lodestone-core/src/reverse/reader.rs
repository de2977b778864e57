//! Read side of a finalized reverse index

use std::io;
use std::path::Path;

use super::positions::{PositionsFileReader, TermData};
use super::{DOCS_CONTEXT, IndexKind, POSITIONS_FILE, WORDS_CONTEXT};
use crate::TermId;
use crate::directories::MmapDirectory;
use crate::query::{EntrySource, QueryFilter};
use crate::structures::{BTreeReader, LongArray, LongQueryBuffer};

/// Term lookups over the words and docs files of one [`IndexKind`].
///
/// Document ids are handled in their rank-encoded form throughout.
#[derive(Debug, Clone)]
pub struct ReverseIndexReader {
    kind: IndexKind,
    words: Option<BTreeReader>,
    docs: LongArray,
    positions: PositionsFileReader,
}

impl ReverseIndexReader {
    /// Open the index in `dir`.
    ///
    /// Missing or unreadable files give an unloaded reader that finds no
    /// terms.
    pub fn open(dir: &Path, kind: IndexKind) -> Self {
        match Self::try_open(dir, kind) {
            Ok(Some(reader)) => reader,
            Ok(None) => {
                log::warn!("{} reverse index not found in {}", kind.name(), dir.display());
                Self::unloaded(kind)
            }
            Err(e) => {
                log::warn!("failed to open {} reverse index: {}", kind.name(), e);
                Self::unloaded(kind)
            }
        }
    }

    fn try_open(dir: &Path, kind: IndexKind) -> io::Result<Option<Self>> {
        let directory = MmapDirectory::new(dir);
        let (Some(words), Some(docs)) = (
            directory.open_optional(&kind.words_file())?,
            directory.open_optional(&kind.docs_file())?,
        ) else {
            return Ok(None);
        };
        let words = BTreeReader::new(LongArray::new(words)?, WORDS_CONTEXT, 0)?;
        let docs = LongArray::new(docs)?;

        let positions = match kind {
            IndexKind::Full => match directory.open_optional(POSITIONS_FILE)? {
                Some(bytes) => PositionsFileReader::from_bytes(bytes),
                None => {
                    log::warn!("positions file missing in {}", dir.display());
                    PositionsFileReader::empty()
                }
            },
            IndexKind::Priority => PositionsFileReader::empty(),
        };

        log::debug!(
            "opened {} reverse index: {} terms",
            kind.name(),
            words.num_entries()
        );
        Ok(Some(Self {
            kind,
            words: Some(words),
            docs,
            positions,
        }))
    }

    pub fn unloaded(kind: IndexKind) -> Self {
        Self {
            kind,
            words: None,
            docs: LongArray::empty(),
            positions: PositionsFileReader::empty(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.words.is_some()
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn num_terms(&self) -> usize {
        self.words.as_ref().map_or(0, BTreeReader::num_entries)
    }

    /// All term ids, ascending
    pub fn terms(&self) -> Vec<TermId> {
        self.words
            .as_ref()
            .map(|w| w.keys().collect())
            .unwrap_or_default()
    }

    fn docs_tree(&self, term: TermId) -> Option<BTreeReader> {
        let offset = self.words.as_ref()?.get(term, 1)?;
        match BTreeReader::new(self.docs.clone(), DOCS_CONTEXT, offset) {
            Ok(tree) => Some(tree),
            Err(e) => {
                log::warn!(
                    "corrupt {} docs tree for term {}: {}",
                    self.kind.name(),
                    term,
                    e
                );
                None
            }
        }
    }

    pub fn num_documents(&self, term: TermId) -> usize {
        self.docs_tree(term).map_or(0, |t| t.num_entries())
    }

    /// Entry source over the documents of `term`
    pub fn documents(&self, term: TermId) -> ReverseIndexEntrySource {
        ReverseIndexEntrySource::new(self.kind, term, self.docs_tree(term))
    }

    /// Filter keeping documents that contain `term`
    pub fn also(&self, term: TermId) -> QueryFilter {
        match self.docs_tree(term) {
            Some(tree) => QueryFilter::Retain(tree),
            None => QueryFilter::NoPass,
        }
    }

    /// Filter dropping documents that contain `term`
    pub fn not(&self, term: TermId) -> QueryFilter {
        match self.docs_tree(term) {
            Some(tree) => QueryFilter::Reject(tree),
            None => QueryFilter::LetThrough,
        }
    }

    /// Per-document flags and positions of `term`, full index only.
    /// `None` where the document does not contain the term.
    pub fn get_term_data(&self, term: TermId, doc_ids: &[u64]) -> Vec<Option<TermData>> {
        let Some(tree) = self.docs_tree(term) else {
            return vec![None; doc_ids.len()];
        };
        if self.kind != IndexKind::Full {
            return vec![None; doc_ids.len()];
        }
        tree.query_data(doc_ids, 1)
            .into_iter()
            .map(|pointer| self.positions.get(pointer))
            .collect()
    }

    /// Per-document value words of `term`; 0 where absent.
    /// In the priority index this is the term's flags byte.
    pub fn get_term_meta(&self, term: TermId, doc_ids: &[u64]) -> Vec<u64> {
        match self.docs_tree(term) {
            Some(tree) => tree.query_data(doc_ids, 1),
            None => vec![0; doc_ids.len()],
        }
    }
}

/// Streams the rank-encoded document ids of one term
#[derive(Debug)]
pub struct ReverseIndexEntrySource {
    tree: Option<BTreeReader>,
    pos: usize,
    name: String,
}

impl ReverseIndexEntrySource {
    fn new(kind: IndexKind, term: TermId, tree: Option<BTreeReader>) -> Self {
        Self {
            tree,
            pos: 0,
            name: format!("{}:{}", kind.name(), term),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.as_ref().map_or(0, BTreeReader::num_entries)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntrySource for ReverseIndexEntrySource {
    fn read(&mut self, buffer: &mut LongQueryBuffer) {
        let Some(tree) = &self.tree else {
            return;
        };
        let n = tree.num_entries();
        while self.pos < n && buffer.push(tree.key_at(self.pos)) {
            self.pos += 1;
        }
    }

    fn has_more(&self) -> bool {
        self.pos < self.len()
    }

    fn index_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{list_shards, write_factor_journal};
    use crate::model::{DomainRankings, WordFlag, id};
    use crate::reverse::{ConstructionConfig, ReverseIndexConstructor};

    fn build(dir: &Path, kind: IndexKind) -> ReverseIndexReader {
        let journal = dir.join("journal");
        write_factor_journal(&journal, 120, 3).unwrap();
        let constructor = ReverseIndexConstructor::new(ConstructionConfig {
            work_dir: dir.join("work"),
            num_threads: 2,
            ..Default::default()
        })
        .unwrap();
        constructor
            .construct(
                &list_shards(&journal).unwrap(),
                &dir.join("index"),
                kind,
                &DomainRankings::new(),
            )
            .unwrap();
        ReverseIndexReader::open(&dir.join("index"), kind)
    }

    fn drain(mut source: ReverseIndexEntrySource) -> Vec<u64> {
        let mut buffer = LongQueryBuffer::new(16);
        let mut out = Vec::new();
        while source.has_more() {
            buffer.reset();
            source.read(&mut buffer);
            out.extend(buffer.as_slice().iter().map(|&d| id::remove_rank(d)));
        }
        out
    }

    #[test]
    fn test_documents_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let reader = build(dir.path(), IndexKind::Full);
        assert!(reader.is_loaded());
        assert_eq!(reader.num_terms(), 120);
        assert_eq!(reader.num_documents(7), 17);

        let ordinals: Vec<u32> = drain(reader.documents(40)).into_iter().map(id::ordinal).collect();
        assert_eq!(ordinals, vec![40, 80, 120]);

        // Retain docs of term 40 that also contain term 3
        let mut buffer = LongQueryBuffer::new(16);
        let mut source = reader.documents(40);
        source.read(&mut buffer);
        reader.also(3).apply(&mut buffer);
        assert_eq!(buffer.len(), 1);
        assert_eq!(id::ordinal(buffer.as_slice()[0]), 120);

        let mut buffer = LongQueryBuffer::new(16);
        reader.documents(40).read(&mut buffer);
        reader.not(3).apply(&mut buffer);
        assert_eq!(buffer.len(), 2);

        assert!(matches!(reader.also(999), QueryFilter::NoPass));
        assert!(matches!(reader.not(999), QueryFilter::LetThrough));
        assert!(reader.documents(999).is_empty());
    }

    #[test]
    fn test_term_data_and_meta() {
        let dir = tempfile::tempdir().unwrap();
        let full = build(dir.path(), IndexKind::Full);
        let mut buffer = LongQueryBuffer::new(16);
        full.documents(5).read(&mut buffer);
        let ids = buffer.copy_data();

        let data = full.get_term_data(5, &ids);
        assert!(data.iter().all(Option::is_some));
        // Document 5: positions 1, 6
        let first = data[0].as_ref().unwrap();
        assert_eq!(first.positions.values(), vec![1, 6]);
        assert_eq!(first.flags, 0);
        assert!(full.get_term_data(4, &ids[..1])[0].is_none());

        let prio = ReverseIndexReader::open(&dir.path().join("index"), IndexKind::Priority);
        assert!(!prio.is_loaded());

        let dir = tempfile::tempdir().unwrap();
        let prio = build(dir.path(), IndexKind::Priority);
        let mut buffer = LongQueryBuffer::new(16);
        prio.documents(6).read(&mut buffer);
        let metas = prio.get_term_meta(6, buffer.as_slice());
        assert!(metas.iter().all(|&m| m == WordFlag::Title.bit() as u64));
    }
}
