use std::io;
use std::path::Path;

use super::{
    DOC_DATA_FILE, DOC_IDS_FILE, ENTRY_SIZE, FEATURES_OFFSET, METADATA_OFFSET, SPANS_FILE,
    SPANS_OFFSET, decode_spans_ref,
};
use crate::DocId;
use crate::directories::{MmapDirectory, OwnedBytes};
use crate::model::{DocumentSpans, id};
use crate::structures::LongArray;

struct ForwardFiles {
    ids: LongArray,
    data: LongArray,
    spans: OwnedBytes,
}

/// Read side of the forward index.
///
/// Lookups for absent documents return zero values; use
/// [`has_document`](Self::has_document) to tell "unknown" from a genuine
/// zero. A reader over missing or inconsistent files reports itself not
/// loaded and answers every lookup with zeros.
pub struct ForwardIndexReader {
    files: Option<ForwardFiles>,
}

impl ForwardIndexReader {
    pub fn open(dir: &Path) -> Self {
        match Self::load(&MmapDirectory::new(dir)) {
            Ok(Some(files)) => Self { files: Some(files) },
            Ok(None) => {
                log::warn!("forward index files missing in {}, not loaded", dir.display());
                Self::unloaded()
            }
            Err(e) => {
                log::warn!("forward index in {} unreadable, not loaded: {}", dir.display(), e);
                Self::unloaded()
            }
        }
    }

    pub fn unloaded() -> Self {
        Self { files: None }
    }

    fn load(dir: &MmapDirectory) -> io::Result<Option<ForwardFiles>> {
        let (Some(ids), Some(data), Some(spans)) = (
            dir.open_optional(DOC_IDS_FILE)?,
            dir.open_optional(DOC_DATA_FILE)?,
            dir.open_optional(SPANS_FILE)?,
        ) else {
            return Ok(None);
        };
        let ids = LongArray::new(ids)?;
        let data = LongArray::new(data)?;
        if data.len() != ids.len() * ENTRY_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} ids but {} data words (expected {})",
                    ids.len(),
                    data.len(),
                    ids.len() * ENTRY_SIZE
                ),
            ));
        }
        Ok(Some(ForwardFiles { ids, data, spans }))
    }

    pub fn is_loaded(&self) -> bool {
        self.files.is_some()
    }

    pub fn num_docs(&self) -> usize {
        self.files.as_ref().map_or(0, |f| f.ids.len())
    }

    /// Slot of `doc_id` in the data array
    fn doc_index(&self, doc_id: DocId) -> Option<(&ForwardFiles, usize)> {
        debug_assert!(
            !id::has_rank(doc_id),
            "forward index lookups take rank-free ids, got {:#x}",
            doc_id
        );
        let files = self.files.as_ref()?;
        let idx = files.ids.binary_search_n(doc_id, 0, files.ids.len(), 1).ok()?;
        Some((files, idx))
    }

    fn word(&self, doc_id: DocId, offset: usize) -> u64 {
        self.doc_index(doc_id)
            .map_or(0, |(files, idx)| files.data.get(idx * ENTRY_SIZE + offset))
    }

    pub fn has_document(&self, doc_id: DocId) -> bool {
        self.doc_index(doc_id).is_some()
    }

    pub fn doc_meta(&self, doc_id: DocId) -> u64 {
        self.word(doc_id, METADATA_OFFSET)
    }

    pub fn html_features(&self, doc_id: DocId) -> u32 {
        self.word(doc_id, FEATURES_OFFSET) as u32
    }

    /// Document length in words
    pub fn document_size(&self, doc_id: DocId) -> u32 {
        (self.word(doc_id, FEATURES_OFFSET) >> 32) as u32
    }

    pub fn document_spans(&self, doc_id: DocId) -> DocumentSpans {
        let Some((files, idx)) = self.doc_index(doc_id) else {
            return DocumentSpans::default();
        };
        let (offset, size) = decode_spans_ref(files.data.get(idx * ENTRY_SIZE + SPANS_OFFSET));
        let (start, end) = (offset as usize, (offset + size) as usize);
        if end > files.spans.len() {
            log::warn!("spans of document {:#x} point past the end of the spans file", doc_id);
            return DocumentSpans::default();
        }
        DocumentSpans::read(&files.spans.slice(start..end)).unwrap_or_else(|e| {
            log::warn!("corrupt spans for document {:#x}: {}", doc_id, e);
            DocumentSpans::default()
        })
    }

    /// All indexed document ids, ascending
    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.files.iter().flat_map(|f| f.ids.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::ForwardIndexConverter;
    use crate::journal::{JournalDocument, JournalWriter, list_shards};
    use crate::model::{DocumentMetadata, DomainRankings, SpanCode, decode_rank};

    fn document(domain: u32, ordinal: u32, quality: u8) -> JournalDocument {
        JournalDocument {
            doc_id: id::encode_id(0, domain, ordinal),
            features: 0x5,
            size: 1234,
            metadata: DocumentMetadata::new(quality, 2015, 1234, 2, 0).encode(),
            spans: vec![(SpanCode::Title, vec![0, 5])],
            terms: Vec::new(),
        }
    }

    fn build(docs: &[JournalDocument]) -> (tempfile::TempDir, ForwardIndexReader) {
        let journal = tempfile::tempdir().unwrap();
        let mut writer = JournalWriter::create(journal.path(), 0).unwrap();
        for d in docs {
            writer.put(d).unwrap();
        }
        writer.finish().unwrap();

        let out = tempfile::tempdir().unwrap();
        let rankings = DomainRankings::from_pairs([(3, 40)]);
        ForwardIndexConverter::new(list_shards(journal.path()).unwrap(), out.path(), rankings)
            .convert()
            .unwrap();
        let reader = ForwardIndexReader::open(out.path());
        (out, reader)
    }

    #[test]
    fn test_lookup_unsorted_input() {
        let (_dir, reader) = build(&[document(3, 9, 4), document(1, 2, 7), document(3, 1, 1)]);
        assert!(reader.is_loaded());
        assert_eq!(reader.num_docs(), 3);

        let ids: Vec<_> = reader.doc_ids().collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let doc = id::encode_id(0, 3, 9);
        let meta = DocumentMetadata::decode(reader.doc_meta(doc));
        assert_eq!(meta.quality, 4);
        assert_eq!(meta.year(), 2015);
        assert_eq!(decode_rank(reader.doc_meta(doc)), 40);
        assert_eq!(decode_rank(reader.doc_meta(id::encode_id(0, 1, 2))), 255);
        assert_eq!(reader.html_features(doc), 0x5);
        assert_eq!(reader.document_size(doc), 1234);
        let spans = reader.document_spans(doc);
        assert!(spans.get(SpanCode::Title).unwrap().contains_position(4));
    }

    #[test]
    fn test_absent_document_is_zero() {
        let (_dir, reader) = build(&[document(1, 1, 3)]);
        let absent = id::encode_id(0, 77, 1);
        assert!(!reader.has_document(absent));
        assert_eq!(reader.doc_meta(absent), 0);
        assert_eq!(reader.html_features(absent), 0);
        assert_eq!(reader.document_size(absent), 0);
        assert!(reader.document_spans(absent).is_empty());
    }

    #[test]
    fn test_missing_files_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DOC_IDS_FILE), [0u8; 8]).unwrap();
        let reader = ForwardIndexReader::open(dir.path());
        assert!(!reader.is_loaded());
        assert_eq!(reader.doc_meta(1), 0);
        assert_eq!(reader.num_docs(), 0);
    }

    #[test]
    fn test_mismatched_files_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DOC_IDS_FILE), [0u8; 16]).unwrap();
        std::fs::write(dir.path().join(DOC_DATA_FILE), [0u8; 24]).unwrap();
        std::fs::write(dir.path().join(SPANS_FILE), b"").unwrap();
        assert!(!ForwardIndexReader::open(dir.path()).is_loaded());
    }

    #[test]
    fn test_duplicate_ids_last_wins() {
        let (_dir, reader) = build(&[document(2, 2, 1), document(2, 2, 9)]);
        assert_eq!(reader.num_docs(), 1);
        let meta = DocumentMetadata::decode(reader.doc_meta(id::encode_id(0, 2, 2)));
        assert_eq!(meta.quality, 9);
    }
}
