//! Scenario tests over complete index builds

mod construction;

use std::path::Path;

use crate::journal::{JournalDocument, JournalWriter, TermOccurrences};
use crate::model::{DocumentMetadata, SpanCode, id};
use crate::query::EntrySource;
use crate::reverse::ReverseIndexReader;
use crate::structures::LongQueryBuffer;
use crate::{DocId, TermId};

/// One-document journal shard with the given terms at positions 1..
pub(super) fn write_single_doc_shard(dir: &Path, shard: u32, doc_id: DocId, terms: &[TermId]) {
    let doc = JournalDocument {
        doc_id,
        features: 0,
        size: 500,
        metadata: DocumentMetadata::new(2, 2012, 500, 1, 0).encode(),
        spans: vec![(SpanCode::Body, vec![0, 500])],
        terms: terms
            .iter()
            .enumerate()
            .map(|(i, &t)| TermOccurrences {
                term_id: t,
                meta: 0,
                positions: vec![i as u32 + 1],
            })
            .collect(),
    };
    let mut writer = JournalWriter::create(dir, shard).unwrap();
    writer.put(&doc).unwrap();
    writer.finish().unwrap();
}

/// Rank-encoded document ids of `term`, in index order
pub(super) fn postings(reader: &ReverseIndexReader, term: TermId) -> Vec<DocId> {
    let mut source = reader.documents(term);
    let mut buffer = LongQueryBuffer::new(128);
    let mut ids = Vec::new();
    while source.has_more() {
        buffer.reset();
        source.read(&mut buffer);
        ids.extend_from_slice(buffer.as_slice());
    }
    ids
}

pub(super) fn ordinals(ids: &[DocId]) -> Vec<u32> {
    ids.iter().map(|&d| id::ordinal(d)).collect()
}
