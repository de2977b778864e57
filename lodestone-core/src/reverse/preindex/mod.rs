//! Intermediate reverse index for one or more journal shards
//!
//! Built in two passes over a shard (count, then fill), sorted per term,
//! reduced pairwise with [`Preindex::merge`], and finally written out as
//! B-trees by [`Preindex::finalize`].

mod documents;
mod segments;

use std::path::Path;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

pub use documents::{PreindexDocuments, sort_segments};
pub use segments::PreindexSegments;

use documents::SpillWriter;

use super::positions::{PositionsBuffer, PositionsFileWriter, rebase_pointer};
use super::{DOCS_CONTEXT, IndexKind, RECORD_SIZE, WORDS_CONTEXT};
use crate::directories::MmapDirectory;
use crate::error::{Error, Result};
use crate::journal::JournalReader;
use crate::model::{DomainRankings, id};
use crate::structures::{BTreeWriter, LongArray};
use crate::{DocId, TermId};

#[derive(Debug)]
pub struct Preindex {
    segments: PreindexSegments,
    documents: PreindexDocuments,
}

impl Preindex {
    pub fn empty() -> Self {
        Self {
            segments: PreindexSegments::default(),
            documents: PreindexDocuments::empty(),
        }
    }

    /// Build the preindex of one journal shard.
    ///
    /// `positions` must be given for the full index; postings then store a
    /// pointer to their positions entry. A shard's entries are appended to
    /// the file only once the whole shard has been read.
    pub fn construct(
        shard: &Path,
        kind: IndexKind,
        rankings: &DomainRankings,
        positions: Option<&Mutex<PositionsFileWriter>>,
        work_dir: &Path,
        sort_inline_threshold: usize,
    ) -> Result<Self> {
        if kind == IndexKind::Full && positions.is_none() {
            return Err(Error::Internal(
                "full index construction requires a positions file".into(),
            ));
        }

        // Pass 1: count postings per term
        let mut counts: FxHashMap<TermId, u64> = FxHashMap::default();
        for record in JournalReader::open(shard)?.with_term_filter(move |m| kind.accepts(m)) {
            for term in record?.terms {
                *counts.entry(term.term_id).or_default() += 1;
            }
        }
        let segments = PreindexSegments::from_counts(counts);
        let total = segments.total_records();
        log::debug!(
            "{} preindex {}: {} terms, {} postings",
            kind.name(),
            shard.display(),
            segments.num_words(),
            total
        );

        // Pass 2: fill each term's segment through its write cursor
        let mut data = vec![0u64; total as usize * RECORD_SIZE];
        let mut cursors = segments.offset_map();
        let mut staged = positions.map(|_| PositionsBuffer::new());
        for record in JournalReader::open(shard)?.with_term_filter(move |m| kind.accepts(m)) {
            let record = record?;
            let doc_id = id::add_rank(rankings.sort_ranking(record.doc_id), record.doc_id);

            for term in &record.terms {
                let cursor = cursors.get_mut(&term.term_id).ok_or_else(|| {
                    Error::Corruption(format!(
                        "term {} of {} not seen in counting pass",
                        term.term_id,
                        shard.display()
                    ))
                })?;
                let slot = *cursor as usize * RECORD_SIZE;
                if slot + RECORD_SIZE > data.len() {
                    return Err(Error::Corruption(format!(
                        "term {} overflows its segment in {}",
                        term.term_id,
                        shard.display()
                    )));
                }
                let value = match staged.as_mut() {
                    Some(buffer) => buffer.add(term.meta, term.positions.bytes())?,
                    None => term.meta as u64,
                };
                data[slot] = doc_id;
                data[slot + 1] = value;
                *cursor += 1;
            }
        }

        if let (Some(writer), Some(buffer)) = (positions, staged.as_ref()) {
            let base = writer.lock().append(buffer)?;
            for value in data.iter_mut().skip(1).step_by(RECORD_SIZE) {
                *value = rebase_pointer(*value, base);
            }
        }

        // Sort each segment by document id
        sort_segments(&mut data, &segments, sort_inline_threshold);

        let documents = PreindexDocuments::write_sorted(work_dir, &data)?;
        Ok(Self {
            segments,
            documents,
        })
    }

    pub fn num_terms(&self) -> usize {
        self.segments.num_words()
    }

    pub fn num_records(&self) -> u64 {
        self.documents.num_records()
    }

    pub fn segments(&self) -> &PreindexSegments {
        &self.segments
    }

    /// Records of one term, in document order
    pub fn term_records(&self, term: TermId) -> Result<Vec<(DocId, u64)>> {
        let Some((start, count)) = self.segments.find(term) else {
            return Ok(Vec::new());
        };
        let records = self.documents.records(start, count)?.to_vec();
        let (pairs, _) = records.as_chunks::<RECORD_SIZE>();
        Ok(pairs.iter().map(|r| (r[0], r[1])).collect())
    }

    /// Merge two preindexes into a new one, consuming both.
    ///
    /// Term order and per-term document order are preserved. A document
    /// present under the same term on both sides is kept once, with the
    /// left side's value.
    pub fn merge(work_dir: &Path, left: Preindex, right: Preindex) -> Result<Preindex> {
        let mut out = SpillWriter::create(work_dir)?;
        let mut word_ids = Vec::with_capacity(left.num_terms().max(right.num_terms()));
        let mut counts = Vec::with_capacity(word_ids.capacity());

        let mut l = left.segments.iter().peekable();
        let mut r = right.segments.iter().peekable();
        loop {
            let (word, count) = match (l.peek().copied(), r.peek().copied()) {
                (None, None) => break,
                (Some((lw, ls, lc)), Some((rw, _, _))) if lw < rw => {
                    l.next();
                    out.write_array(&left.documents.records(ls, lc)?)?;
                    (lw, lc)
                }
                (Some((lw, _, _)), Some((rw, rs, rc))) if rw < lw => {
                    r.next();
                    out.write_array(&right.documents.records(rs, rc)?)?;
                    (rw, rc)
                }
                (Some((lw, ls, lc)), Some((_, rs, rc))) => {
                    l.next();
                    r.next();
                    let written = merge_segments(
                        &mut out,
                        &left.documents.records(ls, lc)?,
                        &right.documents.records(rs, rc)?,
                    )?;
                    (lw, written)
                }
                (Some((lw, ls, lc)), None) => {
                    l.next();
                    out.write_array(&left.documents.records(ls, lc)?)?;
                    (lw, lc)
                }
                (None, Some((rw, rs, rc))) => {
                    r.next();
                    out.write_array(&right.documents.records(rs, rc)?)?;
                    (rw, rc)
                }
            };
            word_ids.push(word);
            counts.push(count);
        }

        let merged = Preindex {
            segments: PreindexSegments::from_parts(word_ids, counts),
            documents: out.finish()?,
        };
        log::debug!(
            "merged preindexes ({} + {} postings) into {} terms, {} postings",
            left.num_records(),
            right.num_records(),
            merged.num_terms(),
            merged.num_records()
        );
        Ok(merged)
    }

    /// Write the words and docs files of `kind` into `out_dir`
    pub fn finalize(&self, out_dir: &Path, kind: IndexKind) -> Result<()> {
        let dir = MmapDirectory::new(out_dir);

        let mut docs_out = dir.streaming_writer(&kind.docs_file())?;
        let mut docs_writer = BTreeWriter::new(DOCS_CONTEXT);
        let mut word_entries = Vec::with_capacity(self.num_terms() * 2);
        let mut docs_offset = 0u64;
        for (word, start, count) in self.segments.iter() {
            let records = self.documents.records(start, count)?.to_vec();
            let written = docs_writer.write(&mut docs_out, docs_offset, &records)?;
            word_entries.push(word);
            word_entries.push(docs_offset);
            docs_offset += written as u64;
        }
        docs_out.finish()?;

        let mut words_out = dir.streaming_writer(&kind.words_file())?;
        BTreeWriter::new(WORDS_CONTEXT).write(&mut words_out, 0, &word_entries)?;
        words_out.finish()?;

        log::info!(
            "{} index finalized: {} terms, {} postings, {} docs words",
            kind.name(),
            self.num_terms(),
            self.num_records(),
            docs_offset
        );
        Ok(())
    }
}

/// Merge-join two sorted record runs, dropping right-side duplicates
fn merge_segments(out: &mut SpillWriter, left: &LongArray, right: &LongArray) -> Result<u64> {
    let (ln, rn) = (left.len() / RECORD_SIZE, right.len() / RECORD_SIZE);
    let (mut i, mut j) = (0, 0);
    let mut written = 0u64;
    while i < ln || j < rn {
        let take_left = if i == ln {
            false
        } else if j == rn {
            true
        } else {
            let (ld, rd) = (left.get(i * RECORD_SIZE), right.get(j * RECORD_SIZE));
            if ld == rd {
                j += 1;
            }
            ld <= rd
        };
        let (src, idx) = if take_left {
            i += 1;
            (left, i - 1)
        } else {
            j += 1;
            (right, j - 1)
        };
        out.write(&[src.get(idx * RECORD_SIZE), src.get(idx * RECORD_SIZE + 1)])?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{JournalDocument, JournalWriter, TermOccurrences, shard_file_name};
    use crate::model::WordFlag;

    fn write_shard(dir: &Path, shard: u32, docs: &[(DocId, Vec<(TermId, u8)>)]) -> std::path::PathBuf {
        let mut writer = JournalWriter::create(dir, shard).unwrap();
        for (doc_id, terms) in docs {
            writer
                .put(&JournalDocument {
                    doc_id: *doc_id,
                    terms: terms
                        .iter()
                        .map(|&(term_id, meta)| TermOccurrences {
                            term_id,
                            meta,
                            positions: vec![1, 2],
                        })
                        .collect(),
                    ..Default::default()
                })
                .unwrap();
        }
        writer.finish().unwrap();
        dir.join(shard_file_name(shard))
    }

    fn priority(shard: &Path, work: &Path) -> Preindex {
        Preindex::construct(
            shard,
            IndexKind::Priority,
            &DomainRankings::new(),
            None,
            work,
            1024,
        )
        .unwrap()
    }

    #[test]
    fn test_construct_partitions_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let title = WordFlag::Title.bit();
        let shard = write_shard(
            dir.path(),
            0,
            &[
                (id::encode_id(0, 3, 1), vec![(10, title), (20, 0)]),
                (id::encode_id(0, 1, 1), vec![(10, title)]),
                (id::encode_id(0, 2, 5), vec![(20, title), (10, title)]),
            ],
        );
        let pre = priority(&shard, dir.path());
        assert_eq!(pre.num_terms(), 2);
        assert_eq!(pre.num_records(), 4);

        let docs: Vec<_> = pre.term_records(10).unwrap().into_iter().map(|r| id::remove_rank(r.0)).collect();
        assert_eq!(
            docs,
            vec![id::encode_id(0, 1, 1), id::encode_id(0, 2, 5), id::encode_id(0, 3, 1)]
        );
        let t20 = pre.term_records(20).unwrap();
        assert_eq!(t20.len(), 1);
        assert_eq!(t20[0].1, title as u64);
    }

    #[test]
    fn test_full_requires_positions() {
        let dir = tempfile::tempdir().unwrap();
        let shard = write_shard(dir.path(), 0, &[(1, vec![(1, 0)])]);
        let result = Preindex::construct(
            &shard,
            IndexKind::Full,
            &DomainRankings::new(),
            None,
            dir.path(),
            1024,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_dedups_left_wins() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_shard(dir.path(), 0, &[(5, vec![(1, 1), (2, 1)]), (9, vec![(1, 1)])]);
        let b = write_shard(dir.path(), 1, &[(5, vec![(1, 2)]), (7, vec![(1, 2), (3, 2)])]);
        let merged = Preindex::merge(
            dir.path(),
            priority(&a, dir.path()),
            priority(&b, dir.path()),
        )
        .unwrap();

        assert_eq!(merged.segments().word_ids(), &[1, 2, 3]);
        assert_eq!(merged.segments().counts(), &[3, 1, 1]);
        let t1: Vec<_> = merged
            .term_records(1)
            .unwrap()
            .into_iter()
            .map(|(d, v)| (id::remove_rank(d), v))
            .collect();
        assert_eq!(t1, vec![(5, 1), (7, 2), (9, 1)]);
    }
}
