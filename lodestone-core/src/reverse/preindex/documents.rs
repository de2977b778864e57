//! Posting records of a preindex, partitioned by term
//!
//! Each record is `[doc id, value]`. Records are built in memory, sorted per
//! segment, then spilled to a temp file in the work directory which is
//! deleted when the preindex is dropped.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::TempPath;

use super::PreindexSegments;
use crate::directories::map_file;
use crate::reverse::RECORD_SIZE;
use crate::structures::{LongArray, write_longs};

#[derive(Debug)]
pub struct PreindexDocuments {
    data: LongArray,
    // Keeps the backing temp file alive; removed on drop
    _file: Option<TempPath>,
}

impl PreindexDocuments {
    pub fn empty() -> Self {
        Self {
            data: LongArray::empty(),
            _file: None,
        }
    }

    pub fn num_records(&self) -> u64 {
        (self.data.len() / RECORD_SIZE) as u64
    }

    /// Records `start .. start + count` as a flat word array
    pub fn records(&self, start: u64, count: u64) -> io::Result<LongArray> {
        let begin = start as usize * RECORD_SIZE;
        self.data.range(begin, begin + count as usize * RECORD_SIZE)
    }

    pub fn write_sorted(work_dir: &Path, data: &[u64]) -> io::Result<Self> {
        let mut out = SpillWriter::create(work_dir)?;
        out.write(data)?;
        out.finish()
    }
}

/// Sort each term segment of `data` by document id.
///
/// Segments of at least `inline_threshold` records are spawned onto the
/// current rayon pool; smaller ones are sorted on the calling thread.
pub fn sort_segments(data: &mut [u64], segments: &PreindexSegments, inline_threshold: usize) {
    rayon::scope(|scope| {
        let mut rest = data;
        for &count in segments.counts() {
            let (segment, tail) = std::mem::take(&mut rest).split_at_mut(count as usize * RECORD_SIZE);
            rest = tail;
            if count as usize >= inline_threshold {
                scope.spawn(move |_| sort_records(segment));
            } else {
                sort_records(segment);
            }
        }
    });
}

fn sort_records(segment: &mut [u64]) {
    let (records, remainder) = segment.as_chunks_mut::<RECORD_SIZE>();
    debug_assert!(remainder.is_empty());
    records.sort_unstable_by_key(|record| record[0]);
}

/// Sequential writer for a new preindex documents file
pub(super) struct SpillWriter {
    out: BufWriter<File>,
    path: TempPath,
    words: u64,
}

impl SpillWriter {
    pub(super) fn create(work_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(work_dir)?;
        let (file, path) = tempfile::Builder::new()
            .prefix("preindex-docs-")
            .suffix(".dat")
            .tempfile_in(work_dir)?
            .into_parts();
        Ok(Self {
            out: BufWriter::with_capacity(1 << 20, file),
            path,
            words: 0,
        })
    }

    pub(super) fn write(&mut self, words: &[u64]) -> io::Result<()> {
        write_longs(&mut self.out, words)?;
        self.words += words.len() as u64;
        Ok(())
    }

    pub(super) fn write_array(&mut self, words: &LongArray) -> io::Result<()> {
        for word in words.iter() {
            write_longs(&mut self.out, &[word])?;
        }
        self.words += words.len() as u64;
        Ok(())
    }

    pub(super) fn finish(mut self) -> io::Result<PreindexDocuments> {
        self.out.flush()?;
        drop(self.out);
        let data = LongArray::new(map_file(&self.path)?)?;
        debug_assert_eq!(data.len() as u64, self.words);
        Ok(PreindexDocuments {
            data,
            _file: Some(self.path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_sort_segments_parallel_and_inline() {
        let mut counts = FxHashMap::default();
        counts.insert(1, 3);
        counts.insert(2, 2000);
        counts.insert(3, 1);
        let segments = PreindexSegments::from_counts(counts);

        let mut data = Vec::new();
        for (_, _, count) in segments.iter() {
            for i in 0..count {
                let doc = (count - i) * 7919 % 100_003;
                data.extend([doc, doc + 1]);
            }
        }
        sort_segments(&mut data, &segments, 1024);

        for (_, start, count) in segments.iter() {
            let seg = &data[start as usize * 2..(start + count) as usize * 2];
            let (records, _) = seg.as_chunks::<2>();
            assert!(records.windows(2).all(|w| w[0][0] <= w[1][0]));
            assert!(records.iter().all(|r| r[1] == r[0] + 1));
        }
    }

    #[test]
    fn test_spill_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let docs = PreindexDocuments::write_sorted(dir.path(), &[1, 2, 3, 4]).unwrap();
        assert_eq!(docs.num_records(), 2);
        assert_eq!(docs.records(1, 1).unwrap().to_vec(), vec![3, 4]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        drop(docs);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
