//! Deterministic factor-based journals for smoke tests and benchmarks
//!
//! Document `i` (1-based) contains one term per divisor `j` of `i`, with term
//! id `j`. Even divisors carry the title flag and so also land in the
//! priority index.

use std::io;
use std::path::Path;

use super::{JournalDocument, JournalWriter, TermOccurrences};
use crate::model::{DocumentMetadata, HtmlFeature, SpanCode, WordFlag, id};

/// Documents per synthetic domain
const DOCS_PER_DOMAIN: u64 = 32;

pub fn factor_document(i: u64) -> JournalDocument {
    let domain = (i / DOCS_PER_DOMAIN) as u32 + 1;
    let size = 100 + (i as u32 % 50) * 20;
    let metadata = DocumentMetadata::new(
        (i % 10) as u8,
        2000 + (i % 25) as u16,
        size,
        (i % 7) as u8,
        0,
    )
    .encode();

    let features = match i % 4 {
        0 => 0,
        1 => HtmlFeature::Js.bit(),
        2 => HtmlFeature::Tracking.bit() | HtmlFeature::Ads.bit(),
        _ => HtmlFeature::Cookies.bit(),
    };

    let terms = (1..=i)
        .filter(|j| i % j == 0)
        .map(|j| TermOccurrences {
            term_id: j,
            meta: if j % 2 == 0 { WordFlag::Title.bit() } else { 0 },
            positions: (0..=(i / j).min(4) as u32).map(|k| k * j as u32 + 1).collect(),
        })
        .collect();

    JournalDocument {
        doc_id: id::encode_id(0, domain, i as u32),
        features,
        size,
        metadata,
        spans: vec![(SpanCode::Title, vec![0, 4]), (SpanCode::Body, vec![4, size])],
        terms,
    }
}

/// Write documents `1..=docs` split into `shards` contiguous shards.
/// Returns the number of documents written.
pub fn write_factor_journal(dir: &Path, docs: u64, shards: u32) -> io::Result<u64> {
    let shards = shards.max(1) as u64;
    let per_shard = docs.div_ceil(shards).max(1);
    let mut written = 0;
    for shard in 0..shards {
        let start = shard * per_shard + 1;
        let end = ((shard + 1) * per_shard).min(docs);
        let mut writer = JournalWriter::create(dir, shard as u32)?;
        for i in start..=end {
            writer.put(&factor_document(i))?;
        }
        written += writer.finish()?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_terms() {
        let doc = factor_document(12);
        let ids: Vec<u64> = doc.terms.iter().map(|t| t.term_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 6, 12]);
        assert_eq!(doc.terms[1].meta, WordFlag::Title.bit());
        assert_eq!(doc.terms[0].meta, 0);
        assert_eq!(id::ordinal(doc.doc_id), 12);
        assert_eq!(id::domain_id(doc.doc_id), 1);
        for term in &doc.terms {
            assert!(term.positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_shards_cover_all_documents() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(write_factor_journal(dir.path(), 100, 3).unwrap(), 100);
        assert_eq!(super::super::list_shards(dir.path()).unwrap().len(), 3);
    }
}
