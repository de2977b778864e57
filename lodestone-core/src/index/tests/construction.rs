use parking_lot::Mutex;

use super::{ordinals, postings, write_single_doc_shard};
use crate::forward::ForwardIndexReader;
use crate::index::{CombinedIndex, IndexMetadata, build_index};
use crate::journal::{list_shards, write_factor_journal};
use crate::model::{DocumentMetadata, DomainRankings, decode_rank, id};
use crate::reverse::{
    ConstructionConfig, FailurePolicy, IndexKind, POSITIONS_FILE, PositionsFileWriter, Preindex,
    ReverseIndexReader,
};

fn config(work: &std::path::Path) -> ConstructionConfig {
    ConstructionConfig {
        work_dir: work.to_path_buf(),
        num_threads: 3,
        sort_inline_threshold: 16,
        ..Default::default()
    }
}

#[test]
fn test_factor_index_metadata_and_ranks() {
    let journal = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_factor_journal(journal.path(), 512, 4).unwrap();

    // Doc 100 lives in domain 100 / 32 + 1
    let domain = 4;
    let rankings = DomainRankings::from_pairs([(domain, 10)]);
    let meta = build_index(journal.path(), out.path(), &rankings, config(&out.path().join("work")))
        .unwrap();
    assert_eq!(meta.num_docs, 512);
    assert_eq!(meta.full_terms, 512);
    assert_eq!(meta.prio_terms, 256);
    assert_eq!(meta.shards, 4);

    let forward = ForwardIndexReader::open(out.path());
    let doc = id::encode_id(0, domain, 100);
    let expected = DocumentMetadata::new(0, 2000, 100, 2, 0).with_rank(10).encode();
    assert_eq!(forward.doc_meta(doc), expected);
    assert_eq!(decode_rank(forward.doc_meta(doc)), 10);
    assert_eq!(forward.document_size(doc), 100);

    // Unranked domains carry rank 255 in the metadata
    let other = id::encode_id(0, 200 / 32 + 1, 200);
    assert_eq!(decode_rank(forward.doc_meta(other)), 255);

    // Term 100 is held by docs 100..=500; the ranked domain sorts first
    let full = ReverseIndexReader::open(out.path(), IndexKind::Full);
    let ids = postings(&full, 100);
    assert_eq!(ordinals(&ids), vec![100, 200, 300, 400, 500]);
    assert_eq!(id::domain_id(ids[0]), domain);
    assert_eq!(id::rank(ids[0]), 2);
    for &d in &ids[1..] {
        assert_eq!(id::rank(d), id::MAX_RANK);
        assert_eq!(id::domain_id(d), id::ordinal(d) / 32 + 1);
    }
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_single_document_preindexes_merge() {
    let journal = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let doc_a = id::encode_id(0, 1, 100);
    let doc_b = id::encode_id(0, 2, 200);
    write_single_doc_shard(journal.path(), 0, doc_a, &[50]);
    write_single_doc_shard(journal.path(), 1, doc_b, &[51]);
    let shards = list_shards(journal.path()).unwrap();
    assert_eq!(shards.len(), 2);

    let rankings = DomainRankings::new();
    let positions =
        Mutex::new(PositionsFileWriter::create(&out.path().join(POSITIONS_FILE)).unwrap());
    let build = |shard: &std::path::Path| {
        Preindex::construct(shard, IndexKind::Full, &rankings, Some(&positions), work.path(), 16)
            .unwrap()
    };
    let left = build(&shards[0]);
    let right = build(&shards[1]);

    let before = left.term_records(50).unwrap();
    assert_eq!(left.num_terms(), 1);
    assert_eq!(before.len(), 1);
    assert_eq!(id::remove_rank(before[0].0), doc_a);

    let merged = Preindex::merge(work.path(), left, right).unwrap();
    assert_eq!(merged.num_terms(), 2);
    assert_eq!(merged.num_records(), 2);
    assert_eq!(merged.term_records(50).unwrap().len(), 1);
    assert_eq!(merged.term_records(51).unwrap().len(), 1);

    merged.finalize(out.path(), IndexKind::Full).unwrap();
    positions.into_inner().finish().unwrap();

    let reader = ReverseIndexReader::open(out.path(), IndexKind::Full);
    assert_eq!(reader.num_terms(), 2);
    assert_eq!(reader.terms(), vec![50, 51]);
    let a = postings(&reader, 50);
    assert_eq!(a.len(), 1);
    assert_eq!(id::remove_rank(a[0]), doc_a);
    assert_eq!(ordinals(&postings(&reader, 51)), vec![200]);

    // Positions survive the merge
    let data = reader.get_term_data(51, &postings(&reader, 51));
    assert_eq!(data[0].as_ref().map(|d| d.positions.values()), Some(vec![1]));
}

#[test]
fn test_skipped_shard_is_dropped_everywhere() {
    let journal = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_factor_journal(journal.path(), 64, 2).unwrap();
    std::fs::write(journal.path().join("journal-0099.dat"), b"not a journal").unwrap();

    let mut cfg = config(&out.path().join("work"));
    assert!(build_index(journal.path(), out.path(), &DomainRankings::new(), cfg.clone()).is_err());

    cfg.failure_policy = FailurePolicy::SkipShard;
    let meta = build_index(journal.path(), out.path(), &DomainRankings::new(), cfg).unwrap();
    assert_eq!(meta.num_docs, 64);
    assert_eq!(meta.shards, 3);
    assert_eq!(meta.skipped_shards, 1);

    let index = CombinedIndex::open(out.path());
    assert!(index.is_loaded());
    assert_eq!(index.num_docs(), 64);
    assert_eq!(ordinals(&postings(index.full(), 32)), vec![32, 64]);
    assert_eq!(IndexMetadata::load(out.path()).unwrap(), Some(meta));
}

#[test]
fn test_empty_journal_builds_empty_index() {
    let journal = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let meta = build_index(
        journal.path(),
        out.path(),
        &DomainRankings::new(),
        config(&out.path().join("work")),
    )
    .unwrap();
    assert_eq!(meta.num_docs, 0);
    assert_eq!(meta.full_terms, 0);

    let index = CombinedIndex::open(out.path());
    assert_eq!(index.num_docs(), 0);
    assert!(postings(index.full(), 1).is_empty());
}
