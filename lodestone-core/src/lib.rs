//! Lodestone - a web-scale inverted index engine
//!
//! This library provides:
//! - Posting journals as the construction input, with zstd-compressed pages
//! - A forward index of per-document metadata, features and spans
//! - Full and priority reverse indexes built shard-parallel, stored as
//!   static B-trees over memory-mapped files
//! - Gamma-coded term positions for phrase coherence
//! - Concurrent query execution with backpressure, a time budget and
//!   cancellation
//! - BM25 and metadata-based result valuation

pub mod compression;
pub mod directories;
pub mod error;
pub mod execution;
pub mod forward;
pub mod index;
pub mod journal;
pub mod model;
pub mod query;
pub mod ranking;
pub mod reverse;
pub mod structures;

/// Document id: rank, domain and ordinal packed into 64 bits (see [`model::id`])
pub type DocId = u64;
pub type TermId = u64;

pub use error::{Error, Result};

pub use directories::{MmapDirectory, OwnedBytes};

pub use execution::{CancellationToken, ExecutionConfig, QueryExecutor};

pub use forward::{ForwardIndexConverter, ForwardIndexReader};

pub use index::{CombinedIndex, IndexMetadata, SearchResults, Searcher, build_index};

pub use journal::{JournalDocument, JournalReader, JournalWriter};

pub use model::{DocumentMetadata, DomainRankings};

pub use query::{QueryLimits, QueryParams, SearchQuery};

pub use ranking::{RankingParameters, SearchResultItem};

pub use reverse::{
    ConstructionConfig, FailurePolicy, IndexKind, ReverseIndexConstructor, ReverseIndexReader,
};
