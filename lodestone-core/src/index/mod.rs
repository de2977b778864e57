//! Index - a built index directory, searchable as a whole
//!
//! - [`build_index`] turns a journal directory into forward, full and
//!   priority index files
//! - [`CombinedIndex`] opens those files together and builds cursor sets
//! - [`Searcher`] executes and ranks queries over a [`CombinedIndex`]

mod builder;
mod combined;
mod metadata;
mod searcher;

pub use builder::build_index;
pub use combined::CombinedIndex;
pub use metadata::{INDEX_META_FILENAME, IndexMetadata};
pub use searcher::{SearchResults, Searcher};

#[cfg(test)]
mod tests;
