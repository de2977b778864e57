//! Query representation and candidate cursors

mod compiled;
mod filter;
mod index_query;
mod search;
mod source;

pub use compiled::{CompiledQuery, CqExpression, MAX_PATHS};
pub use filter::{FilterPredicate, QueryFilter};
pub use index_query::{IndexQuery, IndexQueryBuilder};
pub use search::{Limit, QueryLimits, QueryParams, SearchCoherence, SearchQuery};
pub use source::{EntrySource, VecEntrySource};
