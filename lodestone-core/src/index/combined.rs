//! The forward index and both reverse indexes of one index directory,
//! opened together, plus query construction over them

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::metadata::IndexMetadata;
use crate::TermId;
use crate::forward::ForwardIndexReader;
use crate::model::id;
use crate::query::{IndexQuery, IndexQueryBuilder, QueryFilter, QueryParams, SearchQuery};
use crate::reverse::{IndexKind, ReverseIndexReader};

/// Read-only view over a built index directory.
///
/// Missing files are not an error: the affected reader reports itself as
/// not loaded and every lookup against it comes back empty. Unreadable
/// build metadata is logged and treated as absent.
pub struct CombinedIndex {
    dir: PathBuf,
    forward: Arc<ForwardIndexReader>,
    full: ReverseIndexReader,
    prio: ReverseIndexReader,
    metadata: Option<IndexMetadata>,
}

impl CombinedIndex {
    pub fn open(dir: &Path) -> Self {
        let forward = ForwardIndexReader::open(dir);
        let full = ReverseIndexReader::open(dir, IndexKind::Full);
        let prio = ReverseIndexReader::open(dir, IndexKind::Priority);
        let metadata = IndexMetadata::load(dir).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable index metadata in {}: {}", dir.display(), e);
            None
        });
        log::info!(
            "opened index {}: {} documents, {} full terms, {} priority terms",
            dir.display(),
            forward.num_docs(),
            full.num_terms(),
            prio.num_terms()
        );
        Self {
            dir: dir.to_path_buf(),
            forward: Arc::new(forward),
            full,
            prio,
            metadata,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn forward(&self) -> &ForwardIndexReader {
        &self.forward
    }

    pub fn full(&self) -> &ReverseIndexReader {
        &self.full
    }

    pub fn prio(&self) -> &ReverseIndexReader {
        &self.prio
    }

    pub fn metadata(&self) -> Option<&IndexMetadata> {
        self.metadata.as_ref()
    }

    /// Whether every index file was found
    pub fn is_loaded(&self) -> bool {
        self.forward.is_loaded() && self.full.is_loaded() && self.prio.is_loaded()
    }

    pub fn num_docs(&self) -> usize {
        self.forward.num_docs()
    }

    /// Build the cursor sets of `query`: for every include path, one query
    /// over the priority index and one over the full index.
    ///
    /// Priority queries come first so that documents carrying the terms as
    /// signals are evaluated before the budget runs out.
    pub fn create_queries(&self, query: &SearchQuery, params: &QueryParams) -> Vec<IndexQuery> {
        let paths = self.term_paths(query);
        let mut prio_queries = Vec::with_capacity(paths.len());
        let mut full_queries = Vec::with_capacity(paths.len());

        for terms in &paths {
            let mut prio = IndexQueryBuilder::new();
            for &t in terms.iter().chain(&query.priority) {
                prio = prio.source(self.prio.documents(t));
            }
            let prio = prio.filters(terms.iter().map(|&t| self.full.also(t)));
            prio_queries.push(self.common_filters(prio, query, params).build());

            // Drive the full query with the rarest term
            let mut by_rarity = terms.clone();
            by_rarity.sort_by_key(|&t| self.full.num_documents(t));
            let Some((&rarest, rest)) = by_rarity.split_first() else {
                continue;
            };
            let full = IndexQueryBuilder::new()
                .source(self.full.documents(rarest))
                .filters(rest.iter().map(|&t| self.full.also(t)));
            full_queries.push(self.common_filters(full, query, params).build());
        }

        prio_queries.extend(full_queries);
        prio_queries.retain(IndexQuery::has_more);
        prio_queries
    }

    /// Distinct term sets of the include expression
    fn term_paths(&self, query: &SearchQuery) -> Vec<Vec<TermId>> {
        let data = query.compiled.data();
        let mut paths: Vec<Vec<TermId>> = query
            .compiled
            .paths()
            .into_iter()
            .map(|path| {
                let mut terms: Vec<TermId> = path.iter().map(|&i| data[i]).collect();
                terms.sort_unstable();
                terms.dedup();
                terms
            })
            .filter(|terms| !terms.is_empty())
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    fn common_filters(
        &self,
        builder: IndexQueryBuilder,
        query: &SearchQuery,
        params: &QueryParams,
    ) -> IndexQueryBuilder {
        let builder = builder
            .filters(query.exclude.iter().map(|&t| self.full.not(t)))
            .filters(query.advice.iter().map(|&t| self.full.also(t)));
        match self.metadata_filter(params) {
            Some(filter) => builder.filter(filter),
            None => builder,
        }
    }

    /// Predicate over forward-index metadata; `None` when `params` restricts nothing
    fn metadata_filter(&self, params: &QueryParams) -> Option<QueryFilter> {
        if params.is_unrestricted() {
            return None;
        }
        let forward = self.forward.clone();
        let params = params.clone();
        Some(QueryFilter::predicate(move |ranked_id| {
            let doc_id = id::remove_rank(ranked_id);
            (params.domains.is_empty() || params.domains.contains(&id::domain_id(doc_id)))
                && forward.has_document(doc_id)
                && params.test_metadata(forward.doc_meta(doc_id))
        }))
    }
}
