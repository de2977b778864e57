//! BM25 term weighting
//!
//! Used twice per document: over full-text occurrence counts and over the
//! number of relevance signals a term carries.

use super::params::Bm25Parameters;

/// Assumed corpus average document length, in words
pub const AVG_DOC_LENGTH: f64 = 5000.0;

/// Inverse document frequency
///
/// # Arguments
/// * `doc_freq` - Number of documents containing the term
/// * `total_docs` - Number of documents in the index
#[inline]
pub fn bm25_idf(doc_freq: f64, total_docs: f64) -> f64 {
    (1.0 + (total_docs - doc_freq + 0.5) / (doc_freq + 0.5)).ln()
}

/// Saturated, length-normalized term frequency
#[inline]
pub fn bm25_tf(count: f64, doc_length: f64, params: Bm25Parameters) -> f64 {
    let length_ratio = doc_length / AVG_DOC_LENGTH;
    (count * (params.k + 1.0)) / (count + params.k * (1.0 - params.b + params.b * length_ratio))
}

#[inline]
pub fn bm25_score(
    count: f64,
    doc_length: f64,
    doc_freq: f64,
    total_docs: f64,
    params: Bm25Parameters,
) -> f64 {
    if count <= 0.0 {
        return 0.0;
    }
    bm25_idf(doc_freq, total_docs) * bm25_tf(count, doc_length, params)
}
