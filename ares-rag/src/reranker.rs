//! Reranker trait for cross-encoder scoring of (query, text) pairs.

use async_trait::async_trait;

use crate::error::Result;

/// A pairwise relevance model that scores `[query, text]` pairs.
///
/// Implementations typically wrap a cross-encoder inference endpoint.
/// The engine owns candidate selection and final ordering; a reranker
/// only produces one relevance score per input text, in input order.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score each text against the query.
    ///
    /// Returns one score per input text, in the same order as `texts`.
    async fn score_pairs(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>>;
}
