//! Hybrid search engine: fusion, reranking, and parent-document grouping.
//!
//! [`HybridSearchEngine`] composes the [`DualIndexStore`], an
//! [`EmbeddingProvider`], and an optional cross-encoder [`Reranker`].
//! A query runs both retrieval modalities concurrently, fuses their scores,
//! re-scores the best candidates pairwise, then groups by parent document so
//! no single source dominates the final chunk set.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::chunking::{Chunker, WordWindowChunker};
use crate::config::RetrievalConfig;
use crate::document::{Chunk, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{DualIndexStore, tokenize};
use crate::reranker::Reranker;

/// The hybrid search engine.
///
/// Construct one via [`HybridSearchEngine::builder()`]; all collaborators
/// are injected and shared, so a single engine can serve concurrent
/// queries. Construct it once at startup and share it by reference.
pub struct HybridSearchEngine {
    config: RetrievalConfig,
    store: Arc<DualIndexStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn Reranker>>,
    chunker: WordWindowChunker,
}

impl HybridSearchEngine {
    /// Create a new [`HybridSearchEngineBuilder`].
    pub fn builder() -> HybridSearchEngineBuilder {
        HybridSearchEngineBuilder::default()
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Return a reference to the index store.
    pub fn store(&self) -> &Arc<DualIndexStore> {
        &self.store
    }

    /// Index a document: chunk → embed → upsert → rebuild lexical statistics.
    ///
    /// Returns the number of chunks created.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Engine`] if batch embedding fails; nothing is
    /// written in that case.
    pub async fn index_document(
        &self,
        document_id: &str,
        text: &str,
        metadata: HashMap<String, Value>,
    ) -> Result<usize> {
        let document = Document::new(document_id, text, metadata);
        let chunks = self.chunker.chunk(&document);
        if chunks.is_empty() {
            info!(document_id, chunk_count = 0, "indexed document (empty)");
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
            warn!(document_id, error = %e, "embedding failed during indexing");
            RagError::Engine(format!("embedding failed for document '{document_id}': {e}"))
        })?;

        let chunk_count = chunks.len();
        self.store.upsert(chunks.into_iter().zip(embeddings).collect()).await;
        self.store.rebuild_lexical().await;

        info!(document_id, chunk_count, "indexed document");
        Ok(chunk_count)
    }

    /// Delete a document and all its chunks.
    ///
    /// Returns `false` when the document was not indexed (not an error).
    pub async fn delete_document(&self, document_id: &str) -> bool {
        self.store.delete_by_parent(document_id).await > 0
    }

    /// Hybrid search: vector + lexical retrieval, score fusion,
    /// cross-encoder reranking, parent grouping.
    ///
    /// Returns at most `k` chunks, highest relevance first, drawn from at
    /// most `k_parents` distinct parent documents. Fewer matches than
    /// requested return what exists; an empty index returns an empty vec.
    /// Provider failures degrade the result (lexical-only, or fused-only
    /// ordering) rather than erroring.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        k_parents: usize,
        k_rerank: usize,
    ) -> Vec<Chunk> {
        // Fetch twice as many candidates as requested from each modality
        // so fusion and reranking have room to reorder.
        let fetch = k.saturating_mul(2);

        let query_tokens = tokenize(query);
        let (vector_chunks, lexical_chunks) = tokio::join!(
            self.vector_candidates(query, fetch),
            self.store.query_lexical(&query_tokens, fetch),
        );

        let mut candidates = fuse(vector_chunks, lexical_chunks);
        let reranked_count = self.rerank_head(query, &mut candidates, k_rerank * 2).await;

        let results = select_by_parent(candidates, k, k_parents);
        info!(
            query_len = query.len(),
            result_count = results.len(),
            reranked = reranked_count,
            "hybrid search completed"
        );
        results
    }

    /// Embed the query and run the vector half of the search.
    ///
    /// An embedding failure degrades to lexical-only results.
    async fn vector_candidates(&self, query: &str, fetch: usize) -> Vec<Chunk> {
        match self.embedder.embed(query).await {
            Ok(embedding) => self.store.query_vector(&embedding, fetch).await,
            Err(e) => {
                warn!(error = %e, "query embedding failed; degrading to lexical-only");
                Vec::new()
            }
        }
    }

    /// Re-score the top `limit` fused candidates with the cross-encoder and
    /// move them ahead of the unreranked tail. Returns how many were
    /// reranked (0 when no reranker is configured or the call failed).
    async fn rerank_head(&self, query: &str, candidates: &mut Vec<Chunk>, limit: usize) -> usize {
        let Some(reranker) = &self.reranker else { return 0 };
        let head_len = limit.min(candidates.len());
        if head_len == 0 {
            return 0;
        }

        let texts: Vec<&str> = candidates[..head_len].iter().map(|c| c.content.as_str()).collect();
        let scores = match reranker.score_pairs(query, &texts).await {
            Ok(scores) if scores.len() == head_len => scores,
            Ok(scores) => {
                warn!(
                    expected = head_len,
                    got = scores.len(),
                    "reranker returned wrong score count; keeping fused order"
                );
                return 0;
            }
            Err(e) => {
                warn!(error = %e, "reranking failed; keeping fused order");
                return 0;
            }
        };

        let tail = candidates.split_off(head_len);
        for (chunk, score) in candidates.iter_mut().zip(scores) {
            chunk.score = score;
        }
        // Reranked relevance strictly dominates fused-only relevance:
        // the head sorts internally by its new scores and the tail keeps
        // its fused order behind it, whatever the raw numbers say.
        sort_by_score(candidates);
        candidates.extend(tail);
        head_len
    }
}

/// Sort chunks by descending score, ties broken by chunk id ascending.
fn sort_by_score(chunks: &mut [Chunk]) {
    chunks.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Merge vector and lexical result sets by chunk id.
///
/// A chunk present in both sets gets the mean of its two scores; a chunk
/// present in only one set keeps that score unchanged — the two indexes
/// are expected to diverge on different query types, so absence from one
/// is not a penalty. Returns candidates ordered by fused score descending,
/// ties broken by chunk id ascending.
fn fuse(vector_chunks: Vec<Chunk>, lexical_chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut merged: HashMap<String, Chunk> = HashMap::new();
    for chunk in vector_chunks.into_iter().chain(lexical_chunks) {
        match merged.entry(chunk.id.clone()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.score = (existing.score + chunk.score) / 2.0;
            }
            Entry::Vacant(entry) => {
                entry.insert(chunk);
            }
        }
    }

    let mut fused: Vec<Chunk> = merged.into_values().collect();
    sort_by_score(&mut fused);
    fused
}

/// Group candidates by parent document and select the final chunk set.
///
/// Candidates must already be in final relevance order. Buckets are ranked
/// by their best chunk (its first appearance in the ordered list), the top
/// `k_parents` buckets are kept, each contributes its top 2 chunks, and the
/// concatenation is truncated to `k`.
fn select_by_parent(candidates: Vec<Chunk>, k: usize, k_parents: usize) -> Vec<Chunk> {
    let mut bucket_order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Chunk>> = HashMap::new();

    for chunk in candidates {
        let parent = chunk.parent_key().to_string();
        if !buckets.contains_key(&parent) {
            bucket_order.push(parent.clone());
        }
        buckets.entry(parent).or_default().push(chunk);
    }

    let mut selected = Vec::new();
    for parent in bucket_order.into_iter().take(k_parents) {
        let bucket = buckets.remove(&parent).unwrap_or_default();
        selected.extend(bucket.into_iter().take(2));
    }
    selected.truncate(k);
    selected
}

/// Builder for constructing a [`HybridSearchEngine`].
///
/// The embedding provider is required; the store defaults to a fresh
/// [`DualIndexStore`] and the reranker is optional.
#[derive(Default)]
pub struct HybridSearchEngineBuilder {
    config: Option<RetrievalConfig>,
    store: Option<Arc<DualIndexStore>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl HybridSearchEngineBuilder {
    /// Set the retrieval configuration. Defaults to [`RetrievalConfig::default()`].
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the index store. Defaults to a fresh empty store.
    pub fn store(mut self, store: Arc<DualIndexStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the embedding provider (required).
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    /// Set an optional cross-encoder reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the engine, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the embedding provider is missing or
    /// the chunking parameters are inconsistent.
    pub fn build(self) -> Result<HybridSearchEngine> {
        let config = self.config.unwrap_or_default();
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let chunker = WordWindowChunker::new(config.chunk_size, config.chunk_overlap)?;

        Ok(HybridSearchEngine {
            config,
            store: self.store.unwrap_or_default(),
            embedder,
            reranker: self.reranker,
            chunker,
        })
    }
}
