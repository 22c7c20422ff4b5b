//! Dual index store: vector similarity search plus BM25 lexical ranking.
//!
//! [`DualIndexStore`] keeps both indexes under a single
//! `tokio::sync::RwLock`: writers and lexical rebuilds take the write half
//! (serializing with each other), while vector and lexical queries take the
//! read half and may run concurrently. A reader always observes a
//! consistent pre- or post-rebuild view, never a partial one.
//!
//! The lexical ranking function depends on corpus-wide statistics (document
//! frequencies, average document length), so the statistics are recomputed
//! over the entire chunk set on every rebuild. Chunks inserted after the
//! last rebuild are visible to vector search immediately but only enter
//! lexical results at the next rebuild — the two views diverge by at most
//! one pending rebuild cycle.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::Chunk;

/// BM25 term-frequency saturation parameter.
const BM25_K1: f32 = 1.5;
/// BM25 length-normalization parameter.
const BM25_B: f32 = 0.75;

/// Split text into lowercased tokens on whitespace, stripping surrounding
/// punctuation. Used for both indexed chunk text and queries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// One chunk's entry: embedding, raw text, tokenized text, and metadata
/// land together in a single insert, so readers never see an embedding
/// without its text or vice versa.
struct IndexEntry {
    content: String,
    embedding: Vec<f32>,
    parent_id: String,
    metadata: HashMap<String, Value>,
    tokens: Vec<String>,
}

/// Corpus-wide lexical statistics, snapshot at the last rebuild.
#[derive(Default)]
struct LexicalStats {
    /// Chunk id → token count at rebuild time. Doubles as the set of
    /// chunks visible to lexical queries.
    doc_len: HashMap<String, usize>,
    /// Term → number of chunks containing it.
    doc_freq: HashMap<String, usize>,
    avg_doc_len: f32,
}

#[derive(Default)]
struct IndexInner {
    entries: HashMap<String, IndexEntry>,
    stats: LexicalStats,
}

impl IndexInner {
    fn rebuild_stats(&mut self) {
        let mut doc_len = HashMap::with_capacity(self.entries.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;

        for (id, entry) in &self.entries {
            doc_len.insert(id.clone(), entry.tokens.len());
            total_len += entry.tokens.len();

            let mut seen: Vec<&str> = entry.tokens.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *doc_freq.entry(term.to_string()).or_insert(0) += 1;
            }
        }

        let avg_doc_len = if doc_len.is_empty() {
            0.0
        } else {
            total_len as f32 / doc_len.len() as f32
        };

        self.stats = LexicalStats { doc_len, doc_freq, avg_doc_len };
    }

    fn hydrate(&self, id: &str, score: f32) -> Chunk {
        let entry = &self.entries[id];
        Chunk {
            id: id.to_string(),
            content: entry.content.clone(),
            parent_id: entry.parent_id.clone(),
            metadata: entry.metadata.clone(),
            score,
        }
    }
}

/// Sort scored ids by descending score with ties broken by chunk id
/// ascending (a total order, so results are deterministic), then truncate.
fn top_k(mut scored: Vec<(String, f32)>, k: usize) -> Vec<(String, f32)> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
}

/// An in-memory dual index keyed by chunk id.
///
/// Owns all persisted chunk data. Queries against an empty index return
/// an empty sequence, never an error.
#[derive(Default)]
pub struct DualIndexStore {
    inner: RwLock<IndexInner>,
}

impl DualIndexStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert chunks with their embeddings, keyed by chunk id.
    ///
    /// Each chunk's embedding, raw text, and tokenized text are written in
    /// one insert. Lexical statistics are not updated here; call
    /// [`rebuild_lexical`](Self::rebuild_lexical) after a batch of writes.
    pub async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) {
        let mut inner = self.inner.write().await;
        for (chunk, embedding) in entries {
            let tokens = tokenize(&chunk.content);
            inner.entries.insert(
                chunk.id,
                IndexEntry {
                    content: chunk.content,
                    embedding,
                    parent_id: chunk.parent_id,
                    metadata: chunk.metadata,
                    tokens,
                },
            );
        }
    }

    /// Recompute lexical statistics over the entire current chunk set.
    ///
    /// Takes the exclusive write section, so concurrent rebuild requests
    /// queue behind each other and each recomputes over the full corpus it
    /// observes — the last one to run wins.
    pub async fn rebuild_lexical(&self) {
        let mut inner = self.inner.write().await;
        inner.rebuild_stats();
        info!(chunks = inner.stats.doc_len.len(), "rebuilt lexical statistics");
    }

    /// Nearest-neighbor search by cosine similarity.
    ///
    /// Returns at most `k` chunks, descending similarity, ties broken by
    /// chunk id ascending.
    pub async fn query_vector(&self, embedding: &[f32], k: usize) -> Vec<Chunk> {
        let inner = self.inner.read().await;
        let scored: Vec<(String, f32)> = inner
            .entries
            .iter()
            .map(|(id, entry)| (id.clone(), cosine_similarity(&entry.embedding, embedding)))
            .collect();

        top_k(scored, k)
            .into_iter()
            .map(|(id, score)| inner.hydrate(&id, score))
            .collect()
    }

    /// BM25 ranking over the statistics of the last rebuild.
    ///
    /// Returns at most `k` chunks with a positive score, descending,
    /// ties broken by chunk id ascending.
    pub async fn query_lexical(&self, query_tokens: &[String], k: usize) -> Vec<Chunk> {
        let inner = self.inner.read().await;
        let corpus_size = inner.stats.doc_len.len();
        if corpus_size == 0 || query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored = Vec::new();
        for (id, doc_len) in &inner.stats.doc_len {
            // The entry may have been replaced since the rebuild; score
            // whatever currently lives under the id.
            let Some(entry) = inner.entries.get(id) else { continue };

            let mut term_freq: HashMap<&str, usize> = HashMap::new();
            for token in &entry.tokens {
                *term_freq.entry(token.as_str()).or_insert(0) += 1;
            }

            let mut score = 0.0f32;
            for term in query_tokens {
                let tf = *term_freq.get(term.as_str()).unwrap_or(&0) as f32;
                if tf == 0.0 {
                    continue;
                }
                let df = *inner.stats.doc_freq.get(term.as_str()).unwrap_or(&0) as f32;
                let idf =
                    (1.0 + (corpus_size as f32 - df + 0.5) / (df + 0.5)).ln();
                let norm = 1.0 - BM25_B + BM25_B * (*doc_len as f32 / inner.stats.avg_doc_len);
                score += idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * norm);
            }

            if score > 0.0 {
                scored.push((id.clone(), score));
            }
        }

        top_k(scored, k)
            .into_iter()
            .map(|(id, score)| inner.hydrate(&id, score))
            .collect()
    }

    /// Remove every chunk whose parent is `document_id` and rebuild the
    /// lexical statistics in the same exclusive section.
    ///
    /// Returns the number of chunks removed; 0 when nothing matched
    /// (not an error).
    pub async fn delete_by_parent(&self, document_id: &str) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.parent_id != document_id);
        let removed = before - inner.entries.len();

        if removed > 0 {
            inner.rebuild_stats();
            info!(document_id, removed, "deleted document chunks");
        } else {
            debug!(document_id, "delete matched no chunks");
        }
        removed
    }

    /// Number of chunks currently stored.
    pub async fn chunk_count(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, parent: &str, content: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            content: content.to_string(),
            parent_id: parent.to_string(),
            metadata: HashMap::new(),
            score: 0.0,
        }
    }

    #[test]
    fn tokenize_lowercases_and_strips_punctuation() {
        assert_eq!(tokenize("Hello, World! x2"), vec!["hello", "world", "x2"]);
        assert!(tokenize("  ... ").is_empty());
    }

    #[tokio::test]
    async fn empty_index_queries_return_empty() {
        let store = DualIndexStore::new();
        assert!(store.query_vector(&[1.0, 0.0], 5).await.is_empty());
        assert!(store.query_lexical(&tokenize("anything"), 5).await.is_empty());
    }

    #[tokio::test]
    async fn vector_query_orders_by_similarity() {
        let store = DualIndexStore::new();
        store
            .upsert(vec![
                (chunk("a_chunk_0", "a", "alpha"), vec![1.0, 0.0]),
                (chunk("b_chunk_0", "b", "beta"), vec![0.0, 1.0]),
                (chunk("c_chunk_0", "c", "gamma"), vec![0.7, 0.7]),
            ])
            .await;

        let results = store.query_vector(&[1.0, 0.0], 2).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a_chunk_0");
        assert_eq!(results[1].id, "c_chunk_0");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn vector_ties_break_by_id_ascending() {
        let store = DualIndexStore::new();
        store
            .upsert(vec![
                (chunk("z_chunk_0", "z", "one"), vec![1.0, 0.0]),
                (chunk("a_chunk_0", "a", "two"), vec![1.0, 0.0]),
                (chunk("m_chunk_0", "m", "three"), vec![1.0, 0.0]),
            ])
            .await;

        let results = store.query_vector(&[1.0, 0.0], 3).await;
        let ids: Vec<&str> = results.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a_chunk_0", "m_chunk_0", "z_chunk_0"]);
    }

    #[tokio::test]
    async fn lexical_query_requires_a_rebuild() {
        let store = DualIndexStore::new();
        store
            .upsert(vec![(chunk("a_chunk_0", "a", "rust memory safety"), vec![1.0])])
            .await;

        // Not yet visible: statistics were never built.
        assert!(store.query_lexical(&tokenize("rust"), 5).await.is_empty());

        store.rebuild_lexical().await;
        let results = store.query_lexical(&tokenize("rust"), 5).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a_chunk_0");
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn lexical_ranks_matching_terms_higher() {
        let store = DualIndexStore::new();
        store
            .upsert(vec![
                (chunk("a_chunk_0", "a", "the borrow checker enforces ownership"), vec![1.0]),
                (chunk("b_chunk_0", "b", "ownership ownership ownership rules"), vec![1.0]),
                (chunk("c_chunk_0", "c", "garbage collection pauses"), vec![1.0]),
            ])
            .await;
        store.rebuild_lexical().await;

        let results = store.query_lexical(&tokenize("ownership"), 5).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "b_chunk_0");
        assert_eq!(results[1].id, "a_chunk_0");
    }

    #[tokio::test]
    async fn delete_by_parent_removes_and_reports() {
        let store = DualIndexStore::new();
        store
            .upsert(vec![
                (chunk("a_chunk_0", "doc_a", "first part"), vec![1.0]),
                (chunk("a_chunk_8", "doc_a", "second part"), vec![1.0]),
                (chunk("b_chunk_0", "doc_b", "other doc"), vec![1.0]),
            ])
            .await;
        store.rebuild_lexical().await;

        assert_eq!(store.delete_by_parent("doc_a").await, 2);
        assert_eq!(store.chunk_count().await, 1);

        // Lexical view was rebuilt inside the same section.
        assert!(store.query_lexical(&tokenize("first"), 5).await.is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_parent_is_a_noop() {
        let store = DualIndexStore::new();
        store.upsert(vec![(chunk("a_chunk_0", "doc_a", "text"), vec![1.0])]).await;
        store.rebuild_lexical().await;

        assert_eq!(store.delete_by_parent("missing").await, 0);
        assert_eq!(store.chunk_count().await, 1);
    }
}
