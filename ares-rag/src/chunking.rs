//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`WordWindowChunker`],
//! which splits text into overlapping windows of whitespace-delimited words.
//! Chunking is deterministic: identical input always yields an identical,
//! order-stable chunk sequence, which is what makes indexing reproducible.

use serde_json::Value;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with content and metadata but no
/// scores attached; scores are assigned later during search.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size windows of words with configurable overlap.
///
/// Window `i` covers words `[i, i + chunk_size)`; the next window starts at
/// `i + (chunk_size - overlap)`. Chunk IDs are generated as
/// `{document_id}_chunk_{word_offset}`, so the same document always chunks
/// to the same IDs. Each chunk inherits the parent document's metadata plus
/// `document_id`, `parent_id`, and `chunk_index` fields.
///
/// # Example
///
/// ```rust,ignore
/// use ares_rag::WordWindowChunker;
///
/// let chunker = WordWindowChunker::new(512, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct WordWindowChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl WordWindowChunker {
    /// Create a new `WordWindowChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `chunk_overlap >= chunk_size`,
    /// which would make the window step zero or negative.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for WordWindowChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let words: Vec<&str> = document.text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut offset = 0;

        while offset < words.len() {
            let end = (offset + self.chunk_size).min(words.len());
            let content = words[offset..end].join(" ");

            let mut metadata = document.metadata.clone();
            metadata.insert("document_id".to_string(), Value::from(document.id.as_str()));
            metadata.insert("parent_id".to_string(), Value::from(document.id.as_str()));
            metadata.insert("chunk_index".to_string(), Value::from(offset));

            chunks.push(Chunk {
                id: format!("{}_chunk_{offset}", document.id),
                content,
                parent_id: document.id.clone(),
                metadata,
                score: 0.0,
            });

            offset += step;
        }

        chunks
    }
}
