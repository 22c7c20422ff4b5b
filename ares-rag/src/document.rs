//! Data types for documents and chunks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A source document containing extracted text and metadata.
///
/// Text extraction happens upstream; this crate only consumes the
/// resulting plain text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The extracted text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document (filename, page, ...).
    pub metadata: HashMap<String, Value>,
}

impl Document {
    /// Create a document from an id, text, and metadata.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: HashMap<String, Value>,
    ) -> Self {
        Self { id: id.into(), text: text.into(), metadata }
    }
}

/// A bounded span of a document's text, the unit of indexing and retrieval.
///
/// The `score` field is search-context-dependent: it is set by whichever
/// retrieval stage last touched the chunk (vector similarity, BM25, fused
/// average, or cross-encoder output) and is never persisted as ground truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Globally unique identifier, `{document_id}_chunk_{word_offset}`.
    pub id: String,
    /// The text content of the chunk.
    pub content: String,
    /// The ID of the originating document.
    pub parent_id: String,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, Value>,
    /// Relevance score for the current search, transient.
    #[serde(default)]
    pub score: f32,
}

impl Chunk {
    /// The grouping key for parent-document bucketing.
    ///
    /// Falls back to the `document_id` metadata field when `parent_id`
    /// is empty (chunks hydrated from older index entries).
    pub fn parent_key(&self) -> &str {
        if !self.parent_id.is_empty() {
            return &self.parent_id;
        }
        self.metadata
            .get("document_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_key_prefers_parent_id() {
        let mut metadata = HashMap::new();
        metadata.insert("document_id".to_string(), Value::from("meta_doc"));
        let chunk = Chunk {
            id: "a_chunk_0".into(),
            content: "text".into(),
            parent_id: "doc_a".into(),
            metadata,
            score: 0.0,
        };
        assert_eq!(chunk.parent_key(), "doc_a");
    }

    #[test]
    fn parent_key_falls_back_to_metadata() {
        let mut metadata = HashMap::new();
        metadata.insert("document_id".to_string(), Value::from("meta_doc"));
        let chunk = Chunk {
            id: "a_chunk_0".into(),
            content: "text".into(),
            parent_id: String::new(),
            metadata,
            score: 0.0,
        };
        assert_eq!(chunk.parent_key(), "meta_doc");
    }
}
