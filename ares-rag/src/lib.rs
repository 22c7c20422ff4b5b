//! # ares-rag
//!
//! Hybrid retrieval engine for ARES: vector similarity plus BM25 lexical
//! search over a private document corpus, with cross-encoder reranking and
//! parent-document grouping.
//!
//! ## Overview
//!
//! - [`WordWindowChunker`] splits extracted document text into overlapping
//!   word windows tied to a parent document id.
//! - [`DualIndexStore`] keeps a vector index and a lexical (BM25) index in
//!   lock-step, keyed by chunk id.
//! - [`HybridSearchEngine`] runs both retrieval modalities concurrently,
//!   fuses their scores, reranks the best candidates with a pairwise
//!   relevance model, and groups results by parent document.
//!
//! Embedding and reranking backends plug in behind the
//! [`EmbeddingProvider`] and [`Reranker`] traits (implementations live in
//! `ares-model`).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ares_rag::{HybridSearchEngine, RetrievalConfig};
//!
//! let engine = HybridSearchEngine::builder()
//!     .config(RetrievalConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .reranker(Arc::new(my_reranker))
//!     .build()?;
//!
//! engine.index_document("handbook", &text, metadata).await?;
//! let chunks = engine.search("vacation policy", 5, 3, 3).await;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod reranker;

pub use chunking::{Chunker, WordWindowChunker};
pub use config::{RetrievalConfig, RetrievalConfigBuilder};
pub use document::{Chunk, Document};
pub use embedding::EmbeddingProvider;
pub use engine::{HybridSearchEngine, HybridSearchEngineBuilder};
pub use error::{RagError, Result};
pub use index::DualIndexStore;
pub use reranker::Reranker;
