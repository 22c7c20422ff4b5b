//! # ares-model
//!
//! Inference provider adapters for ARES.
//!
//! ## Overview
//!
//! This crate provides the thin HTTP adapters the retrieval engine and
//! reasoning controller depend on:
//!
//! - [`OllamaClient`] — chat completion and embeddings against an
//!   Ollama-compatible server
//! - [`HttpReranker`] — cross-encoder scoring against a rerank endpoint
//! - [`RetryPolicy`] — bounded retry with exponential backoff, shared by
//!   every adapter
//! - [`MockLlm`] / [`MockEmbedder`] — deterministic providers for tests
//!
//! All adapters carry bounded request timeouts; a timeout is an ordinary
//! retryable failure, never a crash.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ares_model::{OllamaClient, RetryPolicy};
//!
//! let client = OllamaClient::local()?
//!     .with_chat_model("llama3:8b")
//!     .with_retry_policy(RetryPolicy::default());
//!
//! let reply = client.complete("You are terse.", "Say hi.", 0.1).await?;
//! ```

pub mod error;
pub mod llm;
pub mod mock;
pub mod ollama;
pub mod rerank;
pub mod retry;

pub use error::{ModelError, Result};
pub use llm::Llm;
pub use mock::{MockEmbedder, MockLlm, MockReply};
pub use ollama::OllamaClient;
pub use rerank::HttpReranker;
pub use retry::RetryPolicy;
