//! Mock providers for testing.
//!
//! [`MockLlm`] replays a script of canned replies (or failures) in order,
//! and [`MockEmbedder`] produces deterministic bag-of-words vectors, so
//! controller and engine behavior can be tested without an inference
//! server.

use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use ares_rag::embedding::EmbeddingProvider;

use crate::error::{ModelError, Result};
use crate::llm::Llm;

/// One scripted step for [`MockLlm`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with a non-retryable provider error carrying this message.
    Failure(String),
}

impl MockReply {
    /// Convenience constructor for a text reply.
    pub fn text(s: impl Into<String>) -> Self {
        MockReply::Text(s.into())
    }

    /// Convenience constructor for a failure.
    pub fn failure(s: impl Into<String>) -> Self {
        MockReply::Failure(s.into())
    }
}

/// A scripted LLM: each `complete` call consumes the next reply in order.
///
/// Exhausting the script is a test bug and fails with a provider error.
pub struct MockLlm {
    script: Mutex<VecDeque<MockReply>>,
    calls: AtomicUsize,
}

impl MockLlm {
    /// Create a mock that replays `script` in order.
    pub fn new(script: Vec<MockReply>) -> Self {
        Self { script: Mutex::new(script.into()), calls: AtomicUsize::new(0) }
    }

    /// Create a mock from plain text replies.
    pub fn with_responses<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|s| MockReply::Text(s.into())).collect())
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _temperature: f32,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Failure(message)) => Err(ModelError::Provider {
                provider: "mock".into(),
                message,
                retryable: false,
            }),
            None => Err(ModelError::Provider {
                provider: "mock".into(),
                message: "script exhausted".into(),
                retryable: false,
            }),
        }
    }
}

/// A deterministic embedding provider: each token hashes into one of
/// `dimensions` buckets, so identical texts embed identically and
/// disjoint vocabularies land in near-orthogonal vectors.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a mock embedder with the given output dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> ares_rag::Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace() {
            let token = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            v[(hasher.finish() as usize) % self.dimensions] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_llm_replays_script_in_order() {
        let llm = MockLlm::with_responses(["first", "second"]);
        assert_eq!(llm.complete("s", "u", 0.0).await.unwrap(), "first");
        assert_eq!(llm.complete("s", "u", 0.0).await.unwrap(), "second");
        assert!(llm.complete("s", "u", 0.0).await.is_err());
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn mock_llm_scripted_failure() {
        let llm = MockLlm::new(vec![MockReply::failure("down")]);
        let err = llm.complete("s", "u", 0.0).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed("alpha beta").await.unwrap();
        let b = embedder.embed("alpha beta").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.iter().sum::<f32>() > 0.0);
    }
}
