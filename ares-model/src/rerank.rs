//! Cross-encoder reranking over HTTP.
//!
//! [`HttpReranker`] posts `(query, texts)` batches to a rerank inference
//! endpoint (the `text-embeddings-inference` `/rerank` wire shape) and
//! returns one relevance score per text, in input order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ares_rag::reranker::Reranker;

use crate::error::{ModelError, Result};
use crate::retry::RetryPolicy;

/// Bound on any single rerank request.
const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// A pairwise relevance model served over HTTP.
///
/// # Example
///
/// ```rust,ignore
/// use ares_model::HttpReranker;
///
/// let reranker = HttpReranker::new("http://localhost:8080")?;
/// let scores = reranker.score_pairs("query", &["text a", "text b"]).await?;
/// ```
pub struct HttpReranker {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpReranker {
    /// Create a new reranker client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Provider`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build().map_err(|e| {
            ModelError::Provider {
                provider: "Reranker".into(),
                message: format!("failed to build HTTP client: {e}"),
                retryable: false,
            }
        })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Set the retry policy for all requests.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn rerank_once(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        let request_body = RerankRequest { query, texts };

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ModelError::Provider {
                provider: "Reranker".into(),
                message: format!("request failed: {e}"),
                retryable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Provider {
                provider: "Reranker".into(),
                message: format!("API returned {status}: {body}"),
                retryable: status.is_server_error() || status.as_u16() == 429,
            });
        }

        let ranked: Vec<RerankResult> = response.json().await.map_err(|e| ModelError::Parse {
            provider: "Reranker".into(),
            message: format!("failed to parse rerank response: {e}"),
        })?;

        // The endpoint returns results sorted by score; restore input order.
        let mut scores = vec![0.0f32; texts.len()];
        for result in ranked {
            let slot = scores.get_mut(result.index).ok_or_else(|| ModelError::Parse {
                provider: "Reranker".into(),
                message: format!("result index {} out of range", result.index),
            })?;
            *slot = result.score;
        }
        Ok(scores)
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [&'a str],
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    score: f32,
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn score_pairs(&self, query: &str, texts: &[&str]) -> ares_rag::Result<Vec<f32>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = "Reranker", pairs = texts.len(), "scoring pairs");
        self.retry
            .run("rerank", || self.rerank_once(query, texts))
            .await
            .map_err(|e| ares_rag::RagError::Reranker {
                reranker: "Reranker".into(),
                message: e.to_string(),
            })
    }
}
