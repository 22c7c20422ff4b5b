//! Ollama provider: chat completion and embeddings over HTTP.
//!
//! [`OllamaClient`] talks to an Ollama (or Ollama-compatible) inference
//! server. It implements both [`Llm`] (via `POST /api/chat`, non-streaming)
//! and [`ares_rag::EmbeddingProvider`] (via `POST /api/embeddings`).
//! Every request carries a bounded timeout and runs under the configured
//! [`RetryPolicy`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use ares_rag::embedding::EmbeddingProvider;

use crate::error::{ModelError, Result};
use crate::llm::Llm;
use crate::retry::RetryPolicy;

/// The default Ollama server address.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default chat model.
const DEFAULT_CHAT_MODEL: &str = "llama3:8b";

/// The default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "mxbai-embed-large";

/// The dimensionality of `mxbai-embed-large` embeddings.
const DEFAULT_DIMENSIONS: usize = 1024;

/// Bound on any single HTTP request to the inference server.
const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// An inference client for an Ollama-compatible server.
///
/// # Example
///
/// ```rust,ignore
/// use ares_model::OllamaClient;
///
/// let client = OllamaClient::new("http://localhost:11434")?
///     .with_chat_model("llama3:8b");
/// let reply = client.complete("You are terse.", "Say hi.", 0.1).await?;
/// ```
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl OllamaClient {
    /// Create a new client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Provider`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build().map_err(|e| {
            ModelError::Provider {
                provider: "Ollama".into(),
                message: format!("failed to build HTTP client: {e}"),
                retryable: false,
            }
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chat_model: DEFAULT_CHAT_MODEL.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            retry: RetryPolicy::default(),
        })
    }

    /// Create a client for the default local server.
    pub fn local() -> Result<Self> {
        Self::new(DEFAULT_BASE_URL)
    }

    /// Set the chat model name.
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Set the embedding model name and its output dimensionality.
    pub fn with_embedding_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.embedding_model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Set the retry policy for all requests.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn transport_error(e: reqwest::Error) -> ModelError {
        // Timeouts and connection failures are worth retrying;
        // anything else from the transport layer is not.
        let retryable = e.is_timeout() || e.is_connect();
        ModelError::Provider {
            provider: "Ollama".into(),
            message: format!("request failed: {e}"),
            retryable,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!(provider = "Ollama", %status, "API error");
        Err(ModelError::Provider {
            provider: "Ollama".into(),
            message: format!("API returned {status}: {body}"),
            retryable: status.is_server_error() || status.as_u16() == 429,
        })
    }

    async fn chat_once(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String> {
        let request_body = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt.to_string() },
                ChatMessage { role: "user", content: user_prompt.to_string() },
            ],
            options: ChatOptions { temperature },
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request_body)
            .send()
            .await
            .map_err(Self::transport_error)?;
        let response = Self::check_status(response).await?;

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| ModelError::Parse {
                provider: "Ollama".into(),
                message: format!("failed to parse chat response: {e}"),
            })?;
        Ok(chat_response.message.content)
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let request_body = EmbeddingsRequest { model: &self.embedding_model, prompt: text };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request_body)
            .send()
            .await
            .map_err(Self::transport_error)?;
        let response = Self::check_status(response).await?;

        let embeddings_response: EmbeddingsResponse =
            response.json().await.map_err(|e| ModelError::Parse {
                provider: "Ollama".into(),
                message: format!("failed to parse embeddings response: {e}"),
            })?;
        Ok(embeddings_response.embedding)
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    options: ChatOptions,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

// ── Trait implementations ──────────────────────────────────────────

#[async_trait]
impl Llm for OllamaClient {
    fn name(&self) -> &str {
        &self.chat_model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String> {
        debug!(
            provider = "Ollama",
            model = %self.chat_model,
            prompt_len = user_prompt.len(),
            "chat completion"
        );
        self.retry
            .run("ollama_chat", || self.chat_once(system_prompt, user_prompt, temperature))
            .await
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> ares_rag::Result<Vec<f32>> {
        debug!(
            provider = "Ollama",
            model = %self.embedding_model,
            text_len = text.len(),
            "embedding text"
        );
        self.retry
            .run("ollama_embed", || self.embed_once(text))
            .await
            .map_err(|e| ares_rag::RagError::Embedding {
                provider: "Ollama".into(),
                message: e.to_string(),
            })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
