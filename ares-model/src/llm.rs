//! Chat-completion trait for text generation providers.

use async_trait::async_trait;

use crate::error::Result;

/// A text generation provider with a chat-style completion interface.
///
/// Implementations wrap an external inference endpoint behind a narrow,
/// non-streaming contract: one system prompt, one user prompt, one
/// temperature, one text reply. Every call must carry a bounded timeout.
#[async_trait]
pub trait Llm: Send + Sync {
    /// The model name, for logging.
    fn name(&self) -> &str;

    /// Generate a completion for the given prompts.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String>;
}
