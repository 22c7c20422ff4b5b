//! Error types for the `ares-agent` crate.

use thiserror::Error;

/// Errors that can occur in agent operations.
///
/// Provider failures inside the reasoning loop are absorbed at each state
/// with a documented fallback and never surface here; this type covers the
/// operations that can genuinely fail, such as indexing.
#[derive(Debug, Error)]
pub enum AgentError {
    /// An error propagated from the retrieval engine.
    #[error(transparent)]
    Rag(#[from] ares_rag::RagError),
}

/// A convenience result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
