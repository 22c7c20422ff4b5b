//! Error types for the `ares-model` crate.

use thiserror::Error;

/// Errors that can occur when calling an inference provider.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The provider endpoint was unreachable or returned an error.
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether retrying the call can reasonably succeed
        /// (timeouts and 5xx responses yes, client errors no).
        retryable: bool,
    },

    /// The provider responded but the body did not match the expected shape.
    #[error("Response parse error ({provider}): {message}")]
    Parse {
        /// The provider whose response failed to parse.
        provider: String,
        /// A description of the failure.
        message: String,
    },
}

impl ModelError {
    /// Whether the retry policy should attempt this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::Provider { retryable: true, .. })
    }
}

/// A convenience result type for provider operations.
pub type Result<T> = std::result::Result<T, ModelError>;
