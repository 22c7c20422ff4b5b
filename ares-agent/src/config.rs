//! Configuration for the reasoning agent.

use serde::{Deserialize, Serialize};

/// Configuration parameters for the reasoning loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Sampling temperature for planning and generation.
    pub temperature: f32,
    /// Sampling temperature for the audit step (deterministic by default).
    pub audit_temperature: f32,
    /// Maximum number of additional search/generate/audit cycles after the
    /// first pass. Zero means a single pass regardless of confidence.
    pub max_iterations: u32,
    /// The loop re-searches while confidence stays below this threshold.
    pub confidence_threshold: f32,
    /// Upper bound (in characters) on the context excerpt returned to callers.
    pub context_excerpt_chars: usize,
    /// Whether document text is passed through the PII masker before indexing.
    pub mask_documents: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            audit_temperature: 0.0,
            max_iterations: 5,
            confidence_threshold: 0.7,
            context_excerpt_chars: 500,
            mask_documents: true,
        }
    }
}

impl AgentConfig {
    /// Set the sampling temperature for planning and generation.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of additional reasoning iterations.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the confidence threshold below which the loop re-searches.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Enable or disable PII masking of document text before indexing.
    pub fn with_mask_documents(mut self, mask: bool) -> Self {
        self.mask_documents = mask;
        self
    }
}
