//! PII masking collaborator interface.
//!
//! Masking itself (entity detection, anonymization strategies) lives in an
//! external collaborator; this crate only consumes its output. Masked text
//! is treated as an opaque string with no special handling downstream.

use async_trait::async_trait;

/// The result of masking a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskOutcome {
    /// The text with PII entities replaced.
    pub masked_text: String,
    /// Number of entities that were masked.
    pub entity_count: usize,
    /// Whether any masking took place.
    pub masked: bool,
}

/// A collaborator that masks personally identifiable information.
#[async_trait]
pub trait PiiMasker: Send + Sync {
    /// Mask PII in `text`.
    async fn mask(&self, text: &str) -> MaskOutcome;
}

/// A passthrough masker for deployments without a PII collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMasker;

#[async_trait]
impl PiiMasker for NoOpMasker {
    async fn mask(&self, text: &str) -> MaskOutcome {
        MaskOutcome { masked_text: text.to_string(), entity_count: 0, masked: false }
    }
}
