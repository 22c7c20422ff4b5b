//! The reasoning agent: a bounded PLAN → SEARCH → GENERATE → AUDIT loop.
//!
//! Each query runs through the four stages once, then repeats
//! SEARCH → GENERATE → AUDIT while the self-assessed confidence stays below
//! the configured threshold, up to `max_iterations` additional cycles. Every
//! provider failure inside the loop is absorbed with a documented fallback
//! (plan → search required, generate → fixed fallback answer, audit →
//! neutral confidence) so a single upstream outage degrades answer quality
//! instead of aborting the request.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use ares_model::Llm;
use ares_rag::HybridSearchEngine;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::pii::{NoOpMasker, PiiMasker};
use crate::state::{AgentState, Citation, QueryResponse, SearchDecision};

/// Confidence assigned to answers generated without retrieved context.
/// There is nothing to fact-check against, so the audit is skipped by
/// design rather than scored as uncertain.
const DIRECT_ANSWER_CONFIDENCE: f32 = 0.8;

/// Confidence assigned when the audit reply yields no readable number.
const NEUTRAL_CONFIDENCE: f32 = 0.5;

/// Answer returned when generation fails outright.
const FALLBACK_ANSWER: &str = "Sorry, I could not generate an answer.";

const PLAN_SYSTEM_PROMPT: &str = "You are a precise planning assistant for document retrieval.";

const GENERATE_SYSTEM_PROMPT: &str =
    "You are a precise, fact-based assistant. Answer only with verified information.";

const AUDIT_SYSTEM_PROMPT: &str =
    "You are a precise fact checker. Reply with a single number between 0.0 and 1.0.";

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

/// Extract the first decimal number from an audit reply, clamped to `[0, 1]`.
fn extract_confidence(reply: &str) -> Option<f32> {
    NUMBER_RE
        .find(reply)
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .map(|score| score.clamp(0.0, 1.0))
}

/// Truncate a string to at most `max_chars` characters on a char boundary.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// The reasoning agent.
///
/// Holds shared, read-only references to the search engine, the text
/// generation provider, and the PII masking collaborator. One agent serves
/// concurrent queries; each query gets its own private [`AgentState`].
pub struct ReasoningAgent {
    engine: Arc<HybridSearchEngine>,
    llm: Arc<dyn Llm>,
    masker: Arc<dyn PiiMasker>,
    config: AgentConfig,
}

impl ReasoningAgent {
    /// Create a new [`ReasoningAgentBuilder`].
    pub fn builder() -> ReasoningAgentBuilder {
        ReasoningAgentBuilder::default()
    }

    /// Return a reference to the agent configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answer a query through the full reasoning workflow.
    ///
    /// When `mask_pii` is set the query is passed through the masking
    /// collaborator before entering the loop. This never fails: every
    /// provider error inside the loop resolves to its fallback.
    pub async fn answer_query(&self, query: &str, mask_pii: bool) -> QueryResponse {
        let (query, pii_masked, pii_count) = if mask_pii {
            let outcome = self.masker.mask(query).await;
            if outcome.masked {
                info!(entities = outcome.entity_count, "masked PII in query");
            }
            (outcome.masked_text, outcome.masked, outcome.entity_count)
        } else {
            (query.to_string(), false, 0)
        };

        let mut state = AgentState::new(query, self.config.max_iterations);

        self.plan(&mut state).await;
        self.search(&mut state).await;
        self.generate(&mut state).await;
        self.audit(&mut state).await;

        while state.confidence < self.config.confidence_threshold
            && state.iteration < state.max_iterations
        {
            state.iteration += 1;
            info!(
                confidence = state.confidence,
                iteration = state.iteration,
                "confidence below threshold, searching again"
            );
            self.search(&mut state).await;
            self.generate(&mut state).await;
            self.audit(&mut state).await;
        }

        info!(
            confidence = state.confidence,
            citations = state.citations.len(),
            iterations = state.iteration,
            "query completed"
        );

        QueryResponse {
            answer: state.answer,
            citations: state.citations,
            confidence: state.confidence,
            context_excerpt: truncate_chars(&state.context, self.config.context_excerpt_chars),
            iteration_count: state.iteration,
            pii_masked,
            pii_count,
        }
    }

    /// Index a document, masking its text first when configured to.
    ///
    /// Returns the number of chunks created.
    pub async fn index_document(
        &self,
        document_id: &str,
        text: &str,
        metadata: HashMap<String, Value>,
    ) -> Result<usize> {
        let text = if self.config.mask_documents {
            let outcome = self.masker.mask(text).await;
            if outcome.masked {
                info!(document_id, entities = outcome.entity_count, "masked PII in document");
            }
            outcome.masked_text
        } else {
            text.to_string()
        };

        Ok(self.engine.index_document(document_id, &text, metadata).await?)
    }

    /// Delete a document and all its chunks.
    ///
    /// Returns `false` when the document was not indexed.
    pub async fn delete_document(&self, document_id: &str) -> bool {
        self.engine.delete_document(document_id).await
    }

    /// PLAN: decide whether the query needs document search.
    async fn plan(&self, state: &mut AgentState) {
        let prompt = format!(
            "Decide whether answering the question below requires searching the \
             document collection.\n\n\
             Question: {}\n\n\
             Reply in the format:\n\
             SEARCH: YES or SEARCH: NO\n\
             KEYWORDS: [the important search terms, when SEARCH is YES]",
            state.query
        );

        match self.llm.complete(PLAN_SYSTEM_PROMPT, &prompt, self.config.temperature).await {
            Ok(reply) => {
                let decision = SearchDecision::parse(&reply);
                state.requires_search = decision.requires_search();
                state.plan = Some(reply);
                debug!(?decision, requires_search = state.requires_search, "plan completed");
            }
            Err(e) => {
                // Fail safe toward doing more work, not less: skipping a
                // needed search risks an unsupported answer.
                warn!(error = %e, "planning failed, defaulting to search");
                state.requires_search = true;
            }
        }
    }

    /// SEARCH: run the hybrid engine and build context plus citations.
    async fn search(&self, state: &mut AgentState) {
        if !state.requires_search {
            debug!("skipping search, direct answer possible");
            return;
        }

        let retrieval = self.engine.config();
        let results = self
            .engine
            .search(
                &state.query,
                retrieval.top_k,
                retrieval.top_k_parents,
                retrieval.rerank_top_k,
            )
            .await;

        let mut context_parts = Vec::with_capacity(results.len());
        let mut citations = Vec::with_capacity(results.len());
        for (i, chunk) in results.iter().enumerate() {
            context_parts.push(format!("[{}] {}", i + 1, chunk.content));
            citations.push(Citation::from_chunk(chunk));
        }

        state.context = context_parts.join("\n\n");
        state.citations = citations;
        info!(result_count = results.len(), "search completed");
        state.search_results = results;
    }

    /// GENERATE: answer from context when it exists, directly otherwise.
    async fn generate(&self, state: &mut AgentState) {
        let prompt = if !state.context.is_empty() {
            format!(
                "Answer the question precisely, based only on the documents below.\n\
                 Cite the relevant passages with [1], [2], etc.\n\n\
                 Documents:\n{}\n\n\
                 Question: {}\n\n\
                 Answer:",
                state.context, state.query
            )
        } else {
            format!("Answer the following question precisely:\n\nQuestion: {}\n\nAnswer:", state.query)
        };

        match self.llm.complete(GENERATE_SYSTEM_PROMPT, &prompt, self.config.temperature).await {
            Ok(answer) => {
                debug!(answer_len = answer.len(), "answer generated");
                state.answer = answer;
            }
            Err(e) => {
                warn!(error = %e, "generation failed, using fallback answer");
                state.answer = FALLBACK_ANSWER.to_string();
            }
        }
    }

    /// AUDIT: score how well the answer agrees with the retrieved context.
    async fn audit(&self, state: &mut AgentState) {
        if state.context.is_empty() {
            state.confidence = DIRECT_ANSWER_CONFIDENCE;
            debug!(confidence = state.confidence, "no context, audit skipped");
            return;
        }

        let prompt = format!(
            "Rate how well the following answer agrees with the provided \
             documents, on a scale from 0.0 to 1.0.\n\n\
             Documents:\n{}\n\n\
             Answer:\n{}\n\n\
             Rating (a single number between 0.0 and 1.0):",
            state.context, state.answer
        );

        state.confidence = match self
            .llm
            .complete(AUDIT_SYSTEM_PROMPT, &prompt, self.config.audit_temperature)
            .await
        {
            Ok(reply) => extract_confidence(&reply).unwrap_or(NEUTRAL_CONFIDENCE),
            Err(e) => {
                warn!(error = %e, "audit failed, using neutral confidence");
                NEUTRAL_CONFIDENCE
            }
        };
        info!(confidence = state.confidence, "audit completed");
    }
}

/// Builder for constructing a [`ReasoningAgent`].
///
/// The engine and text generation provider are required; the masker
/// defaults to [`NoOpMasker`] and the config to [`AgentConfig::default()`].
#[derive(Default)]
pub struct ReasoningAgentBuilder {
    engine: Option<Arc<HybridSearchEngine>>,
    llm: Option<Arc<dyn Llm>>,
    masker: Option<Arc<dyn PiiMasker>>,
    config: Option<AgentConfig>,
}

impl ReasoningAgentBuilder {
    /// Set the hybrid search engine (required).
    pub fn engine(mut self, engine: Arc<HybridSearchEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the text generation provider (required).
    pub fn llm(mut self, llm: Arc<dyn Llm>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the PII masking collaborator.
    pub fn masker(mut self, masker: Arc<dyn PiiMasker>) -> Self {
        self.masker = Some(masker);
        self
    }

    /// Set the agent configuration.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the [`ReasoningAgent`].
    ///
    /// # Errors
    ///
    /// Returns [`ares_rag::RagError::Config`] if the engine or the
    /// generation provider is missing.
    pub fn build(self) -> Result<ReasoningAgent> {
        let engine = self
            .engine
            .ok_or_else(|| ares_rag::RagError::Config("engine is required".to_string()))?;
        let llm = self
            .llm
            .ok_or_else(|| ares_rag::RagError::Config("llm is required".to_string()))?;

        Ok(ReasoningAgent {
            engine,
            llm,
            masker: self.masker.unwrap_or_else(|| Arc::new(NoOpMasker)),
            config: self.config.unwrap_or_default(),
        })
    }
}
