//! Agent state, search decision parsing, and response types.

use ares_rag::Chunk;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mutable state for one in-flight query.
///
/// Created fresh per top-level query, mutated in place through each
/// state-machine stage, and discarded after the response is assembled.
/// Never shared across concurrent queries.
#[derive(Debug, Clone)]
pub struct AgentState {
    /// The (possibly masked) user query.
    pub query: String,
    /// The raw planning reply, kept for logging and debugging.
    pub plan: Option<String>,
    /// Chunks retained by the last search pass.
    pub search_results: Vec<Chunk>,
    /// Concatenated context with positional citation markers.
    pub context: String,
    /// The generated answer.
    pub answer: String,
    /// Citations derived 1:1 from the retained chunks.
    pub citations: Vec<Citation>,
    /// Self-assessed answer confidence in `[0, 1]`.
    pub confidence: f32,
    /// Whether the plan decided document search is needed.
    pub requires_search: bool,
    /// Number of additional reasoning cycles performed so far.
    pub iteration: u32,
    /// Bound on additional reasoning cycles.
    pub max_iterations: u32,
}

impl AgentState {
    /// Fresh state for a query.
    pub fn new(query: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            query: query.into(),
            plan: None,
            search_results: Vec::new(),
            context: String::new(),
            answer: String::new(),
            citations: Vec::new(),
            confidence: 0.0,
            requires_search: true,
            iteration: 0,
            max_iterations,
        }
    }
}

/// The planning stage's verdict on whether a query needs document search.
///
/// Parsed from a `SEARCH: YES` / `SEARCH: NO` marker in the model reply.
/// Anything that cannot be read as a clear yes or no is `Undetermined`,
/// which callers map to the fail-safe default of searching: skipping a
/// needed search risks an unsupported answer, doing one needlessly only
/// costs latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDecision {
    /// The query needs document search.
    Required,
    /// The query can be answered directly.
    NotRequired,
    /// The reply did not contain a readable decision.
    Undetermined,
}

impl SearchDecision {
    /// Parse a planning reply.
    ///
    /// Looks for a line containing a `SEARCH:` marker; failing that,
    /// accepts a reply that simply opens with YES or NO.
    pub fn parse(reply: &str) -> Self {
        let upper = reply.to_uppercase();

        for line in upper.lines() {
            if let Some(rest) = line.trim_start().strip_prefix("SEARCH:") {
                if rest.contains("YES") {
                    return SearchDecision::Required;
                }
                if rest.contains("NO") {
                    return SearchDecision::NotRequired;
                }
            }
        }

        let trimmed = upper.trim_start();
        if trimmed.starts_with("YES") {
            return SearchDecision::Required;
        }
        if trimmed.starts_with("NO") {
            return SearchDecision::NotRequired;
        }
        SearchDecision::Undetermined
    }

    /// Map the decision to a boolean, with `Undetermined` falling back to
    /// requiring search.
    pub fn requires_search(self) -> bool {
        !matches!(self, SearchDecision::NotRequired)
    }
}

/// A pointer from the answer back to a retrieved chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    /// The cited chunk's id.
    pub chunk_id: String,
    /// A human-readable source label (filename when known).
    pub source_label: String,
    /// Where in the source the chunk came from (page when known).
    pub locator: String,
    /// The chunk's relevance score at selection time.
    pub relevance_score: f32,
}

impl Citation {
    /// Derive a citation from a retained search result chunk.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            source_label: metadata_string(chunk, "filename").unwrap_or_else(|| "Unknown".into()),
            locator: metadata_string(chunk, "page").unwrap_or_else(|| "N/A".into()),
            relevance_score: chunk.score,
        }
    }
}

/// Render a metadata value as a plain string (strings unquoted,
/// numbers formatted).
fn metadata_string(chunk: &Chunk, key: &str) -> Option<String> {
    chunk.metadata.get(key).map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// The response returned for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The generated answer.
    pub answer: String,
    /// Citations for the chunks the answer was grounded on.
    pub citations: Vec<Citation>,
    /// Self-assessed confidence in `[0, 1]`.
    pub confidence: f32,
    /// A bounded excerpt of the context the answer was generated from.
    pub context_excerpt: String,
    /// Number of additional reasoning cycles performed.
    pub iteration_count: u32,
    /// Whether PII masking altered the query.
    pub pii_masked: bool,
    /// Number of PII entities masked in the query.
    pub pii_count: usize,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn parse_marker_lines() {
        assert_eq!(SearchDecision::parse("SEARCH: YES\nKEYWORDS: a, b"), SearchDecision::Required);
        assert_eq!(SearchDecision::parse("search: no"), SearchDecision::NotRequired);
        assert_eq!(
            SearchDecision::parse("Analysis...\n  SEARCH: YES"),
            SearchDecision::Required
        );
    }

    #[test]
    fn parse_bare_openers() {
        assert_eq!(SearchDecision::parse("Yes, that needs a lookup."), SearchDecision::Required);
        assert_eq!(SearchDecision::parse("No."), SearchDecision::NotRequired);
    }

    #[test]
    fn parse_ambiguous_is_undetermined() {
        let decision = SearchDecision::parse("I am not sure what you mean.");
        assert_eq!(decision, SearchDecision::Undetermined);
        // The fail-safe default is to search.
        assert!(decision.requires_search());
    }

    #[test]
    fn citation_reads_metadata_with_fallbacks() {
        let mut metadata = HashMap::new();
        metadata.insert("filename".to_string(), Value::from("handbook.pdf"));
        metadata.insert("page".to_string(), Value::from(12));
        let chunk = Chunk {
            id: "d_chunk_0".into(),
            content: "text".into(),
            parent_id: "d".into(),
            metadata,
            score: 0.42,
        };

        let citation = Citation::from_chunk(&chunk);
        assert_eq!(citation.source_label, "handbook.pdf");
        assert_eq!(citation.locator, "12");
        assert!((citation.relevance_score - 0.42).abs() < 1e-6);

        let bare = Chunk {
            id: "d_chunk_1".into(),
            content: "text".into(),
            parent_id: "d".into(),
            metadata: HashMap::new(),
            score: 0.0,
        };
        let citation = Citation::from_chunk(&bare);
        assert_eq!(citation.source_label, "Unknown");
        assert_eq!(citation.locator, "N/A");
    }
}
