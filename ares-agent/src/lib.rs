//! # ares-agent
//!
//! The iterative reasoning controller for ARES.
//!
//! ## Overview
//!
//! [`ReasoningAgent`] drives a bounded PLAN → SEARCH → GENERATE → AUDIT
//! workflow over the hybrid retrieval engine:
//!
//! - **PLAN** asks the generation provider whether the query needs
//!   document search ([`SearchDecision`]), defaulting to searching when
//!   the reply is unreadable or the call fails.
//! - **SEARCH** runs the hybrid engine and builds a context window with
//!   positional citation markers.
//! - **GENERATE** answers strictly from context (or directly when there
//!   is none), falling back to a fixed answer on provider failure.
//! - **AUDIT** self-scores the answer against the context and re-enters
//!   SEARCH while confidence stays low, bounded by `max_iterations`.
//!
//! Queries and (optionally) document text pass through the
//! [`PiiMasker`] collaborator before entering the pipeline.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ares_agent::{AgentConfig, ReasoningAgent};
//!
//! let agent = ReasoningAgent::builder()
//!     .engine(engine)
//!     .llm(Arc::new(ollama))
//!     .config(AgentConfig::default())
//!     .build()?;
//!
//! agent.index_document("handbook", &text, metadata).await?;
//! let response = agent.answer_query("How many vacation days?", true).await;
//! println!("{} (confidence {:.2})", response.answer, response.confidence);
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod pii;
pub mod state;

pub use agent::{ReasoningAgent, ReasoningAgentBuilder};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use pii::{MaskOutcome, NoOpMasker, PiiMasker};
pub use state::{AgentState, Citation, QueryResponse, SearchDecision};
