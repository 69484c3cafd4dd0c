//! ModelBackend trait — the abstraction over the language-model collaborator.
//!
//! The engine asks the backend, once per round, to either produce a final
//! answer or request a batch of tool calls. Retry policy is internal to the
//! backend; the engine sees a single `ModelError::Unavailable` after the
//! backend has given up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::tool::{ToolCallRequest, ToolInvocationRecord, ToolSpec};
use crate::turn::{Attachment, Turn};

/// Everything the backend needs to make one decision: the new input, the
/// conversation window, the frozen tool snapshot, and all tool results
/// accumulated so far in this turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// The new user message.
    pub message: String,

    /// Attachments on the new message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// Bounded conversation window, oldest-first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub window: Vec<Turn>,

    /// The tools visible for this turn (one frozen snapshot per turn).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,

    /// Results of every tool invocation from earlier rounds of this turn,
    /// successes and failures alike, folded back verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolInvocationRecord>,

    /// 1-based index of the round this decision opens.
    pub round: u32,
}

/// What the backend decided for this round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelDecision {
    /// Terminal answer — the turn moves to finalization.
    Answer {
        content: String,
        reasoning: Option<String>,
    },

    /// A batch of tool calls to execute concurrently this round.
    CallTools(Vec<ToolCallRequest>),
}

/// The language-model collaborator.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend (e.g. "openai", "scripted").
    fn name(&self) -> &str;

    /// Make one round's decision. A single call; any internal retries are
    /// this backend's own business.
    async fn decide(
        &self,
        request: DecisionRequest,
    ) -> std::result::Result<ModelDecision, ModelError>;
}
