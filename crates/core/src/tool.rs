//! Tool domain types and the `ToolProvider` trait.
//!
//! Tools are externally-registered named capabilities the model can ask the
//! engine to invoke. Each is owned by a provider (an external process or an
//! in-process stub) and described by a structural JSON Schema for its
//! arguments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// The unique key of a tool: owning provider plus tool name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolRef {
    pub server: String,
    pub name: String,
}

impl ToolRef {
    pub fn new(server: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ToolRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.server, self.name)
    }
}

/// Description of a callable tool, as sent to the model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub server: String,
    pub name: String,
    pub description: String,

    /// JSON Schema describing accepted arguments.
    pub input_schema: serde_json::Value,
}

impl ToolSpec {
    pub fn tool_ref(&self) -> ToolRef {
        ToolRef::new(&self.server, &self.name)
    }
}

/// A request to execute one tool, produced by the model-decision step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique call ID (matches the model's tool_call id when one exists).
    pub call_id: String,

    pub tool: ToolRef,

    /// Structured arguments, validated against the tool's schema before
    /// dispatch.
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(tool: ToolRef, arguments: serde_json::Value) -> Self {
        Self {
            call_id: uuid::Uuid::new_v4().to_string(),
            tool,
            arguments,
        }
    }
}

/// Why an invocation failed. All variants are values folded back into the
/// model's context — never exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum InvocationFailure {
    Timeout,
    ProviderUnavailable,
    InvalidArguments(String),
    Provider(String),
}

impl std::fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::ProviderUnavailable => write!(f, "provider unavailable"),
            Self::InvalidArguments(d) => write!(f, "invalid arguments: {d}"),
            Self::Provider(d) => write!(f, "provider error: {d}"),
        }
    }
}

/// The outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum InvocationOutcome {
    Success(serde_json::Value),
    Failure(InvocationFailure),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One entry in a turn's tool trace. Appended regardless of outcome and
/// never discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub call_id: String,
    pub tool: ToolRef,
    pub arguments: serde_json::Value,
    pub outcome: InvocationOutcome,
    pub latency_ms: u64,

    /// Which orchestration round produced this record (1-based).
    pub round: u32,
}

/// An external provider exposing a set of named tools.
///
/// Registered into the `ToolRegistry` at startup and possibly dynamically
/// thereafter. Implementations: in-process stubs, MCP-style subprocesses,
/// remote services.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// The provider id that owns this set of tools (e.g. "web_search").
    fn server(&self) -> &str;

    /// The tools this provider exposes.
    fn tools(&self) -> Vec<ToolSpec>;

    /// Execute one of this provider's tools.
    ///
    /// Timeout enforcement lives at the invoker boundary, not here; a
    /// provider is allowed to hang and will still yield a timeout to the
    /// engine.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError>;
}
