//! Turn and Attachment domain types.
//!
//! A `Turn` is the unit of conversation history: one user input plus the
//! system's full response, appended once to a principal's log and never
//! mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::{ToolInvocationRecord, ToolRef};

/// The authenticated identity a turn and its conversation window belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a turn, monotonic per principal. Assigned by the store
/// at append time so uniqueness is enforced where ordering is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The content of an uploaded attachment as the engine sees it.
///
/// Binary uploads are reduced to a marker by the file-ingestion layer;
/// the engine never handles raw bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum AttachmentContent {
    Text(String),
    Binary,
}

/// A file attached to a user message. Created by the file-ingestion
/// collaborator before orchestration runs; read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size_bytes: u64,
    pub media_type: String,
    pub content: AttachmentContent,
}

impl Attachment {
    /// Create a text attachment.
    pub fn text(name: impl Into<String>, media_type: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            name: name.into(),
            size_bytes: body.len() as u64,
            media_type: media_type.into(),
            content: AttachmentContent::Text(body),
        }
    }

    /// Create a binary-marker attachment.
    pub fn binary(name: impl Into<String>, media_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            media_type: media_type.into(),
            content: AttachmentContent::Binary,
        }
    }
}

/// The user-supplied side of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnInput {
    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl TurnInput {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// The system-produced side of a turn: final content, the complete tool
/// invocation trace across all rounds, and the reasoning summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutput {
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_invocations: Vec<ToolInvocationRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    #[serde(default)]
    pub truncated: bool,
}

/// One completed conversational exchange. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub principal_id: PrincipalId,
    pub input: TurnInput,
    pub output: TurnOutput,
    pub created_at: DateTime<Utc>,
}

/// The externally visible reply shape, assembled from the engine's
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    pub tools_used: Vec<ToolRef>,
    pub reasoning: Option<String>,
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_attachment_tracks_size() {
        let att = Attachment::text("notes.txt", "text/plain", "hello world");
        assert_eq!(att.size_bytes, 11);
        assert_eq!(att.content, AttachmentContent::Text("hello world".into()));
    }

    #[test]
    fn binary_attachment_is_a_marker() {
        let att = Attachment::binary("photo.png", "image/png", 2048);
        assert_eq!(att.content, AttachmentContent::Binary);
        assert_eq!(att.size_bytes, 2048);
    }

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = Turn {
            id: TurnId(7),
            principal_id: "user-1".into(),
            input: TurnInput::message("hi"),
            output: TurnOutput {
                content: "hello".into(),
                tool_invocations: vec![],
                reasoning: None,
                truncated: false,
            },
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&turn).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, TurnId(7));
        assert_eq!(back.input.message, "hi");
    }
}
