//! OpenAI-compatible model backend.
//!
//! Works with any provider exposing a `/chat/completions` endpoint:
//! OpenAI, OpenRouter, Ollama, vLLM, Together AI, and friends.
//!
//! The backend owns its retry policy: transient failures (network errors,
//! 429, 5xx) are retried with exponential backoff; once retries are
//! exhausted the engine sees a single `ModelError::Unavailable`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chatforge_core::error::ModelError;
use chatforge_core::model::{DecisionRequest, ModelBackend, ModelDecision};
use chatforge_core::tool::{ToolCallRequest, ToolInvocationRecord, ToolRef, ToolSpec};
use chatforge_core::turn::{Attachment, AttachmentContent};

/// Tool names on the wire are `server__name` since function names may not
/// contain `/`.
const TOOL_NAME_SEPARATOR: &str = "__";

pub struct OpenAiCompatBackend {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_retries: 2,
            client,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    async fn attempt(&self, body: &serde_json::Value) -> Result<ModelDecision, AttemptError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(format!("network: {e}")))?;

        let status = response.status().as_u16();
        match status {
            200 => {}
            429 => return Err(AttemptError::Transient("rate limited".into())),
            401 | 403 => {
                return Err(AttemptError::Fatal(
                    "authentication failed — check the API key".into(),
                ));
            }
            s if s >= 500 => {
                return Err(AttemptError::Transient(format!("server error {s}")));
            }
            s => {
                let detail = response.text().await.unwrap_or_default();
                return Err(AttemptError::Fatal(format!("status {s}: {detail}")));
            }
        }

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Fatal(format!("unparseable response: {e}")))?;

        let choice = api
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AttemptError::Fatal("no choices in response".into()))?;

        let tool_calls = choice.message.tool_calls.unwrap_or_default();
        if tool_calls.is_empty() {
            return Ok(ModelDecision::Answer {
                content: choice.message.content.unwrap_or_default(),
                reasoning: None,
            });
        }

        let mut batch = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            let arguments: serde_json::Value = serde_json::from_str(&call.function.arguments)
                .map_err(|e| {
                    AttemptError::Malformed(format!(
                        "tool call arguments for {}: {e}",
                        call.function.name
                    ))
                })?;
            batch.push(ToolCallRequest {
                call_id: call.id,
                tool: decode_tool_name(&call.function.name),
                arguments,
            });
        }
        Ok(ModelDecision::CallTools(batch))
    }
}

enum AttemptError {
    /// Worth retrying with backoff.
    Transient(String),
    /// Retrying won't help.
    Fatal(String),
    /// The provider answered but the decision is unusable.
    Malformed(String),
}

#[async_trait]
impl ModelBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn decide(&self, request: DecisionRequest) -> Result<ModelDecision, ModelError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": build_messages(&request),
            "temperature": self.temperature,
            "stream": false,
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(to_api_tools(&request.tools));
        }

        let mut last_transient = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = std::time::Duration::from_millis(250 * (1 << attempt));
                debug!(attempt, ?backoff, "Retrying model request");
                tokio::time::sleep(backoff).await;
            }
            match self.attempt(&body).await {
                Ok(decision) => return Ok(decision),
                Err(AttemptError::Transient(detail)) => {
                    warn!(attempt, detail = %detail, "Transient model backend failure");
                    last_transient = detail;
                }
                Err(AttemptError::Fatal(detail)) => {
                    return Err(ModelError::Unavailable(detail));
                }
                Err(AttemptError::Malformed(detail)) => {
                    return Err(ModelError::Malformed(detail));
                }
            }
        }
        Err(ModelError::Unavailable(format!(
            "retries exhausted: {last_transient}"
        )))
    }
}

// ── Wire format ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct ApiToolDefinition {
    r#type: &'static str,
    function: ApiToolFunction,
}

#[derive(Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

fn encode_tool_name(tool: &ToolRef) -> String {
    format!("{}{}{}", tool.server, TOOL_NAME_SEPARATOR, tool.name)
}

fn decode_tool_name(wire_name: &str) -> ToolRef {
    match wire_name.split_once(TOOL_NAME_SEPARATOR) {
        Some((server, name)) => ToolRef::new(server, name),
        // No separator: let resolution against the snapshot report it.
        None => ToolRef::new("", wire_name),
    }
}

fn to_api_tools(tools: &[ToolSpec]) -> Vec<ApiToolDefinition> {
    tools
        .iter()
        .map(|t| ApiToolDefinition {
            r#type: "function",
            function: ApiToolFunction {
                name: encode_tool_name(&t.tool_ref()),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}

fn render_user_content(message: &str, attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return message.to_string();
    }
    let mut content = String::from(message);
    for att in attachments {
        match &att.content {
            AttachmentContent::Text(body) => {
                content.push_str(&format!(
                    "\n\n[attachment {} ({}, {} bytes)]\n{}",
                    att.name, att.media_type, att.size_bytes, body
                ));
            }
            AttachmentContent::Binary => {
                content.push_str(&format!(
                    "\n\n[binary attachment {} ({}, {} bytes)]",
                    att.name, att.media_type, att.size_bytes
                ));
            }
        }
    }
    content
}

/// Rebuild the chat transcript for one decision: system prompt, the
/// conversation window, the new message, then each earlier round of this
/// turn as an assistant tool-call message followed by its tool results.
fn build_messages(request: &DecisionRequest) -> Vec<ApiMessage> {
    let mut messages = Vec::new();

    messages.push(ApiMessage {
        role: "system",
        content: Some(
            "You are a helpful assistant. Use the available tools when they help you answer; \
             otherwise answer directly. Tool failures are reported to you — recover or explain."
                .into(),
        ),
        tool_calls: None,
        tool_call_id: None,
    });

    for turn in &request.window {
        messages.push(ApiMessage {
            role: "user",
            content: Some(render_user_content(
                &turn.input.message,
                &turn.input.attachments,
            )),
            tool_calls: None,
            tool_call_id: None,
        });
        messages.push(ApiMessage {
            role: "assistant",
            content: Some(turn.output.content.clone()),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    messages.push(ApiMessage {
        role: "user",
        content: Some(render_user_content(&request.message, &request.attachments)),
        tool_calls: None,
        tool_call_id: None,
    });

    let max_round = request.tool_results.iter().map(|r| r.round).max().unwrap_or(0);
    for round in 1..=max_round {
        let records: Vec<&ToolInvocationRecord> = request
            .tool_results
            .iter()
            .filter(|r| r.round == round)
            .collect();
        if records.is_empty() {
            continue;
        }
        messages.push(ApiMessage {
            role: "assistant",
            content: None,
            tool_calls: Some(
                records
                    .iter()
                    .map(|r| ApiToolCall {
                        id: r.call_id.clone(),
                        r#type: "function".into(),
                        function: ApiFunction {
                            name: encode_tool_name(&r.tool),
                            arguments: r.arguments.to_string(),
                        },
                    })
                    .collect(),
            ),
            tool_call_id: None,
        });
        for record in records {
            messages.push(ApiMessage {
                role: "tool",
                content: Some(
                    serde_json::to_string(&record.outcome).unwrap_or_else(|_| "{}".into()),
                ),
                tool_calls: None,
                tool_call_id: Some(record.call_id.clone()),
            });
        }
    }

    messages
}
