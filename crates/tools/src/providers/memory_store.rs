//! Memory tool provider — an in-process key-value store.
//!
//! Exposes `store_memory` and `recall_memory` under the `memory` server id.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use chatforge_core::error::ToolError;
use chatforge_core::tool::{ToolProvider, ToolSpec};

pub const SERVER: &str = "memory";

/// Key-value memory tools backed by an in-process map.
pub struct MemoryToolProvider {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryToolProvider {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryToolProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn required_str<'a>(args: &'a serde_json::Value, field: &str) -> Result<&'a str, ToolError> {
    args[field]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string field `{field}`")))
}

#[async_trait]
impl ToolProvider for MemoryToolProvider {
    fn server(&self) -> &str {
        SERVER
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                server: SERVER.into(),
                name: "store_memory".into(),
                description: "Store a piece of information under a key for later recall".into(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "key": { "type": "string" },
                        "value": { "type": "string" }
                    },
                    "required": ["key", "value"]
                }),
            },
            ToolSpec {
                server: SERVER.into(),
                name: "recall_memory".into(),
                description: "Recall a previously stored piece of information by key".into(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "key": { "type": "string" }
                    },
                    "required": ["key"]
                }),
            },
        ]
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        match name {
            "store_memory" => {
                let key = required_str(&arguments, "key")?;
                let value = required_str(&arguments, "value")?;
                self.entries
                    .write()
                    .await
                    .insert(key.to_string(), value.to_string());
                Ok(serde_json::json!({ "stored": true, "key": key }))
            }
            "recall_memory" => {
                let key = required_str(&arguments, "key")?;
                let entries = self.entries.read().await;
                Ok(match entries.get(key) {
                    Some(value) => serde_json::json!({ "found": true, "key": key, "value": value }),
                    None => serde_json::json!({ "found": false, "key": key }),
                })
            }
            other => Err(ToolError::ExecutionFailed {
                tool_name: other.to_string(),
                reason: "not a memory tool".into(),
            }),
        }
    }
}
