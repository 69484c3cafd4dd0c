//! Web search tool provider — a deterministic stub.
//!
//! In production this would call a real search API. The stub returns
//! plausible results derived from the query so the orchestration loop can
//! be exercised end-to-end without network access.

use async_trait::async_trait;
use serde::Serialize;

use chatforge_core::error::ToolError;
use chatforge_core::tool::{ToolProvider, ToolSpec};

pub const SERVER: &str = "web_search";

pub struct WebSearchProvider;

#[derive(Serialize, Clone)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

#[async_trait]
impl ToolProvider for WebSearchProvider {
    fn server(&self) -> &str {
        SERVER
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![ToolSpec {
            server: SERVER.into(),
            name: "search_web".into(),
            description: "Search the web for information. Returns result titles, URLs, and snippets.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "num_results": { "type": "integer", "minimum": 1, "maximum": 10 }
                },
                "required": ["query"]
            }),
        }]
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        if name != "search_web" {
            return Err(ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: "not a web_search tool".into(),
            });
        }
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("missing string field `query`".into()))?;
        let count = arguments["num_results"].as_u64().unwrap_or(3).clamp(1, 10) as usize;

        let results = stub_results(query, count);
        serde_json::to_value(&results).map_err(|e| ToolError::ExecutionFailed {
            tool_name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

fn stub_results(query: &str, count: usize) -> Vec<SearchResult> {
    let slug: String = query
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();

    (1..=count)
        .map(|i| SearchResult {
            title: format!("{query} — result {i}"),
            url: format!("https://search.example.com/{slug}/{i}"),
            snippet: format!("Summary {i} of what the web says about \"{query}\"."),
        })
        .collect()
}
