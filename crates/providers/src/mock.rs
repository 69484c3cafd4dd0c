//! Mock backend — deterministic offline responses for development.
//!
//! Answers every turn directly, describing what it received. Lets the
//! whole service run end-to-end with no API key and no network.

use async_trait::async_trait;

use chatforge_core::error::ModelError;
use chatforge_core::model::{DecisionRequest, ModelBackend, ModelDecision};

pub struct MockBackend;

#[async_trait]
impl ModelBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn decide(&self, request: DecisionRequest) -> Result<ModelDecision, ModelError> {
        Ok(ModelDecision::Answer {
            content: format!(
                "Hello! I received your message: \"{}\". I can see {} tool(s), {} attachment(s), \
                 and {} earlier turn(s) of conversation. This is an offline development response.",
                request.message,
                request.tools.len(),
                request.attachments.len(),
                request.window.len(),
            ),
            reasoning: Some("mock backend always answers directly".into()),
        })
    }
}
