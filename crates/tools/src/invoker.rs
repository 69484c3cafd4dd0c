//! The tool invoker — executes a single tool call with a bounded timeout.
//!
//! All outcomes are values: schema mismatches short-circuit to
//! `InvalidArguments` without contacting the provider, a hung provider
//! yields `Timeout`, and provider errors are normalized into failure
//! variants. Nothing raises across this boundary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, warn};

use chatforge_core::event::{DomainEvent, EventBus};
use chatforge_core::tool::{
    InvocationFailure, InvocationOutcome, ToolCallRequest, ToolInvocationRecord,
};
use chatforge_core::error::ToolError;

use crate::registry::ResolvedTool;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes single tool calls against their owning providers.
#[derive(Clone)]
pub struct ToolInvoker {
    timeout: Duration,
    event_bus: Option<Arc<EventBus>>,
}

impl ToolInvoker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            event_bus: None,
        }
    }

    /// Publish `ToolInvoked` events on this bus.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Execute one call. Always returns a record — success or failure —
    /// for the turn's trace.
    pub async fn invoke(
        &self,
        tool: &ResolvedTool,
        request: &ToolCallRequest,
        round: u32,
    ) -> ToolInvocationRecord {
        let start = Instant::now();
        let outcome = self.dispatch(tool, request).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            InvocationOutcome::Success(_) => {
                debug!(tool = %request.tool, latency_ms, round, "Tool call succeeded");
            }
            InvocationOutcome::Failure(failure) => {
                warn!(tool = %request.tool, latency_ms, round, %failure, "Tool call failed");
            }
        }

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ToolInvoked {
                tool: request.tool.clone(),
                success: outcome.is_success(),
                latency_ms,
                round,
                timestamp: Utc::now(),
            });
        }

        ToolInvocationRecord {
            call_id: request.call_id.clone(),
            tool: request.tool.clone(),
            arguments: request.arguments.clone(),
            outcome,
            latency_ms,
            round,
        }
    }

    async fn dispatch(&self, tool: &ResolvedTool, request: &ToolCallRequest) -> InvocationOutcome {
        if let Err(failure) = validate_arguments(&tool.spec.input_schema, &request.arguments) {
            return InvocationOutcome::Failure(failure);
        }

        let call = tool
            .provider
            .call_tool(&request.tool.name, request.arguments.clone());

        match tokio::time::timeout(self.timeout, call).await {
            Err(_elapsed) => InvocationOutcome::Failure(InvocationFailure::Timeout),
            Ok(Ok(payload)) => InvocationOutcome::Success(payload),
            Ok(Err(ToolError::Unavailable(_))) => {
                InvocationOutcome::Failure(InvocationFailure::ProviderUnavailable)
            }
            Ok(Err(ToolError::InvalidArguments(detail))) => {
                InvocationOutcome::Failure(InvocationFailure::InvalidArguments(detail))
            }
            Ok(Err(err)) => InvocationOutcome::Failure(InvocationFailure::Provider(err.to_string())),
        }
    }
}

impl Default for ToolInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// Validate arguments against the tool's declared JSON Schema.
///
/// A schema the registry accepted but the validator cannot compile is a
/// provider defect, reported as a provider failure rather than blamed on
/// the caller's arguments.
fn validate_arguments(
    schema: &serde_json::Value,
    arguments: &serde_json::Value,
) -> Result<(), InvocationFailure> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| InvocationFailure::Provider(format!("invalid tool schema: {e}")))?;

    let errors: Vec<String> = validator.iter_errors(arguments).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(InvocationFailure::InvalidArguments(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use chatforge_core::tool::{ToolProvider, ToolRef, ToolSpec};

    /// Provider stub that counts calls — used to assert that schema
    /// mismatches never reach the provider.
    struct CountingProvider {
        calls: AtomicUsize,
        hang: bool,
    }

    impl CountingProvider {
        fn new(hang: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                hang,
            })
        }
    }

    #[async_trait]
    impl ToolProvider for CountingProvider {
        fn server(&self) -> &str {
            "stub"
        }

        fn tools(&self) -> Vec<ToolSpec> {
            vec![spec()]
        }

        async fn call_tool(
            &self,
            _name: &str,
            arguments: serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                // Simulates a provider that never returns
                std::future::pending::<()>().await;
            }
            Ok(serde_json::json!({"echo": arguments}))
        }
    }

    fn spec() -> ToolSpec {
        ToolSpec {
            server: "stub".into(),
            name: "echo".into(),
            description: "echoes arguments".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" }
                },
                "required": ["query"]
            }),
        }
    }

    fn resolved(provider: Arc<CountingProvider>) -> ResolvedTool {
        ResolvedTool {
            spec: spec(),
            provider,
        }
    }

    fn request(arguments: serde_json::Value) -> ToolCallRequest {
        ToolCallRequest::new(ToolRef::new("stub", "echo"), arguments)
    }

    #[tokio::test]
    async fn valid_arguments_reach_the_provider() {
        let provider = CountingProvider::new(false);
        let invoker = ToolInvoker::default();

        let record = invoker
            .invoke(&resolved(provider.clone()), &request(serde_json::json!({"query": "hi"})), 1)
            .await;

        assert!(record.outcome.is_success());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.round, 1);
    }

    #[tokio::test]
    async fn schema_mismatch_short_circuits_without_provider_contact() {
        let provider = CountingProvider::new(false);
        let invoker = ToolInvoker::default();

        let record = invoker
            .invoke(&resolved(provider.clone()), &request(serde_json::json!({"query": 42})), 1)
            .await;

        assert!(matches!(
            record.outcome,
            InvocationOutcome::Failure(InvocationFailure::InvalidArguments(_))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0, "provider must not be contacted");
    }

    #[tokio::test]
    async fn missing_required_field_is_invalid() {
        let provider = CountingProvider::new(false);
        let invoker = ToolInvoker::default();

        let record = invoker
            .invoke(&resolved(provider.clone()), &request(serde_json::json!({})), 2)
            .await;

        assert!(matches!(
            record.outcome,
            InvocationOutcome::Failure(InvocationFailure::InvalidArguments(_))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hung_provider_yields_timeout() {
        let provider = CountingProvider::new(true);
        let invoker = ToolInvoker::new(Duration::from_millis(50));

        let record = invoker
            .invoke(&resolved(provider), &request(serde_json::json!({"query": "hi"})), 1)
            .await;

        assert_eq!(
            record.outcome,
            InvocationOutcome::Failure(InvocationFailure::Timeout)
        );
    }

    #[tokio::test]
    async fn unavailable_provider_maps_to_failure_variant() {
        struct DownProvider;

        #[async_trait]
        impl ToolProvider for DownProvider {
            fn server(&self) -> &str {
                "down"
            }
            fn tools(&self) -> Vec<ToolSpec> {
                vec![]
            }
            async fn call_tool(
                &self,
                _name: &str,
                _arguments: serde_json::Value,
            ) -> Result<serde_json::Value, ToolError> {
                Err(ToolError::Unavailable("connection refused".into()))
            }
        }

        let tool = ResolvedTool {
            spec: ToolSpec {
                input_schema: serde_json::json!({"type": "object"}),
                ..spec()
            },
            provider: Arc::new(DownProvider),
        };
        let invoker = ToolInvoker::default();
        let record = invoker.invoke(&tool, &request(serde_json::json!({})), 1).await;

        assert_eq!(
            record.outcome,
            InvocationOutcome::Failure(InvocationFailure::ProviderUnavailable)
        );
    }
}
