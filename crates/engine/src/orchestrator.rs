//! The orchestration control loop.
//!
//! One turn runs `Idle → Deciding → (ExecutingTools → Deciding)* →
//! Finalizing → Done`, with `Aborted` reachable from any state on
//! cancellation or a fatal collaborator failure. Sibling tool calls within
//! a round execute concurrently; rounds are strictly sequential.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatforge_core::error::{EngineError, ModelError};
use chatforge_core::event::{DomainEvent, EventBus};
use chatforge_core::model::{DecisionRequest, ModelBackend, ModelDecision};
use chatforge_core::store::{ConversationStore, NewTurn};
use chatforge_core::tool::{
    InvocationFailure, InvocationOutcome, ToolCallRequest, ToolInvocationRecord,
};
use chatforge_core::turn::{Attachment, PrincipalId, Reply, TurnInput, TurnOutput};
use chatforge_tools::{ToolInvoker, ToolRegistry, ToolSnapshot};

use crate::assembler::assemble_reply;

/// Budgets and limits for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum decide→execute cycles per turn.
    pub max_rounds: u32,

    /// Per-tool-call timeout, enforced at the invoker boundary.
    pub tool_timeout: Duration,

    /// Overall wall-clock deadline for one turn.
    pub deadline: Duration,

    /// How many recent turns to load as the conversation window.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            tool_timeout: Duration::from_secs(30),
            deadline: Duration::from_secs(120),
            history_limit: 50,
        }
    }
}

/// A new inbound turn, already authenticated and ingested.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub principal: PrincipalId,
    pub message: String,
    pub attachments: Vec<Attachment>,
}

/// The orchestration engine. All collaborators are explicit instances
/// injected at construction; the engine owns no global state.
pub struct OrchestrationEngine {
    model: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    store: Arc<dyn ConversationStore>,
    invoker: ToolInvoker,
    event_bus: Arc<EventBus>,
    config: EngineConfig,
}

impl OrchestrationEngine {
    pub fn new(
        model: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn ConversationStore>,
        event_bus: Arc<EventBus>,
        config: EngineConfig,
    ) -> Self {
        let invoker = ToolInvoker::new(config.tool_timeout).with_event_bus(event_bus.clone());
        Self {
            model,
            registry,
            store,
            invoker,
            event_bus,
            config,
        }
    }

    /// Orchestrate one turn to completion.
    ///
    /// On success the turn is appended to the store and the assembled reply
    /// returned. On cancellation or a fatal collaborator failure nothing is
    /// appended — the caller sees a transport-level error, never a
    /// malformed reply. Budget exhaustion is not an error: it degrades into
    /// a reply flagged `truncated`.
    pub async fn run_turn(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> Result<Reply, EngineError> {
        info!(
            principal = %request.principal,
            attachments = request.attachments.len(),
            "Orchestrating turn"
        );

        let window = self
            .store
            .recent(&request.principal, self.config.history_limit)
            .await?;

        // One frozen snapshot per turn: no tool appears or disappears
        // across this turn's rounds.
        let snapshot = self.registry.snapshot();
        let tool_specs = snapshot.specs();
        let deadline = tokio::time::Instant::now() + self.config.deadline;

        let mut trace: Vec<ToolInvocationRecord> = Vec::new();
        let mut terminal: Option<(String, Option<String>)> = None;
        let mut rounds_run = 0u32;

        for round in 1..=self.config.max_rounds {
            rounds_run = round;

            let decision_request = DecisionRequest {
                message: request.message.clone(),
                attachments: request.attachments.clone(),
                window: window.clone(),
                tools: tool_specs.clone(),
                tool_results: trace.clone(),
                round,
            };

            // ── Deciding ──
            let decision = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(principal = %request.principal, round, "Turn cancelled while deciding");
                    return Err(EngineError::Cancelled);
                }
                outcome = tokio::time::timeout_at(deadline, self.model.decide(decision_request)) => {
                    match outcome {
                        Err(_elapsed) => {
                            warn!(principal = %request.principal, round, "Deadline hit while deciding");
                            break;
                        }
                        Ok(Ok(decision)) => decision,
                        Ok(Err(ModelError::Unavailable(detail))) => {
                            return Err(EngineError::ModelUnavailable(detail));
                        }
                        Ok(Err(ModelError::Malformed(detail))) => {
                            return Err(EngineError::ModelUnavailable(format!(
                                "malformed decision: {detail}"
                            )));
                        }
                    }
                }
            };

            match decision {
                ModelDecision::Answer { content, reasoning } => {
                    self.publish_consulted(&request.principal, round, 0);
                    terminal = Some((content, reasoning));
                    break;
                }
                ModelDecision::CallTools(batch) => {
                    self.publish_consulted(&request.principal, round, batch.len());
                    debug!(round, calls = batch.len(), "Executing tool round");

                    // ── ExecutingTools ── fan-out, fan-in; dropping this
                    // future on cancellation aborts in-flight calls.
                    let records = tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!(principal = %request.principal, round, "Turn cancelled mid-round");
                            return Err(EngineError::Cancelled);
                        }
                        records = self.execute_round(&snapshot, batch, round) => records,
                    };
                    trace.extend(records);

                    if tokio::time::Instant::now() >= deadline {
                        warn!(principal = %request.principal, round, "Deadline hit after tool round");
                        break;
                    }
                }
            }
        }

        // ── Finalizing ──
        let truncated = terminal.is_none();
        let (content, reasoning) = match terminal {
            Some(t) => t,
            None => (budget_exhausted_answer(&trace), None),
        };

        let reply = assemble_reply(content.clone(), reasoning.clone(), truncated, &trace);

        let appended = self
            .store
            .append(
                &request.principal,
                NewTurn {
                    input: TurnInput {
                        message: request.message,
                        attachments: request.attachments,
                    },
                    output: TurnOutput {
                        content,
                        tool_invocations: trace,
                        reasoning,
                        truncated,
                    },
                },
            )
            .await?;

        self.event_bus.publish(DomainEvent::TurnCompleted {
            principal: appended.principal_id.to_string(),
            turn_id: appended.id.0,
            rounds: rounds_run,
            tool_calls: appended.output.tool_invocations.len(),
            truncated,
            timestamp: Utc::now(),
        });
        info!(
            principal = %appended.principal_id,
            turn_id = %appended.id,
            rounds = rounds_run,
            truncated,
            "Turn complete"
        );

        Ok(reply)
    }

    /// Execute one round's batch concurrently. Sibling calls carry no
    /// relative ordering guarantee and identical requests are not
    /// deduplicated; records come back in completion order.
    async fn execute_round(
        &self,
        snapshot: &ToolSnapshot,
        batch: Vec<ToolCallRequest>,
        round: u32,
    ) -> Vec<ToolInvocationRecord> {
        let width = batch.len().max(1);
        stream::iter(batch)
            .map(|call| async move {
                match snapshot.resolve(&call.tool) {
                    Ok(tool) => self.invoker.invoke(tool, &call, round).await,
                    // The model asked for a tool outside the frozen
                    // snapshot: report it as a failure record, never crash
                    // the round.
                    Err(err) => ToolInvocationRecord {
                        call_id: call.call_id,
                        tool: call.tool,
                        arguments: call.arguments,
                        outcome: InvocationOutcome::Failure(InvocationFailure::Provider(
                            err.to_string(),
                        )),
                        latency_ms: 0,
                        round,
                    },
                }
            })
            .buffer_unordered(width)
            .collect()
            .await
    }

    fn publish_consulted(&self, principal: &PrincipalId, round: u32, requested_tools: usize) {
        self.event_bus.publish(DomainEvent::ModelConsulted {
            principal: principal.to_string(),
            round,
            requested_tools,
            timestamp: Utc::now(),
        });
    }
}

/// Best-effort partial answer when the round or wall-clock budget runs out
/// before the model produces a final answer.
fn budget_exhausted_answer(trace: &[ToolInvocationRecord]) -> String {
    if trace.is_empty() {
        return "I could not finish working on this request within its time budget. \
                Please try again or narrow the question."
            .to_string();
    }
    let successes = trace.iter().filter(|r| r.outcome.is_success()).count();
    format!(
        "I ran out of budget before reaching a final answer. \
         {} of {} tool calls completed successfully; their results are recorded with this turn.",
        successes,
        trace.len()
    )
}
