//! Scripted backend — a fixed queue of decisions for tests and demos.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use chatforge_core::error::ModelError;
use chatforge_core::model::{DecisionRequest, ModelBackend, ModelDecision};

/// Returns decisions from a front-to-back script. When the script is
/// exhausted, returns the fallback if one is set, otherwise
/// `ModelError::Unavailable`. Records how many tool results each decide
/// call observed, so tests can assert that rounds fold results forward.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<ModelDecision>>,
    fallback: Option<ModelDecision>,
    calls: AtomicU32,
    results_seen: Mutex<Vec<usize>>,
}

impl ScriptedBackend {
    pub fn new(decisions: Vec<ModelDecision>) -> Self {
        Self {
            script: Mutex::new(decisions.into()),
            fallback: None,
            calls: AtomicU32::new(0),
            results_seen: Mutex::new(Vec::new()),
        }
    }

    /// Decision to repeat forever once the script runs out.
    pub fn with_fallback(mut self, decision: ModelDecision) -> Self {
        self.fallback = Some(decision);
        self
    }

    /// How many times `decide` has been called.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// `tool_results.len()` observed by each decide call, in order.
    pub fn results_seen(&self) -> Vec<usize> {
        self.results_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, request: DecisionRequest) -> Result<ModelDecision, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.tool_results.len());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        match next.or_else(|| self.fallback.clone()) {
            Some(decision) => Ok(decision),
            None => Err(ModelError::Unavailable("script exhausted".into())),
        }
    }
}
