//! The orchestration engine for chatforge.
//!
//! Turns one user message plus conversation history plus a frozen tool
//! snapshot into a sequence of model decisions and concurrent tool
//! invocations, bounded by round and wall-clock budgets.

pub mod assembler;
pub mod orchestrator;

pub use assembler::assemble_reply;
pub use orchestrator::{EngineConfig, OrchestrationEngine, TurnRequest};
