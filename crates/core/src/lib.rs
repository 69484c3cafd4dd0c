//! # chatforge Core
//!
//! Domain types, traits, and error definitions for the chatforge
//! orchestration service. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: tool providers,
//! the model backend, the conversation store, the authenticator.
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Deterministic testing with stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod auth;
pub mod error;
pub mod event;
pub mod model;
pub mod store;
pub mod tool;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use auth::Authenticator;
pub use error::{
    AuthError, EngineError, Error, ModelError, RegistryError, Result, StorageError, ToolError,
};
pub use event::{DomainEvent, EventBus};
pub use model::{DecisionRequest, ModelBackend, ModelDecision};
pub use store::{ConversationStore, NewTurn};
pub use tool::{
    InvocationFailure, InvocationOutcome, ToolCallRequest, ToolInvocationRecord, ToolProvider,
    ToolRef, ToolSpec,
};
pub use turn::{Attachment, AttachmentContent, PrincipalId, Reply, Turn, TurnId, TurnInput, TurnOutput};
