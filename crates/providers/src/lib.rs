//! Model backend implementations for chatforge.
//!
//! The engine only sees the `ModelBackend` trait; these are the concrete
//! collaborators behind it:
//! - [`OpenAiCompatBackend`] — any OpenAI-compatible `/chat/completions`
//!   endpoint (OpenAI, OpenRouter, Ollama, vLLM, ...).
//! - [`MockBackend`] — deterministic offline backend for development.
//! - [`ScriptedBackend`] — fixed decision script for tests and demos.

pub mod mock;
pub mod openai_compat;
pub mod scripted;

pub use mock::MockBackend;
pub use openai_compat::OpenAiCompatBackend;
pub use scripted::ScriptedBackend;
