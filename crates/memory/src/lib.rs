//! Conversation store backends for chatforge.
//!
//! The store is the append-only per-principal turn log the orchestration
//! engine reads and writes. The in-memory backend is the default for
//! development and tests; durable backends implement the same
//! `ConversationStore` trait from `chatforge-core`.

pub mod in_memory;

pub use in_memory::InMemoryConversationStore;
