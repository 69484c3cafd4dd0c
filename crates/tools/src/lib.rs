//! Tool registry, invoker, and built-in tool providers for chatforge.
//!
//! The registry holds the set of callable tools currently available and
//! hands out frozen snapshots for orchestration rounds. The invoker
//! executes a single tool call with schema validation and a bounded
//! timeout, normalizing every outcome into a value.

pub mod invoker;
pub mod providers;
pub mod registry;

pub use invoker::ToolInvoker;
pub use registry::{ResolvedTool, ToolRegistry, ToolSnapshot};

use std::sync::Arc;

use chatforge_core::tool::ToolProvider;

/// The built-in in-process providers: a key-value memory server and a
/// deterministic web-search stub.
pub fn default_providers() -> Vec<Arc<dyn ToolProvider>> {
    vec![
        Arc::new(providers::memory_store::MemoryToolProvider::new()),
        Arc::new(providers::web_search::WebSearchProvider),
    ]
}
