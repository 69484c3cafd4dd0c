//! Error types for the chatforge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; `Error` is the top-level
//! umbrella used at crate boundaries that span contexts.

use thiserror::Error;

/// The top-level error type for all chatforge operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Authentication failures. Surfaced before orchestration ever begins.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Credential rejected: {0}")]
    Rejected(String),
}

/// Tool registry failures.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Duplicate tool: {server}/{name} is already registered")]
    DuplicateTool { server: String, name: String },

    #[error("Unknown tool: {server}/{name}")]
    UnknownTool { server: String, name: String },
}

/// Errors raised by tool providers. The invoker converts these into
/// invocation outcome values; they never cross the engine boundary as `Err`.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Model backend failures, after the backend's own retry policy.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("Model backend unavailable: {0}")]
    Unavailable(String),

    #[error("Model backend returned a malformed decision: {0}")]
    Malformed(String),
}

/// Conversation store failures.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures that are fatal to a single orchestrated turn.
///
/// None of these results in a turn being appended to the store; the caller
/// sees a transport-level failure, never a malformed reply. Budget
/// exhaustion is deliberately absent — it degrades into a truncated reply.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model backend unavailable: {0}")]
    ModelUnavailable(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Turn cancelled by caller")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_displays_tool_key() {
        let err = Error::Registry(RegistryError::DuplicateTool {
            server: "memory".into(),
            name: "store_memory".into(),
        });
        assert!(err.to_string().contains("memory/store_memory"));
    }

    #[test]
    fn engine_error_wraps_storage() {
        let err = EngineError::from(StorageError::Unavailable("disk gone".into()));
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn auth_error_displays_reason() {
        let err = AuthError::Rejected("token expired".into());
        assert!(err.to_string().contains("token expired"));
    }
}
