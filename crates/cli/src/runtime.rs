//! Shared wiring: configuration in, a fully assembled runtime out.
//!
//! Every command builds the same stack the same way. No singletons; each
//! invocation constructs its own registry, store, engine, and bus.

use std::sync::Arc;
use std::time::Duration;

use chatforge_auth::{DevAuthenticator, StaticTokenAuthenticator};
use chatforge_config::AppConfig;
use chatforge_core::auth::Authenticator;
use chatforge_core::event::EventBus;
use chatforge_core::model::ModelBackend;
use chatforge_engine::{EngineConfig, OrchestrationEngine};
use chatforge_memory::InMemoryConversationStore;
use chatforge_providers::{MockBackend, OpenAiCompatBackend};
use chatforge_tools::ToolRegistry;

pub struct Runtime {
    pub engine: Arc<OrchestrationEngine>,
    pub registry: Arc<ToolRegistry>,
    pub store: Arc<InMemoryConversationStore>,
    pub authenticator: Arc<dyn Authenticator>,
    pub event_bus: Arc<EventBus>,
}

pub fn build(config: &AppConfig) -> Result<Runtime, Box<dyn std::error::Error>> {
    let event_bus = Arc::new(EventBus::default());

    let registry = Arc::new(ToolRegistry::new().with_event_bus(event_bus.clone()));
    for provider in chatforge_tools::default_providers() {
        registry.register(provider)?;
    }

    let model: Arc<dyn ModelBackend> = match config.model.backend.as_str() {
        "openai" => {
            let api_key = config
                .model
                .api_key
                .as_deref()
                .ok_or("model.api_key is required for the openai backend")?;
            Arc::new(
                OpenAiCompatBackend::new(&config.model.base_url, api_key, &config.model.model)
                    .with_temperature(config.model.temperature)
                    .with_max_retries(config.model.max_retries),
            )
        }
        "mock" => Arc::new(MockBackend),
        other => return Err(format!("unknown model backend \"{other}\"").into()),
    };

    let authenticator: Arc<dyn Authenticator> = match config.auth.mode.as_str() {
        "static" => Arc::new(StaticTokenAuthenticator::new(
            config
                .auth
                .tokens
                .iter()
                .map(|(token, principal)| (token.as_str(), principal.as_str())),
        )),
        "dev" => Arc::new(DevAuthenticator::new(config.auth.dev_principal.as_str())),
        other => return Err(format!("unknown auth mode \"{other}\"").into()),
    };

    let store = Arc::new(InMemoryConversationStore::new());
    let engine = Arc::new(OrchestrationEngine::new(
        model,
        registry.clone(),
        store.clone(),
        event_bus.clone(),
        EngineConfig {
            max_rounds: config.engine.max_rounds,
            tool_timeout: Duration::from_secs(config.engine.tool_timeout_secs),
            deadline: Duration::from_secs(config.engine.deadline_secs),
            history_limit: config.engine.history_limit,
        },
    ));

    Ok(Runtime {
        engine,
        registry,
        store,
        authenticator,
        event_bus,
    })
}
