//! `chatforge serve` — Start the HTTP API gateway.

use std::sync::Arc;

use chatforge_config::AppConfig;
use chatforge_core::event::DomainEvent;
use chatforge_gateway::GatewayState;
use tracing::info;

use crate::runtime;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let rt = runtime::build(&config)?;

    println!("ChatForge Gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Backend:    {}", config.model.backend);
    println!("   Auth mode:  {}", config.auth.mode);
    println!("   Tools:      {}", rt.registry.snapshot().len());

    // Mirror domain events into the log for the lifetime of the server.
    let mut events = rt.event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.as_ref() {
                DomainEvent::ProviderRegistered { server, tool_count, .. } => {
                    info!(server, tool_count, "Provider registered");
                }
                DomainEvent::ModelConsulted { principal, round, requested_tools, .. } => {
                    info!(principal, round, requested_tools, "Model consulted");
                }
                DomainEvent::ToolInvoked { tool, success, latency_ms, round, .. } => {
                    info!(tool = %tool, success, latency_ms, round, "Tool invoked");
                }
                DomainEvent::TurnCompleted { principal, turn_id, rounds, tool_calls, truncated, .. } => {
                    info!(principal, turn_id, rounds, tool_calls, truncated, "Turn completed");
                }
            }
        }
    });

    let state = Arc::new(GatewayState {
        engine: rt.engine,
        registry: rt.registry,
        store: rt.store,
        authenticator: rt.authenticator,
        max_attachment_bytes: config.gateway.body_limit_bytes as u64,
        search_limit: config.engine.search_limit,
        history_limit: config.engine.history_limit,
    });

    chatforge_gateway::serve(
        state,
        &config.gateway.host,
        config.gateway.port,
        config.gateway.body_limit_bytes,
    )
    .await?;

    Ok(())
}
