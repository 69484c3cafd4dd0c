//! `chatforge chat` — Run one orchestrated turn from the terminal.

use chatforge_config::AppConfig;
use chatforge_engine::TurnRequest;
use tokio_util::sync::CancellationToken;

use crate::runtime;

pub async fn run(message: String, principal: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let rt = runtime::build(&config)?;

    let cancel = CancellationToken::new();

    // Ctrl-C aborts the in-flight turn; nothing is recorded.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let reply = rt
        .engine
        .run_turn(
            TurnRequest {
                principal: principal.as_str().into(),
                message,
                attachments: vec![],
            },
            cancel,
        )
        .await?;

    println!("{}", reply.content);

    if !reply.tools_used.is_empty() {
        let names: Vec<String> = reply.tools_used.iter().map(|t| t.to_string()).collect();
        eprintln!("[tools: {}]", names.join(", "));
    }
    if let Some(reasoning) = &reply.reasoning {
        eprintln!("[reasoning: {reasoning}]");
    }
    if reply.truncated {
        eprintln!("[truncated: turn hit its round or time budget]");
    }

    Ok(())
}
