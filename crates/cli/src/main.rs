//! ChatForge CLI — the main entry point.
//!
//! Commands:
//! - `serve` — Start the HTTP API gateway
//! - `chat`  — Run a single orchestrated turn from the terminal
//! - `tools` — List the registered tools

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "chatforge",
    about = "ChatForge — tool-augmented chat orchestration service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API gateway
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send a single message and print the reply
    Chat {
        /// The message to send
        message: String,

        /// Principal to run the turn as
        #[arg(short = 'u', long, default_value = "dev-user")]
        principal: String,
    },

    /// List registered tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { message, principal } => commands::chat::run(message, principal).await?,
        Commands::Tools => commands::tools::run().await?,
    }

    Ok(())
}
