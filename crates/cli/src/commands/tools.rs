//! `chatforge tools` — List the registered tools.

use chatforge_config::AppConfig;

use crate::runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let rt = runtime::build(&config)?;

    let specs = rt.registry.snapshot().specs();
    println!("{} tools registered:\n", specs.len());
    for spec in specs {
        println!("  {}/{}", spec.server, spec.name);
        println!("      {}", spec.description);
        println!(
            "      schema: {}",
            serde_json::to_string(&spec.input_schema)?
        );
        println!();
    }

    Ok(())
}
