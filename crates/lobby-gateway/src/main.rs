//! Gateway server entry point

use lobby_common::{try_init_tracing_with_config, AppConfig, TracingConfig};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    // Ignore if already initialized
    let _ = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env));

    tracing::info!(
        server_id = %config.server.id,
        server_type = %config.server.server_type,
        "Starting lobby gateway"
    );

    lobby_gateway::run(config).await?;

    Ok(())
}
