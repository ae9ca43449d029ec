#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod api;
mod config;
mod gateway;
mod middleware;

use std::sync::Arc;

use anyhow::Context;
use studybot_ai::OllamaClient;

use crate::api::GatewayState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,studybot_server=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting StudyBot gateway");

    let config = ServerConfig::load().context("Failed to load server configuration")?;
    let engine = OllamaClient::new(&config.engine.url, config.engine.timeout)
        .context("Failed to build engine client")?
        .with_model(&config.engine.model)
        .with_options(config.engine.options);

    let state = Arc::new(GatewayState::new(engine));
    let app = api::router(state.clone(), &config).context("Invalid CORS configuration")?;

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    print_banner(&addr, &state.engine);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("StudyBot gateway stopped");
    Ok(())
}

fn print_banner(addr: &str, engine: &OllamaClient) {
    let options = engine.options();
    tracing::info!("StudyBot AI server running on http://{}", addr);
    tracing::info!("Engine: {} (model {})", engine.base_url(), engine.model());
    tracing::info!(
        "Sampling: temperature {}, num_predict {}, num_ctx {}",
        options.temperature,
        options.num_predict,
        options.num_ctx
    );
    tracing::info!("Single-flight mode: one generation at a time, others get 409");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
