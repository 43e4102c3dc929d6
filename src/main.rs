//! Chat Relay - HTTP server entry point.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chat_relay::adapters::http::app_router;
use chat_relay::adapters::{OpenAIConfig, OpenAIProvider, ProviderConnectivityProbe};
use chat_relay::application::ConnectivityMonitor;
use chat_relay::config::AppConfig;
use chat_relay::ports::CompletionProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let provider: Arc<dyn CompletionProvider> =
        Arc::new(OpenAIProvider::new(openai_config(&config))?);
    let addr = config.server.socket_addr()?;

    tracing::info!(
        address = %addr,
        model = %config.ai.model,
        environment = ?config.server.environment,
        api_key_configured = config.ai.has_openai(),
        "Starting chat relay"
    );
    if !config.ai.has_openai() {
        tracing::warn!("No OpenAI API key configured; chat requests will fail with 401");
    }

    let probe = ProviderConnectivityProbe::new(provider.clone());
    let monitor = ConnectivityMonitor::new(Arc::new(probe));
    tokio::spawn(async move {
        let status = monitor.check().await;
        if !status.is_ready() {
            tracing::warn!(status = %status, "Completion provider not ready");
        }
    });

    let app = app_router(&config, provider);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn openai_config(config: &AppConfig) -> OpenAIConfig {
    let api_key = config
        .ai
        .openai_api_key
        .as_ref()
        .map(|key| key.expose_secret().clone())
        .unwrap_or_default();

    OpenAIConfig::new(api_key)
        .with_model(config.ai.model.clone())
        .with_base_url(config.ai.base_url.clone())
        .with_timeout(config.ai.timeout())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
