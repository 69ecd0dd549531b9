//! VodWatch server binary entrypoint.

use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use vodwatch_api::routes::create_router;
use vodwatch_api::state::AppState;
use vodwatch_common::config::AppConfig;

/// EventSub notifications are a few KiB; anything near this is not Twitch.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "vodwatch_api=debug,vodwatch_engine=debug,vodwatch_notifier=debug,tower_http=debug",
            )
        }))
        .json()
        .init();

    tracing::info!("Starting VodWatch webhook server...");

    // Fail fast on missing configuration
    let config = AppConfig::from_env()?;
    let addr = config.bind_addr;

    tracing::info!(
        streamer_id = %config.streamer_id,
        keywords = config.keywords.len(),
        require_game_match = config.require_game_match,
        audit_enabled = config.audit_url.is_some(),
        "Configuration loaded"
    );

    let state = AppState::from_config(config)?;

    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Webhook server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    tracing::info!("VodWatch webhook server stopped.");
    Ok(())
}
