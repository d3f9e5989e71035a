use krishi_server::{AppState, ServerConfig, housekeeping, router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env()?;
    tracing::info!("Loaded configuration");
    for (name, key) in [
        ("GEMINI_API_KEY", &config.gemini_api_key),
        ("OPENWEATHER_API_KEY", &config.openweather_api_key),
        ("DATA_GOV_API_KEY", &config.data_gov_api_key),
    ] {
        if key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            tracing::warn!(variable = name, "Credential not set; dependent feature disabled");
        }
    }

    let state = Arc::new(AppState::from_config(&config));

    // Spawn periodic cleanup task
    housekeeping::spawn_cleanup(
        state.clone(),
        std::time::Duration::from_secs(config.session.cleanup_interval_seconds),
        chrono::Duration::minutes(config.session.idle_ttl_minutes),
    );

    let app = router(state, config.max_body_bytes);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
