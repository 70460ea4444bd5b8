use anyhow::Context;
use tracing::{info, warn};

use crate::app::{router, AppState};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::PlanCatalog;

pub async fn serve(config: AppConfig, port: Option<u16>, in_memory: bool) -> anyhow::Result<()> {
    if !crate::is_development!() && config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    let port = port.unwrap_or(config.api.port);
    info!(environment = ?config.environment, port, in_memory, "Starting tenant scope service");

    let state = if in_memory {
        warn!("Using in-memory stores; nothing is persisted");
        let catalog = PlanCatalog::load(&config)?;
        AppState::in_memory(config, catalog).0
    } else {
        AppState::connect(config).await?
    };

    let _sweeper = state
        .cache
        .as_ref()
        .map(|cache| cache.spawn_sweeper(state.config.api.response_cache_sweep()));

    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!(addr = %bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

pub async fn migrate(config: AppConfig) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
