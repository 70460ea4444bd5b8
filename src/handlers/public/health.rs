// handlers/public/health.rs - GET /health handler

use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::app::AppState;
use crate::database::DatabaseManager;
use crate::error::ApiError;

/// GET /health - Liveness plus database connectivity when a pool is configured
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let database = match &state.pool {
        Some(pool) => {
            DatabaseManager::health_check(pool).await.map_err(|e| {
                warn!(error = %e, "Database health check failed");
                ApiError::service_unavailable("Database unavailable")
            })?;
            "connected"
        }
        None => "in-memory",
    };

    Ok(Json(json!({
        "status": "ok",
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
