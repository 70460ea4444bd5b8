// handlers/elevated/root/stats.rs - GET /api/root/stats handler

use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::GlobalStats;

/// GET /api/root/stats - Tenant counts, plan mix and how many tenants are
/// near or at a resource limit
pub async fn platform_stats(State(state): State<AppState>) -> ApiResult<GlobalStats> {
    let stats = state.quota.global_stats().await?;
    Ok(ApiResponse::success(stats))
}
