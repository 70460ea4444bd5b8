// handlers/public/plans.rs - GET /api/plans handler

use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::PlanDefinition;

/// GET /api/plans - Plan catalog ordered from free to custom
pub async fn plans_list(State(state): State<AppState>) -> ApiResult<Vec<PlanDefinition>> {
    let plans = state.directory.catalog().all().cloned().collect();
    Ok(ApiResponse::success(plans))
}
