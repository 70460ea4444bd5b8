// handlers/elevated/root/tenant/update.rs - Tenant plan, limit and lifecycle handlers

use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Tenant;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::services::LimitOverrides;
use crate::types::BillingCycle;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub plan: String,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
}

#[derive(Debug, Deserialize)]
pub struct BillingDayRequest {
    pub billing_day: i32,
}

/// PUT /api/root/tenants/:id/plan - Assign a plan, overwriting every limit
pub async fn tenant_plan(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<Tenant> {
    let tenant = state.directory.assign_plan(id, &request.plan, request.billing_cycle).await?;
    info!(sub = %caller.sub, tenant = %id, plan = %tenant.plan, "Plan assigned by platform caller");
    Ok(ApiResponse::success(tenant))
}

/// PUT /api/root/tenants/:id/limits - Override individual limits until the
/// next plan assignment
pub async fn tenant_limits(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(overrides): Json<LimitOverrides>,
) -> ApiResult<Tenant> {
    let tenant = state.directory.update_limits(id, overrides).await?;
    Ok(ApiResponse::success(tenant))
}

/// PUT /api/root/tenants/:id/billing-day
pub async fn tenant_billing_day(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BillingDayRequest>,
) -> ApiResult<Tenant> {
    let tenant = state.directory.set_billing_day(id, request.billing_day).await?;
    Ok(ApiResponse::success(tenant))
}

/// POST /api/root/tenants/:id/suspend - Requests to the tenant's host get 403
pub async fn tenant_suspend(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> ApiResult<Tenant> {
    let tenant = state.directory.suspend(id).await?;
    info!(sub = %caller.sub, tenant = %id, "Tenant suspended by platform caller");
    Ok(ApiResponse::success(tenant))
}

/// POST /api/root/tenants/:id/activate
pub async fn tenant_activate(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> ApiResult<Tenant> {
    let tenant = state.directory.activate(id).await?;
    info!(sub = %caller.sub, tenant = %id, "Tenant activated by platform caller");
    Ok(ApiResponse::success(tenant))
}
