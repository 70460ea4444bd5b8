// handlers/protected/quota.rs - GET /api/quota/:resource and GET /api/usage handlers

use axum::extract::{Extension, Path, State};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, RequestScope};
use crate::services::{QuotaCheck, UsageReport};
use crate::types::ResourceType;

#[derive(Debug, Serialize)]
pub struct QuotaStatus {
    pub allowed: bool,
    #[serde(flatten)]
    pub check: QuotaCheck,
    pub remaining: Option<i64>,
}

/// GET /api/quota/:resource - Whether one more resource may be created.
///
/// A tenant at its limit gets 403 with `details { resource, limit, current }`.
pub async fn quota_check(
    State(state): State<AppState>,
    Extension(request_scope): Extension<RequestScope>,
    Path(resource): Path<String>,
) -> ApiResult<QuotaStatus> {
    let resource: ResourceType = resource
        .parse()
        .map_err(|e: String| ApiError::invalid_field("resource", e))?;

    let check = match &request_scope.tenant {
        Some(tenant) => state.quota.check_tenant(tenant, resource).await?,
        None => state.quota.check_for_scope(request_scope.scope, resource).await?,
    };

    Ok(ApiResponse::success(QuotaStatus {
        allowed: true,
        remaining: check.remaining(),
        check,
    }))
}

/// GET /api/usage - Usage report for the request's tenant
pub async fn usage_get(
    State(state): State<AppState>,
    Extension(request_scope): Extension<RequestScope>,
) -> ApiResult<UsageReport> {
    let tenant_id = request_scope
        .tenant_id()
        .ok_or_else(|| ApiError::bad_request("Usage is only tracked for tenant scopes"))?;

    let report = state.quota.usage_report(tenant_id).await?;
    Ok(ApiResponse::success(report))
}
