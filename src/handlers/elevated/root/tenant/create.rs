// handlers/elevated/root/tenant/create.rs - POST /api/root/tenants handler

use axum::{
    extract::{Extension, State},
    response::Json,
};
use tracing::info;

use crate::app::AppState;
use crate::database::models::Tenant;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::services::ProvisionRequest;

/**
 * POST /api/root/tenants - Provision a tenant
 *
 * ```json
 * {
 *   "name": "Clínica Sol",        // Required
 *   "slug": "clinica-sol",        // Optional: derived from name
 *   "plan": "professional",       // Optional: defaults to free
 *   "billing_cycle": "annual",    // Optional: defaults to monthly
 *   "billing_day": 15,            // Optional: 1..=28, defaults to 1
 *   "contact_email": "a@b.c",     // Optional
 *   "contact_phone": "+57 300"    // Optional
 * }
 * ```
 */
pub async fn tenant_create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<ProvisionRequest>,
) -> ApiResult<Tenant> {
    let tenant = state.directory.provision(request).await?;
    info!(sub = %caller.sub, tenant = %tenant.id, slug = %tenant.slug, "Tenant created by platform caller");
    Ok(ApiResponse::created(tenant))
}
