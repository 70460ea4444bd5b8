// handlers/elevated/root/tenant/delete.rs - DELETE /api/root/tenants/:id handler

use axum::extract::{Extension, Path, State};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::types::Scope;

/// DELETE /api/root/tenants/:id - Soft delete the tenant.
///
/// The slug becomes free for a new tenant; resources are soft-deleted and
/// the tenant's settings are dropped.
pub async fn tenant_delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.directory.soft_delete(id).await?;
    if let Some(cache) = &state.cache {
        cache.invalidate_scope(Scope::Tenant(id)).await;
    }

    info!(sub = %caller.sub, tenant = %id, "Tenant deleted by platform caller");
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
