// handlers/protected/settings.rs - /api/settings handlers
//
// Reads and writes only ever touch the caller's own scope. Successful writes
// drop the scope's cached public settings.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::app::AppState;
use crate::database::models::{ScopedSetting, Tenant};
use crate::middleware::{ApiResponse, ApiResult, Caller, RequestScope};
use crate::services::PublicSettings;
use crate::types::Scope;

#[derive(Debug, Deserialize)]
pub struct SettingValue {
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    /// Rows written after the scope is cleared; built-in defaults when absent
    #[serde(default)]
    pub defaults: Option<BTreeMap<String, String>>,
}

/// GET /api/settings - Every row of the request scope
pub async fn settings_list(
    State(state): State<AppState>,
    Extension(request_scope): Extension<RequestScope>,
) -> ApiResult<BTreeMap<String, String>> {
    let settings = state.settings.get_all(request_scope.scope).await?;
    Ok(ApiResponse::success(settings))
}

/// GET /api/settings/:key - One row of the request scope
pub async fn settings_get(
    State(state): State<AppState>,
    Extension(request_scope): Extension<RequestScope>,
    Path(key): Path<String>,
) -> ApiResult<ScopedSetting> {
    let setting = state.settings.get(request_scope.scope, &key).await?;
    Ok(ApiResponse::success(setting))
}

/// PUT /api/settings/:key - Insert or update one row
pub async fn settings_put(
    State(state): State<AppState>,
    Extension(request_scope): Extension<RequestScope>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
    Json(body): Json<SettingValue>,
) -> ApiResult<ScopedSetting> {
    let scope = request_scope.scope;
    state.settings.set(scope, &key, &body.value).await?;
    invalidate(&state, scope).await;

    info!(sub = %caller.sub, %scope, key = %key, "Setting updated");
    let setting = state.settings.get(scope, &key).await?;
    Ok(ApiResponse::success(setting))
}

/// PUT /api/settings - Upsert many rows in one transaction
pub async fn settings_bulk_put(
    State(state): State<AppState>,
    Extension(request_scope): Extension<RequestScope>,
    Extension(caller): Extension<Caller>,
    Json(entries): Json<BTreeMap<String, String>>,
) -> ApiResult<BTreeMap<String, String>> {
    let scope = request_scope.scope;
    state.settings.set_many(scope, &entries).await?;
    invalidate(&state, scope).await;

    info!(sub = %caller.sub, %scope, count = entries.len(), "Settings updated");
    let settings = state.settings.get_all(scope).await?;
    Ok(ApiResponse::success(settings))
}

/// POST /api/settings/reset - Replace the scope's rows with defaults
pub async fn settings_reset(
    State(state): State<AppState>,
    Extension(request_scope): Extension<RequestScope>,
    Extension(caller): Extension<Caller>,
    body: Option<Json<ResetRequest>>,
) -> ApiResult<BTreeMap<String, String>> {
    let scope = request_scope.scope;
    let defaults = body
        .and_then(|Json(request)| request.defaults)
        .unwrap_or_else(|| reset_defaults(request_scope.tenant.as_ref()));

    state.settings.reset_scope(scope, &defaults).await?;
    invalidate(&state, scope).await;

    info!(sub = %caller.sub, %scope, count = defaults.len(), "Settings reset");
    let settings = state.settings.get_all(scope).await?;
    Ok(ApiResponse::success(settings))
}

/// Built-in branding, with the tenant's own name and contact details when
/// resetting a tenant scope.
fn reset_defaults(tenant: Option<&Tenant>) -> BTreeMap<String, String> {
    let mut defaults = PublicSettings::default_entries();
    if let Some(tenant) = tenant {
        defaults.insert("companyName".to_string(), tenant.name.clone());
        if let Some(email) = &tenant.contact_email {
            defaults.insert("companyEmail".to_string(), email.clone());
        }
        if let Some(phone) = &tenant.contact_phone {
            defaults.insert("companyPhone".to_string(), phone.clone());
        }
    }
    defaults
}

async fn invalidate(state: &AppState, scope: Scope) {
    if let Some(cache) = &state.cache {
        cache.invalidate_scope(scope).await;
    }
}
