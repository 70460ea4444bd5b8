// handlers/public/settings_public.rs - GET /api/settings/public handler
//
// Branding for login pages and documents, served before anyone signs in.
// This is the only route behind the response cache.

use axum::extract::{Extension, State};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, RequestScope};
use crate::services::PublicSettings;

/// GET /api/settings/public - The request scope's rows over built-in defaults
pub async fn settings_public(
    State(state): State<AppState>,
    Extension(request_scope): Extension<RequestScope>,
) -> ApiResult<PublicSettings> {
    let settings = state.settings.public_settings(request_scope.scope).await?;
    Ok(ApiResponse::success(settings))
}
