use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::app::AppState;
use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use crate::middleware::tenant_scope::RequestScope;
use crate::services::TenancyError;
use crate::types::Scope;

/// Authenticated caller extracted from the bearer token
#[derive(Clone, Debug)]
pub struct Caller {
    pub sub: String,
    /// Tenant the caller belongs to, or `Global` for platform operators
    pub affiliation: Scope,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            affiliation: claims.affiliation(),
            sub: claims.sub,
        }
    }
}

impl Caller {
    pub fn is_platform(&self) -> bool {
        self.affiliation.is_global()
    }
}

/// A caller may only act in the scope it is affiliated with: tenant users
/// cannot reach the platform host and platform operators cannot act inside
/// a tenant host.
pub fn authorize_scope(caller: &Caller, requested: Scope) -> Result<(), TenancyError> {
    if caller.affiliation == requested {
        Ok(())
    } else {
        Err(TenancyError::ScopeForbidden { requested })
    }
}

/// Validates the bearer token and checks it against the resolved request
/// scope. Must run inside `resolve_scope`.
pub async fn require_caller(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&state.config.security, &token).map_err(|e| ApiError::unauthorized(e.to_string()))?;
    let caller = Caller::from(claims);

    let scope = request
        .extensions()
        .get::<RequestScope>()
        .map(|s| s.scope)
        .ok_or_else(|| ApiError::internal_server_error("Request scope not resolved"))?;

    if let Err(e) = authorize_scope(&caller, scope) {
        warn!(sub = %caller.sub, affiliation = %caller.affiliation, %scope, "Caller outside its scope");
        return Err(e.into());
    }

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Restricts a route to platform operators. Must run after `require_caller`.
pub async fn require_platform(request: Request, next: Next) -> Result<Response, ApiError> {
    let caller = request
        .extensions()
        .get::<Caller>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !caller.is_platform() {
        return Err(ApiError::forbidden("Platform administrator access required"));
    }

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty JWT token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
