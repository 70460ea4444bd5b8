use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Tenant;
use crate::error::ApiError;
use crate::resolver::TenantScope;
use crate::services::TenancyError;
use crate::types::Scope;

pub const TENANT_SLUG_HEADER: &str = "x-tenant-slug";

/// Scope resolved once per request and handed to every handler.
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub resolved: TenantScope,
    pub scope: Scope,
    pub tenant: Option<Tenant>,
}

impl RequestScope {
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.scope.tenant_id()
    }
}

/// Resolves the request's host (or trusted slug header) to a tenant and
/// rejects unknown and suspended tenants before any handler runs.
pub async fn resolve_scope(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let resolved = {
        let headers = request.headers();
        let override_slug = state
            .config
            .tenancy
            .trust_slug_header
            .then(|| header_str(headers, TENANT_SLUG_HEADER))
            .flatten();

        match override_slug {
            Some(slug) => state.resolver.resolve_slug(slug),
            None => {
                let host = header_str(headers, header::HOST.as_str())
                    .or_else(|| request.uri().host())
                    .unwrap_or_default();
                state.resolver.resolve(host)
            }
        }
    };

    let tenant = state.directory.resolve_scope(&resolved).await.map_err(|e| {
        if let TenancyError::TenantNotFound(slug) = &e {
            debug!(slug = %slug, path = %request.uri().path(), "Request for unknown tenant");
        }
        ApiError::from(e)
    })?;

    if let Some(tenant) = &tenant {
        if tenant.is_suspended() {
            warn!(tenant = %tenant.id, slug = %tenant.slug, "Request for suspended tenant");
            return Err(TenancyError::TenantSuspended(tenant.slug.clone()).into());
        }
    }

    let scope = Scope::from(tenant.as_ref().map(|t| t.id));
    request.extensions_mut().insert(RequestScope {
        resolved,
        scope,
        tenant,
    });

    Ok(next.run(request).await)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
