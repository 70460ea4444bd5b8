use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::{AppConfig, SecurityConfig};
use crate::database::{
    DatabaseManager, MemoryStore, PgSettingsStore, PgTenantStore, PgUsageCounter, QueryBudget, RetryPolicy,
    SettingsStore, StoreError, TenantStore, UsageCounter,
};
use crate::handlers;
use crate::middleware::{cache_responses, require_caller, require_platform, resolve_scope, ResponseCache};
use crate::resolver::HostResolver;
use crate::services::{PlanCatalog, PlanCatalogError, QuotaEnforcer, SettingsService, TenantDirectory};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load plan catalog: {0}")]
    Catalog(#[from] PlanCatalogError),

    #[error("Failed to prepare database: {0}")]
    Store(#[from] StoreError),
}

/// Everything a handler can reach. Cheap to clone: services hold `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resolver: Arc<HostResolver>,
    pub directory: TenantDirectory,
    pub settings: SettingsService,
    pub quota: QuotaEnforcer,
    pub cache: Option<ResponseCache>,
    /// Present only when backed by PostgreSQL
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn from_stores(
        config: AppConfig,
        catalog: PlanCatalog,
        tenants: Arc<dyn TenantStore>,
        settings: Arc<dyn SettingsStore>,
        usage: Arc<dyn UsageCounter>,
        pool: Option<PgPool>,
    ) -> Self {
        let budget = QueryBudget::from_config(&config.database);
        let retry = RetryPolicy::from_config(&config.database);
        let resolver = Arc::new(HostResolver::from_config(&config.tenancy));

        let settings = SettingsService::new(settings, budget, retry);
        let directory = TenantDirectory::new(
            tenants,
            settings.clone(),
            Arc::new(catalog),
            resolver.clone(),
            budget,
            retry,
        );
        let quota = QuotaEnforcer::new(directory.clone(), usage, budget, retry);
        let cache = config
            .api
            .enable_response_cache
            .then(|| ResponseCache::new(config.api.response_cache_ttl()));

        Self {
            config: Arc::new(config),
            resolver,
            directory,
            settings,
            quota,
            cache,
            pool,
        }
    }

    /// Connects to PostgreSQL, applies migrations and loads the plan catalog.
    pub async fn connect(config: AppConfig) -> Result<Self, StartupError> {
        let catalog = PlanCatalog::load(&config)?;
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;

        Ok(Self::from_stores(
            config,
            catalog,
            Arc::new(PgTenantStore::new(pool.clone())),
            Arc::new(PgSettingsStore::new(pool.clone())),
            Arc::new(PgUsageCounter::new(pool.clone())),
            Some(pool),
        ))
    }

    /// State over one shared in-memory store, returned alongside so callers
    /// can seed resources.
    pub fn in_memory(config: AppConfig, catalog: PlanCatalog) -> (Self, MemoryStore) {
        let store = MemoryStore::new();
        let state = Self::from_stores(
            config,
            catalog,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            None,
        );
        (state, store)
    }
}

/// Full HTTP surface. Every route except `/health` runs inside host
/// resolution.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        .merge(public_routes(&state))
        .merge(protected_routes(&state))
        .merge(root_routes(&state))
        .layer(from_fn_with_state(state.clone(), resolve_scope))
        .route("/health", get(handlers::public::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes(state: &AppState) -> Router<AppState> {
    let cached = Router::new()
        .route("/api/settings/public", get(handlers::public::settings_public))
        .route_layer(from_fn_with_state(state.clone(), cache_responses));

    Router::new()
        .route("/api/plans", get(handlers::public::plans_list))
        .merge(cached)
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    use handlers::protected::{quota, settings};

    Router::new()
        .route(
            "/api/settings",
            get(settings::settings_list).put(settings::settings_bulk_put),
        )
        .route("/api/settings/reset", post(settings::settings_reset))
        .route(
            "/api/settings/:key",
            get(settings::settings_get).put(settings::settings_put),
        )
        .route("/api/quota/:resource", get(quota::quota_check))
        .route("/api/usage", get(quota::usage_get))
        .route_layer(from_fn_with_state(state.clone(), require_caller))
}

fn root_routes(state: &AppState) -> Router<AppState> {
    use handlers::elevated::root::{platform_stats, tenant};

    // Layers run bottom-up: the caller is authenticated before the platform check.
    Router::new()
        .route("/api/root/stats", get(platform_stats))
        .route("/api/root/tenants", post(tenant::tenant_create).get(tenant::tenant_list))
        .route(
            "/api/root/tenants/:id",
            get(tenant::tenant_show).delete(tenant::tenant_delete),
        )
        .route("/api/root/tenants/:id/plan", put(tenant::tenant_plan))
        .route("/api/root/tenants/:id/limits", put(tenant::tenant_limits))
        .route("/api/root/tenants/:id/billing-day", put(tenant::tenant_billing_day))
        .route("/api/root/tenants/:id/suspend", post(tenant::tenant_suspend))
        .route("/api/root/tenants/:id/activate", post(tenant::tenant_activate))
        .route_layer(from_fn(require_platform))
        .route_layer(from_fn_with_state(state.clone(), require_caller))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
