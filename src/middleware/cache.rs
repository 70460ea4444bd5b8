use axum::{
    body::{to_bytes, Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::middleware::tenant_scope::RequestScope;
use crate::types::Scope;

const MAX_CACHED_BODY: usize = 1024 * 1024;
pub const CACHE_STATUS_HEADER: &str = "x-cache";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: Method,
    pub scope: Scope,
    pub path: String,
    pub query: String,
}

#[derive(Debug, Clone)]
struct CachedResponse {
    status: StatusCode,
    content_type: Option<HeaderValue>,
    body: Bytes,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CachedResponse>,
    // Bumped on every invalidation; a response rendered under an older
    // generation is never stored.
    generations: HashMap<Scope, u64>,
}

impl CacheState {
    fn generation(&self, scope: Scope) -> u64 {
        self.generations.get(&scope).copied().unwrap_or_default()
    }
}

/// Short-lived in-process cache of successful GET responses.
///
/// Entries are keyed by scope as well as path, so one tenant can never be
/// served another tenant's body. Expired entries are skipped on read and
/// removed by the periodic sweep.
#[derive(Clone)]
pub struct ResponseCache {
    state: Arc<RwLock<CacheState>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            ttl,
        }
    }

    async fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        let state = self.state.read().await;
        state.entries.get(key).filter(|e| e.expires_at > Instant::now()).cloned()
    }

    /// Current invalidation generation of a scope.
    pub async fn generation(&self, scope: Scope) -> u64 {
        self.state.read().await.generation(scope)
    }

    /// Stores the entry unless the scope was invalidated after `generation`
    /// was read. Returns whether it was stored.
    async fn insert(
        &self,
        key: CacheKey,
        generation: u64,
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.generation(key.scope) != generation {
            return false;
        }
        let entry = CachedResponse {
            status,
            content_type,
            body,
            expires_at: Instant::now() + self.ttl,
        };
        state.entries.insert(key, entry);
        true
    }

    /// Drops every entry of a scope after one of its settings changed.
    pub async fn invalidate_scope(&self, scope: Scope) -> usize {
        let mut state = self.state.write().await;
        *state.generations.entry(scope).or_default() += 1;
        let before = state.entries.len();
        state.entries.retain(|key, _| key.scope != scope);
        before - state.entries.len()
    }

    /// Removes expired entries, returning how many were dropped.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, e| e.expires_at > now);
        before - state.entries.len()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = cache.sweep().await;
                if removed > 0 {
                    debug!(removed, "Swept expired cached responses");
                }
            }
        })
    }
}

/// Serves GET requests from the cache when enabled. Must run inside
/// `resolve_scope`.
///
/// Bodies larger than `MAX_CACHED_BODY`, or of unknown length, are passed
/// through untouched with `x-cache: bypass`.
pub async fn cache_responses(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(cache) = state.cache.clone() else {
        return next.run(request).await;
    };
    if request.method() != Method::GET {
        return next.run(request).await;
    }
    let Some(scope) = request.extensions().get::<RequestScope>().map(|s| s.scope) else {
        return next.run(request).await;
    };

    let key = CacheKey {
        method: request.method().clone(),
        scope,
        path: request.uri().path().to_string(),
        query: request.uri().query().unwrap_or_default().to_string(),
    };

    if let Some(hit) = cache.get(&key).await {
        return build_response(hit.status, hit.content_type, hit.body, "hit");
    }

    let generation = cache.generation(scope).await;
    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let fits = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_CACHED_BODY as u64);
    if !fits {
        debug!(path = %key.path, scope = %scope, "Response too large to cache");
        return with_cache_status(response, "bypass");
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %key.path, error = %e, "Failed to buffer response for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = parts.headers.get(header::CONTENT_TYPE).cloned();
    let path = key.path.clone();
    if !cache.insert(key, generation, parts.status, content_type.clone(), bytes.clone()).await {
        debug!(path = %path, scope = %scope, "Scope changed while rendering; not cached");
    }
    build_response(parts.status, content_type, bytes, "miss")
}

fn with_cache_status(mut response: Response, cache_status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(cache_status));
    response
}

fn build_response(status: StatusCode, content_type: Option<HeaderValue>, body: Bytes, cache_status: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    with_cache_status(response, cache_status)
}
