#![allow(dead_code)]

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use tenant_scope::app::{router, AppState};
use tenant_scope::auth::issue_token;
use tenant_scope::config::AppConfig;
use tenant_scope::database::models::Tenant;
use tenant_scope::database::MemoryStore;
use tenant_scope::services::{PlanCatalog, ProvisionRequest};

pub const PLATFORM_HOST: &str = "admin.example.com";

/// Router over in-memory stores, driven in-process with `oneshot`.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.tenancy.trust_slug_header = false;
    config.api.enable_response_cache = true;
    config.security.jwt_secret = "integration-test-secret".to_string();
    config
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let (state, store) = AppState::in_memory(config, PlanCatalog::builtin());
        let router = router(state.clone());
        Self { router, state, store }
    }

    pub async fn provision(&self, name: &str, plan: &str) -> Result<Tenant> {
        let request: ProvisionRequest = serde_json::from_value(json!({ "name": name, "plan": plan }))?;
        Ok(self.state.directory.provision(request).await?)
    }

    pub fn platform_token(&self) -> String {
        issue_token(&self.state.config.security, "platform-operator", None).expect("token")
    }

    pub fn tenant_token(&self, tenant: &Tenant) -> String {
        issue_token(&self.state.config.security, "tenant-user", Some(tenant.id)).expect("token")
    }

    pub fn host_for(tenant: &Tenant) -> String {
        format!("{}.example.com", tenant.slug)
    }

    pub async fn request(
        &self,
        method: Method,
        host: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        self.send(method, host, path, token, &[], body).await
    }

    pub async fn send(
        &self,
        method: Method,
        host: &str,
        path: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path).header(header::HOST, host);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, host: &str, path: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(Method::GET, host, path, token, None).await
    }

    pub async fn put(&self, host: &str, path: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::PUT, host, path, Some(token), Some(body)).await
    }

    pub async fn post(&self, host: &str, path: &str, token: &str, body: Option<Value>) -> Result<TestResponse> {
        self.request(Method::POST, host, path, Some(token), body).await
    }

    pub async fn delete(&self, host: &str, path: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::DELETE, host, path, Some(token), None).await
    }
}
