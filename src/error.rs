// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::StoreError;
use crate::services::TenancyError;
use crate::types::ResourceType;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    QuotaExceeded {
        resource: ResourceType,
        limit: i64,
        current: i64,
    },

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::QuotaExceeded { .. } => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Forbidden(msg) => msg.clone(),
            ApiError::QuotaExceeded { resource, limit, .. } => {
                format!("Plan limit reached for {} ({} allowed)", resource, limit)
            }
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::InternalServerError(msg) => msg.clone(),
            ApiError::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });

        match self {
            ApiError::ValidationError {
                field_errors: Some(field_errors),
                ..
            } => {
                response["field_errors"] = json!(field_errors);
            }
            ApiError::QuotaExceeded {
                resource,
                limit,
                current,
            } => {
                response["details"] = json!({
                    "resource": resource,
                    "limit": limit,
                    "current": current
                });
            }
            _ => {}
        }

        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Validation failure on a single request field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let field_errors = HashMap::from([(field.to_string(), message.clone())]);
        ApiError::validation_error(message, Some(field_errors))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<TenancyError> for ApiError {
    fn from(err: TenancyError) -> Self {
        match err {
            TenancyError::TenantNotFound(slug) => ApiError::not_found(format!("Tenant not found: {}", slug)),
            TenancyError::SettingNotFound { key, .. } => ApiError::not_found(format!("Setting not found: {}", key)),
            TenancyError::UnknownPlan(plan) => ApiError::invalid_field("plan", format!("Unknown plan '{}'", plan)),
            TenancyError::InvalidSlug { slug, reason } => {
                ApiError::invalid_field("slug", format!("Invalid slug '{}': {}", slug, reason))
            }
            TenancyError::InvalidBillingDay(day) => {
                ApiError::invalid_field("billing_day", format!("Billing day must be between 1 and 28, got {}", day))
            }
            TenancyError::InvalidSettingKey(key) => {
                ApiError::invalid_field("key", format!("Invalid setting key '{}'", key))
            }
            TenancyError::QuotaExceeded {
                resource,
                limit,
                current,
            } => ApiError::QuotaExceeded {
                resource,
                limit,
                current,
            },
            TenancyError::SlugTaken(slug) => ApiError::conflict(format!("Slug '{}' is already in use", slug)),
            TenancyError::ReservedSlug(slug) => ApiError::conflict(format!("Slug '{}' is reserved", slug)),
            TenancyError::TenantSuspended(slug) => ApiError::forbidden(format!("Tenant '{}' is suspended", slug)),
            TenancyError::ScopeForbidden { .. } => ApiError::forbidden("Not allowed to access this scope"),
            TenancyError::ScopeConflict { key, scope } => {
                tracing::error!(%scope, key = %key, "Settings scope conflict");
                ApiError::internal_server_error("Conflicting settings write")
            }
            TenancyError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            tracing::warn!("Transient storage error: {}", err);
            return ApiError::service_unavailable("Database temporarily unavailable");
        }
        // Log the real error but return generic message
        tracing::error!("Storage error: {}", err);
        ApiError::internal_server_error("Database error occurred")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
