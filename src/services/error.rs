use uuid::Uuid;

use crate::database::StoreError;
use crate::types::{ResourceType, Scope};

/// Failures of the tenancy core. Every variant carries the data a caller
/// needs to build a user-facing message without querying again.
#[derive(Debug, thiserror::Error)]
pub enum TenancyError {
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Quota exceeded for {resource}: {current} of {limit} in use")]
    QuotaExceeded {
        resource: ResourceType,
        limit: i64,
        current: i64,
    },

    #[error("Conflicting write for setting '{key}' in scope {scope}")]
    ScopeConflict { key: String, scope: Scope },

    #[error("Slug already in use: {0}")]
    SlugTaken(String),

    #[error("Invalid slug '{slug}': {reason}")]
    InvalidSlug { slug: String, reason: &'static str },

    #[error("Slug is reserved: {0}")]
    ReservedSlug(String),

    #[error("Tenant is suspended: {0}")]
    TenantSuspended(String),

    #[error("Billing day must be between 1 and 28, got {0}")]
    InvalidBillingDay(i32),

    #[error("Caller may not act in scope {requested}")]
    ScopeForbidden { requested: Scope },

    #[error("Setting '{key}' not found in scope {scope}")]
    SettingNotFound { key: String, scope: Scope },

    #[error("Invalid setting key '{0}'")]
    InvalidSettingKey(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TenancyError {
    pub fn tenant_not_found(id: Uuid) -> Self {
        TenancyError::TenantNotFound(id.to_string())
    }

    /// Transient storage failures; safe to retry for idempotent operations.
    pub fn is_transient(&self) -> bool {
        matches!(self, TenancyError::Store(e) if e.is_transient())
    }
}
