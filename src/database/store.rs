use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::error::StoreError;
use crate::database::models::{NewTenant, PlanAssignment, ScopedSetting, Tenant};
use crate::types::{LimitOverrides, ResourceType, Scope, TenantStatus};

/// Authoritative tenant records.
///
/// Lookups only ever return live (not soft-deleted) tenants.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Fails with `UniqueViolation` on `TENANT_SLUG_INDEX` when a live tenant
    /// already owns the slug.
    async fn insert(&self, tenant: NewTenant) -> Result<Tenant, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, StoreError>;

    async fn list(&self) -> Result<Vec<Tenant>, StoreError>;

    /// Overwrites plan, price, cycle dates and the whole limit tuple in one write.
    async fn apply_plan(&self, id: Uuid, assignment: &PlanAssignment) -> Result<Option<Tenant>, StoreError>;

    /// Applies only the fields set in `overrides`, in one write.
    async fn update_limits(&self, id: Uuid, overrides: &LimitOverrides) -> Result<Option<Tenant>, StoreError>;

    async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<Option<Tenant>, StoreError>;

    async fn set_billing_day(&self, id: Uuid, billing_day: i32) -> Result<Option<Tenant>, StoreError>;

    /// Stamps the deletion time, soft-deletes the tenant's resources and drops
    /// its scoped settings in one transaction. Returns false when no live
    /// tenant had that id.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Key/value rows partitioned by scope, at most one row per (key, scope).
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<ScopedSetting>, StoreError>;

    async fn list(&self, scope: Scope) -> Result<Vec<ScopedSetting>, StoreError>;

    /// Single-statement insert-or-update.
    async fn upsert(&self, scope: Scope, key: &str, value: &str) -> Result<(), StoreError>;

    /// Upserts every entry inside one transaction.
    async fn upsert_many(&self, scope: Scope, entries: &BTreeMap<String, String>) -> Result<(), StoreError>;

    /// Deletes the scope's rows then writes `defaults`, in one transaction.
    async fn reset_scope(&self, scope: Scope, defaults: &BTreeMap<String, String>) -> Result<(), StoreError>;

    async fn delete_scope(&self, scope: Scope) -> Result<u64, StoreError>;
}

/// Live counts of tenant-owned resources, read from the resource tables.
#[async_trait]
pub trait UsageCounter: Send + Sync {
    async fn count_live(&self, tenant_id: Uuid, resource: ResourceType) -> Result<i64, StoreError>;
}
