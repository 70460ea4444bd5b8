use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::error::StoreError;
use crate::database::models::{NewTenant, PlanAssignment, ScopedSetting, Tenant, TENANT_SLUG_INDEX};
use crate::database::store::{SettingsStore, TenantStore, UsageCounter};
use crate::types::{LimitOverrides, ResourceType, Scope, TenantStatus};

#[derive(Debug)]
struct StoredResource {
    tenant_id: Option<Uuid>,
    resource: ResourceType,
    deleted: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    tenants: HashMap<Uuid, Tenant>,
    // Keyed by (scope, key): a second row for the same pair cannot exist.
    settings: HashMap<(Scope, String), ScopedSetting>,
    resources: HashMap<Uuid, StoredResource>,
}

impl MemoryState {
    fn live_tenant_mut(&mut self, id: Uuid) -> Option<&mut Tenant> {
        self.tenants.get_mut(&id).filter(|t| t.is_live())
    }

    fn write_setting(&mut self, scope: Scope, key: &str, value: &str) {
        let now = Utc::now();
        self.settings
            .entry((scope, key.to_string()))
            .and_modify(|row| {
                row.value = value.to_string();
                row.updated_at = now;
            })
            .or_insert_with(|| ScopedSetting {
                key: key.to_string(),
                value: value.to_string(),
                scope,
                updated_at: now,
            });
    }

    fn clear_scope(&mut self, scope: Scope) -> u64 {
        let before = self.settings.len();
        self.settings.retain(|(row_scope, _), _| *row_scope != scope);
        (before - self.settings.len()) as u64
    }
}

/// Process-local implementation of every store trait.
///
/// All three traits share one lock so multi-table writes (tenant soft delete)
/// stay atomic, mirroring the PostgreSQL transactions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tenant-owned resource row; `None` is platform-owned.
    pub async fn add_resource(&self, tenant_id: Option<Uuid>, resource: ResourceType) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().await.resources.insert(
            id,
            StoredResource {
                tenant_id,
                resource,
                deleted: false,
            },
        );
        id
    }

    pub async fn delete_resource(&self, id: Uuid) -> bool {
        match self.state.write().await.resources.get_mut(&id) {
            Some(row) if !row.deleted => {
                row.deleted = true;
                true
            }
            _ => false,
        }
    }

    /// Number of setting rows stored for a (scope, key) pair.
    pub async fn setting_rows(&self, scope: Scope, key: &str) -> usize {
        self.state
            .read()
            .await
            .settings
            .values()
            .filter(|row| row.scope == scope && row.key == key)
            .count()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn insert(&self, tenant: NewTenant) -> Result<Tenant, StoreError> {
        let mut state = self.state.write().await;

        if state.tenants.values().any(|t| t.is_live() && t.slug == tenant.slug) {
            return Err(StoreError::UniqueViolation {
                constraint: TENANT_SLUG_INDEX.to_string(),
            });
        }

        let now = Utc::now();
        let plan = tenant.assignment;
        let record = Tenant {
            id: Uuid::new_v4(),
            name: tenant.name,
            slug: tenant.slug,
            status: TenantStatus::Active,
            plan: plan.plan,
            plan_price: plan.plan_price,
            billing_cycle: plan.billing_cycle,
            billing_day: tenant.billing_day,
            plan_started_at: Some(plan.plan_started_at),
            plan_expires_at: plan.plan_expires_at,
            limits: plan.limits,
            contact_email: tenant.contact_email,
            contact_phone: tenant.contact_phone,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.tenants.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tenants
            .values()
            .find(|t| t.is_live() && t.slug == slug)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, StoreError> {
        let state = self.state.read().await;
        Ok(state.tenants.get(&id).filter(|t| t.is_live()).cloned())
    }

    async fn list(&self) -> Result<Vec<Tenant>, StoreError> {
        let state = self.state.read().await;
        let mut tenants: Vec<Tenant> = state.tenants.values().filter(|t| t.is_live()).cloned().collect();
        tenants.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tenants)
    }

    async fn apply_plan(&self, id: Uuid, assignment: &PlanAssignment) -> Result<Option<Tenant>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.live_tenant_mut(id).map(|tenant| {
            tenant.plan = assignment.plan;
            tenant.plan_price = assignment.plan_price;
            tenant.billing_cycle = assignment.billing_cycle;
            tenant.plan_started_at = Some(assignment.plan_started_at);
            tenant.plan_expires_at = assignment.plan_expires_at;
            tenant.limits = assignment.limits;
            tenant.updated_at = Utc::now();
            tenant.clone()
        }))
    }

    async fn update_limits(&self, id: Uuid, overrides: &LimitOverrides) -> Result<Option<Tenant>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.live_tenant_mut(id).map(|tenant| {
            tenant.limits = overrides.apply(tenant.limits);
            tenant.updated_at = Utc::now();
            tenant.clone()
        }))
    }

    async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<Option<Tenant>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.live_tenant_mut(id).map(|tenant| {
            tenant.status = status;
            tenant.updated_at = Utc::now();
            tenant.clone()
        }))
    }

    async fn set_billing_day(&self, id: Uuid, billing_day: i32) -> Result<Option<Tenant>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.live_tenant_mut(id).map(|tenant| {
            tenant.billing_day = billing_day;
            tenant.updated_at = Utc::now();
            tenant.clone()
        }))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        match state.live_tenant_mut(id) {
            Some(tenant) => {
                tenant.deleted_at = Some(now);
                tenant.status = TenantStatus::Deleted;
                tenant.updated_at = now;
            }
            None => return Ok(false),
        }

        for row in state.resources.values_mut() {
            if row.tenant_id == Some(id) {
                row.deleted = true;
            }
        }
        state.clear_scope(Scope::Tenant(id));
        Ok(true)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<ScopedSetting>, StoreError> {
        let state = self.state.read().await;
        Ok(state.settings.get(&(scope, key.to_string())).cloned())
    }

    async fn list(&self, scope: Scope) -> Result<Vec<ScopedSetting>, StoreError> {
        let state = self.state.read().await;
        let mut rows: Vec<ScopedSetting> = state
            .settings
            .values()
            .filter(|row| row.scope == scope)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }

    async fn upsert(&self, scope: Scope, key: &str, value: &str) -> Result<(), StoreError> {
        self.state.write().await.write_setting(scope, key, value);
        Ok(())
    }

    async fn upsert_many(&self, scope: Scope, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for (key, value) in entries {
            state.write_setting(scope, key, value);
        }
        Ok(())
    }

    async fn reset_scope(&self, scope: Scope, defaults: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.clear_scope(scope);
        for (key, value) in defaults {
            state.write_setting(scope, key, value);
        }
        Ok(())
    }

    async fn delete_scope(&self, scope: Scope) -> Result<u64, StoreError> {
        Ok(self.state.write().await.clear_scope(scope))
    }
}

#[async_trait]
impl UsageCounter for MemoryStore {
    async fn count_live(&self, tenant_id: Uuid, resource: ResourceType) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        let count = state
            .resources
            .values()
            .filter(|row| !row.deleted && row.resource == resource && row.tenant_id == Some(tenant_id))
            .count();
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resource_counts_skip_deleted_and_foreign_rows() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let other = Uuid::new_v4();

        let first = store.add_resource(Some(tenant), ResourceType::Users).await;
        store.add_resource(Some(tenant), ResourceType::Users).await;
        store.add_resource(Some(tenant), ResourceType::Branches).await;
        store.add_resource(Some(other), ResourceType::Users).await;
        store.add_resource(None, ResourceType::Users).await;

        assert_eq!(store.count_live(tenant, ResourceType::Users).await.unwrap(), 2);
        assert!(store.delete_resource(first).await);
        assert!(!store.delete_resource(first).await);
        assert_eq!(store.count_live(tenant, ResourceType::Users).await.unwrap(), 1);
        assert_eq!(store.count_live(tenant, ResourceType::Branches).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reset_replaces_only_the_target_scope() {
        let store = MemoryStore::new();
        let tenant = Scope::Tenant(Uuid::new_v4());
        store.upsert(Scope::Global, "a", "1").await.unwrap();
        store.upsert(tenant, "a", "2").await.unwrap();
        store.upsert(tenant, "b", "3").await.unwrap();

        let defaults = BTreeMap::from([("c".to_string(), "4".to_string())]);
        store.reset_scope(tenant, &defaults).await.unwrap();

        let keys: Vec<String> = SettingsStore::list(&store, tenant).await.unwrap().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["c"]);
        assert_eq!(store.get(Scope::Global, "a").await.unwrap().unwrap().value, "1");
    }
}
