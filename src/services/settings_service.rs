use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::models::ScopedSetting;
use crate::database::{retry_idempotent, QueryBudget, RetryPolicy, SettingsStore, StoreError};
use crate::services::branding::PublicSettings;
use crate::services::error::TenancyError;
use crate::types::Scope;

const MAX_KEY_LEN: usize = 100;

/// Contact details written into a freshly provisioned tenant's scope.
#[derive(Debug, Clone, Default)]
pub struct TenantContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Key/value configuration partitioned by [`Scope`].
///
/// Reads and upserts are retried on transient failures. `reset_scope` is not:
/// callers re-derive their defaults before trying again.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
    budget: QueryBudget,
    retry: RetryPolicy,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>, budget: QueryBudget, retry: RetryPolicy) -> Self {
        Self { store, budget, retry }
    }

    pub async fn get(&self, scope: Scope, key: &str) -> Result<ScopedSetting, TenancyError> {
        validate_key(key)?;
        let row = retry_idempotent(self.retry, "settings.get", || {
            self.budget.run("settings.get", self.store.get(scope, key))
        })
        .await?;

        row.ok_or_else(|| TenancyError::SettingNotFound {
            key: key.to_string(),
            scope,
        })
    }

    pub async fn get_all(&self, scope: Scope) -> Result<BTreeMap<String, String>, TenancyError> {
        let rows = retry_idempotent(self.retry, "settings.get_all", || {
            self.budget.run("settings.get_all", self.store.list(scope))
        })
        .await?;

        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    pub async fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), TenancyError> {
        validate_key(key)?;
        retry_idempotent(self.retry, "settings.set", || {
            self.budget.run("settings.set", self.store.upsert(scope, key, value))
        })
        .await
        .map_err(|e| write_error(e, key, scope))?;

        debug!(%scope, key, "Setting stored");
        Ok(())
    }

    /// Upserts every entry in one transaction.
    pub async fn set_many(&self, scope: Scope, entries: &BTreeMap<String, String>) -> Result<(), TenancyError> {
        for key in entries.keys() {
            validate_key(key)?;
        }
        if entries.is_empty() {
            return Ok(());
        }

        retry_idempotent(self.retry, "settings.set_many", || {
            self.budget.run("settings.set_many", self.store.upsert_many(scope, entries))
        })
        .await
        .map_err(|e| write_error(e, &join_keys(entries), scope))?;

        debug!(%scope, count = entries.len(), "Settings stored");
        Ok(())
    }

    /// Replaces the scope's rows with `defaults`.
    ///
    /// The delete and inserts share a transaction so a failure leaves the
    /// scope untouched, but readers on other connections may observe the
    /// scope empty while the reset is in flight.
    pub async fn reset_scope(&self, scope: Scope, defaults: &BTreeMap<String, String>) -> Result<(), TenancyError> {
        for key in defaults.keys() {
            validate_key(key)?;
        }

        self.budget
            .run("settings.reset_scope", self.store.reset_scope(scope, defaults))
            .await
            .map_err(|e| {
                if e.is_transient() {
                    warn!(%scope, error = %e, "Scope reset failed; not retried");
                }
                write_error(e, &join_keys(defaults), scope)
            })?;

        info!(%scope, defaults = defaults.len(), "Settings scope reset");
        Ok(())
    }

    pub async fn delete_scope(&self, scope: Scope) -> Result<u64, TenancyError> {
        let removed = self
            .budget
            .run("settings.delete_scope", self.store.delete_scope(scope))
            .await?;

        info!(%scope, removed, "Settings scope deleted");
        Ok(removed)
    }

    /// Branding view of one scope. A tenant scope never falls back to
    /// global rows.
    pub async fn public_settings(&self, scope: Scope) -> Result<PublicSettings, TenancyError> {
        let rows = self.get_all(scope).await?;
        Ok(PublicSettings::from_rows(&rows))
    }

    /// Seeds a new tenant's scope with its company contact fields.
    pub async fn initialize_tenant(&self, tenant_id: Uuid, contact: &TenantContact) -> Result<(), TenancyError> {
        let entries = BTreeMap::from([
            ("companyName".to_string(), contact.name.clone()),
            ("companyAddress".to_string(), String::new()),
            ("companyPhone".to_string(), contact.phone.clone().unwrap_or_default()),
            ("companyEmail".to_string(), contact.email.clone().unwrap_or_default()),
            ("companyWebsite".to_string(), String::new()),
        ]);
        self.set_many(Scope::Tenant(tenant_id), &entries).await
    }
}

/// Keys are 1 to 100 characters of ASCII letters, digits, `_`, `.` or `-`.
pub fn validate_key(key: &str) -> Result<(), TenancyError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));

    if valid {
        Ok(())
    } else {
        Err(TenancyError::InvalidSettingKey(key.to_string()))
    }
}

// An upsert cannot raise a unique violation; one here means a write bypassed
// the conflict target.
fn write_error(err: StoreError, key: &str, scope: Scope) -> TenancyError {
    match err {
        StoreError::UniqueViolation { constraint } => {
            warn!(%scope, key, constraint = %constraint, "Unique violation on settings write");
            TenancyError::ScopeConflict {
                key: key.to_string(),
                scope,
            }
        }
        other => TenancyError::Store(other),
    }
}

fn join_keys(entries: &BTreeMap<String, String>) -> String {
    entries.keys().map(String::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn service(store: &MemoryStore) -> SettingsService {
        SettingsService::new(Arc::new(store.clone()), QueryBudget::default(), RetryPolicy::default())
    }

    fn entries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn last_write_wins_without_duplicates() {
        let store = MemoryStore::new();
        let settings = service(&store);
        let scope = Scope::Tenant(Uuid::new_v4());

        settings.set(scope, "primaryColor", "#111111").await.unwrap();
        settings.set(scope, "primaryColor", "#222222").await.unwrap();

        assert_eq!(settings.get(scope, "primaryColor").await.unwrap().value, "#222222");
        assert_eq!(store.setting_rows(scope, "primaryColor").await, 1);
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let store = MemoryStore::new();
        let settings = service(&store);
        let t1 = Scope::Tenant(Uuid::new_v4());
        let t2 = Scope::Tenant(Uuid::new_v4());

        settings.set(t1, "k", "one").await.unwrap();

        let err = settings.get(t2, "k").await.unwrap_err();
        assert!(matches!(err, TenancyError::SettingNotFound { scope, .. } if scope == t2));
        assert!(settings.get_all(t2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn global_and_tenant_rows_coexist() {
        let store = MemoryStore::new();
        let settings = service(&store);
        let tenant = Scope::Tenant(Uuid::new_v4());

        settings.set(Scope::Global, "k", "platform").await.unwrap();
        settings.set(tenant, "k", "tenant").await.unwrap();

        assert_eq!(settings.get(Scope::Global, "k").await.unwrap().value, "platform");
        assert_eq!(settings.get(tenant, "k").await.unwrap().value, "tenant");
        assert_eq!(store.setting_rows(Scope::Global, "k").await, 1);
        assert_eq!(store.setting_rows(tenant, "k").await, 1);
    }

    #[tokio::test]
    async fn concurrent_first_writes_leave_one_row() {
        let store = MemoryStore::new();
        let settings = service(&store);

        for scope in [Scope::Global, Scope::Tenant(Uuid::new_v4())] {
            let writes = (0..16).map(|i| {
                let settings = settings.clone();
                async move { settings.set(scope, "race", &i.to_string()).await }
            });
            for result in join_all(writes).await {
                result.unwrap();
            }
            assert_eq!(store.setting_rows(scope, "race").await, 1);
        }
    }

    #[tokio::test]
    async fn reset_replaces_scope_contents() {
        let store = MemoryStore::new();
        let settings = service(&store);
        let scope = Scope::Tenant(Uuid::new_v4());

        settings
            .set_many(scope, &entries(&[("a", "1"), ("b", "2")]))
            .await
            .unwrap();
        settings.set(Scope::Global, "a", "global").await.unwrap();

        settings.reset_scope(scope, &entries(&[("c", "3")])).await.unwrap();

        assert_eq!(settings.get_all(scope).await.unwrap(), entries(&[("c", "3")]));
        assert_eq!(settings.get(Scope::Global, "a").await.unwrap().value, "global");
    }

    #[tokio::test]
    async fn public_settings_do_not_fall_back_to_global() {
        let store = MemoryStore::new();
        let settings = service(&store);
        let tenant_id = Uuid::new_v4();

        settings.set(Scope::Global, "companyName", "Platform Inc").await.unwrap();
        settings
            .initialize_tenant(
                tenant_id,
                &TenantContact {
                    name: "Clinica Sur".into(),
                    email: Some("hola@sur.example".into()),
                    phone: None,
                },
            )
            .await
            .unwrap();

        let global = settings.public_settings(Scope::Global).await.unwrap();
        let tenant = settings.public_settings(Scope::Tenant(tenant_id)).await.unwrap();
        let fresh = settings.public_settings(Scope::Tenant(Uuid::new_v4())).await.unwrap();

        assert_eq!(global.company_name, "Platform Inc");
        assert_eq!(tenant.company_name, "Clinica Sur");
        assert_eq!(tenant.company_email, "hola@sur.example");
        assert_eq!(fresh.company_name, PublicSettings::default().company_name);
    }

    #[tokio::test]
    async fn delete_scope_reports_removed_rows() {
        let store = MemoryStore::new();
        let settings = service(&store);
        let scope = Scope::Tenant(Uuid::new_v4());
        settings.set_many(scope, &entries(&[("a", "1"), ("b", "2")])).await.unwrap();

        assert_eq!(settings.delete_scope(scope).await.unwrap(), 2);
        assert_eq!(settings.delete_scope(scope).await.unwrap(), 0);
    }

    #[test]
    fn key_validation() {
        assert!(validate_key("primaryColor").is_ok());
        assert!(validate_key("mail.smtp-host_2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key(&"k".repeat(101)).is_err());
    }

    /// Fails every call with the given error until `failures` runs out.
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
        calls: AtomicU32,
        error: fn() -> StoreError,
    }

    impl FlakyStore {
        fn fail(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err((self.error)());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SettingsStore for FlakyStore {
        async fn get(&self, scope: Scope, key: &str) -> Result<Option<ScopedSetting>, StoreError> {
            self.fail()?;
            self.inner.get(scope, key).await
        }
        async fn list(&self, scope: Scope) -> Result<Vec<ScopedSetting>, StoreError> {
            self.fail()?;
            SettingsStore::list(&self.inner, scope).await
        }
        async fn upsert(&self, scope: Scope, key: &str, value: &str) -> Result<(), StoreError> {
            self.fail()?;
            self.inner.upsert(scope, key, value).await
        }
        async fn upsert_many(&self, scope: Scope, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
            self.fail()?;
            self.inner.upsert_many(scope, entries).await
        }
        async fn reset_scope(&self, scope: Scope, defaults: &BTreeMap<String, String>) -> Result<(), StoreError> {
            self.fail()?;
            self.inner.reset_scope(scope, defaults).await
        }
        async fn delete_scope(&self, scope: Scope) -> Result<u64, StoreError> {
            self.fail()?;
            self.inner.delete_scope(scope).await
        }
    }

    fn flaky(failures: u32, error: fn() -> StoreError) -> (Arc<FlakyStore>, SettingsService) {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            error,
        });
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_millis(1),
        };
        let service = SettingsService::new(store.clone(), QueryBudget::default(), policy);
        (store, service)
    }

    #[tokio::test]
    async fn idempotent_writes_retry_transient_failures() {
        let (store, settings) = flaky(2, || StoreError::Timeout { operation: "statement" });

        settings.set(Scope::Global, "k", "v").await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(settings.get(Scope::Global, "k").await.unwrap().value, "v");
    }

    #[tokio::test]
    async fn reset_is_never_retried() {
        let (store, settings) = flaky(1, || StoreError::Unavailable("pool closed".into()));

        let err = settings
            .reset_scope(Scope::Global, &entries(&[("a", "1")]))
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unique_violation_surfaces_as_scope_conflict() {
        let (_, settings) = flaky(1, || StoreError::UniqueViolation {
            constraint: "idx_app_settings_key_global".into(),
        });

        let err = settings.set(Scope::Global, "k", "v").await.unwrap_err();
        assert!(matches!(err, TenancyError::ScopeConflict { key, scope: Scope::Global } if key == "k"));
    }
}
